use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use log::{error, info};

use super::context::PipelineContext;
use super::demux::run_demux;
use super::mux::run_mux;
use super::stage::{StageOutcome, StageReport};
use super::transcode::{run_decode, run_encode};
use crate::av::{Demuxer, EncodeParameters, Muxer, OpenMuxer, Packet, StreamKind, StreamParameters};
use crate::codec::{Decoder, Encoder, OpenDecoder, OpenEncoder};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::handoff::{Inlet, Outlet};

/// Runs before each stage thread is spawned; an error aborts the start.
type SpawnCheck = Box<dyn FnMut(&str) -> io::Result<()> + Send>;

/// How one stream kind is transcoded: which decoder and encoder to open
/// and what the encoder should produce.
pub struct Branch {
    decoder: OpenDecoder,
    encoder: OpenEncoder,
    params: EncodeParameters,
}

impl Branch {
    pub fn new<D, E>(decoder: D, encoder: E, params: EncodeParameters) -> Self
    where
        D: FnOnce(&StreamParameters) -> Result<Box<dyn Decoder>> + Send + 'static,
        E: FnOnce(&EncodeParameters) -> Result<Box<dyn Encoder>> + Send + 'static,
    {
        Self {
            decoder: Box::new(decoder),
            encoder: Box::new(encoder),
            params,
        }
    }
}

/// Assembles a pipeline from its collaborators.
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use avpipe::av::{CodecType, EncodeParameters, Packet, Rational, StreamParameters};
/// use avpipe::codec::{PassthroughDecoder, PassthroughEncoder};
/// use avpipe::format::{MemoryDemuxer, MemoryMuxer, MuxedOutput};
/// use avpipe::pipeline::{Branch, PipelineBuilder};
///
/// let source = StreamParameters::video(CodecType::H264, 320, 240, Rational::new(1, 25));
/// let target = StreamParameters::video(CodecType::MPEG4, 320, 240, Rational::new(1, 25));
/// let demuxer = MemoryDemuxer::new(
///     vec![source],
///     (0..5).map(|pts| Packet::new(vec![0u8; 16]).with_pts(pts)),
/// );
/// let output = Arc::new(Mutex::new(MuxedOutput::default()));
///
/// let report = PipelineBuilder::new(demuxer)
///     .video(Branch::new(
///         PassthroughDecoder::open,
///         PassthroughEncoder::open,
///         EncodeParameters::new(target),
///     ))
///     .muxer(MemoryMuxer::opener(output.clone()))
///     .spawn()?
///     .wait();
///
/// assert!(report.is_success());
/// assert_eq!(output.lock().packets.len(), 5);
/// # Ok::<(), avpipe::PipelineError>(())
/// ```
pub struct PipelineBuilder {
    demuxer: Box<dyn Demuxer>,
    muxer: Option<OpenMuxer>,
    video: Option<Branch>,
    audio: Option<Branch>,
    config: PipelineConfig,
    before_spawn: Option<SpawnCheck>,
}

impl PipelineBuilder {
    pub fn new(demuxer: impl Demuxer + 'static) -> Self {
        Self {
            demuxer: Box::new(demuxer),
            muxer: None,
            video: None,
            audio: None,
            config: PipelineConfig::default(),
            before_spawn: None,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn video(mut self, branch: Branch) -> Self {
        self.video = Some(branch);
        self
    }

    pub fn audio(mut self, branch: Branch) -> Self {
        self.audio = Some(branch);
        self
    }

    pub fn muxer<M>(mut self, open: M) -> Self
    where
        M: FnOnce(&[StreamParameters]) -> Result<Box<dyn Muxer>> + Send + 'static,
    {
        self.muxer = Some(Box::new(open));
        self
    }

    #[cfg(test)]
    fn before_spawn<F>(mut self, check: F) -> Self
    where
        F: FnMut(&str) -> io::Result<()> + Send + 'static,
    {
        self.before_spawn = Some(Box::new(check));
        self
    }

    /// Starts one thread per stage.
    ///
    /// Fails without starting anything if the builder is incomplete or the
    /// config is invalid. If a thread cannot be spawned, the stages already
    /// running are shut down and joined before the error is returned.
    pub fn spawn(self) -> Result<Pipeline> {
        self.config.validate()?;
        let open_muxer = self
            .muxer
            .ok_or_else(|| PipelineError::Config("no muxer configured".into()))?;

        let branches: Vec<(StreamKind, Branch)> = [
            (StreamKind::Video, self.video),
            (StreamKind::Audio, self.audio),
        ]
        .into_iter()
        .filter_map(|(kind, branch)| branch.map(|branch| (kind, branch)))
        .collect();
        if branches.is_empty() {
            return Err(PipelineError::Config("no stream branch configured".into()));
        }

        let context = Arc::new(PipelineContext::new(&self.config));
        let interval = self.config.progress_interval;
        let sources = self.demuxer.streams();
        let kinds: Vec<StreamKind> = branches.iter().map(|(kind, _)| *kind).collect();
        let outputs: Vec<StreamParameters> = branches
            .iter()
            .map(|(_, branch)| branch.params.stream.clone())
            .collect();

        let mut pipeline = Pipeline {
            context: Arc::clone(&context),
            stages: Vec::new(),
            before_spawn: self.before_spawn,
        };

        let result = (|| -> Result<()> {
            let ctx = Arc::clone(&context);
            let mux_kinds = kinds.clone();
            pipeline.spawn_stage("mux", move || {
                let inlets: Vec<(StreamKind, &dyn Inlet<Packet>)> = mux_kinds
                    .iter()
                    .map(|kind| (*kind, ctx.encoded_inlet(*kind)))
                    .collect();
                run_mux(open_muxer, &outputs, &inlets, interval)
            })?;

            for (index, (kind, branch)) in branches.into_iter().enumerate() {
                let source = sources.iter().find(|s| s.kind == kind).cloned();

                let ctx = Arc::clone(&context);
                let name = format!("{}-encode", kind);
                let stage = name.clone();
                let Branch {
                    decoder,
                    encoder,
                    params,
                } = branch;
                pipeline.spawn_stage(&name, move || {
                    run_encode(
                        &stage,
                        params,
                        index,
                        encoder,
                        ctx.frames(kind),
                        ctx.encoded_outlet(kind),
                        interval,
                    )
                })?;

                let ctx = Arc::clone(&context);
                let name = format!("{}-decode", kind);
                let stage = name.clone();
                pipeline.spawn_stage(&name, move || {
                    run_decode(
                        &stage,
                        kind,
                        source,
                        decoder,
                        ctx.packets(kind),
                        ctx.frames(kind),
                        interval,
                    )
                })?;
            }

            let ctx = Arc::clone(&context);
            let demuxer = self.demuxer;
            pipeline.spawn_stage("demux", move || {
                let routes: Vec<(StreamKind, &dyn Outlet<Packet>)> = kinds
                    .iter()
                    .map(|kind| (*kind, ctx.packets(*kind) as &dyn Outlet<Packet>))
                    .collect();
                run_demux(demuxer, &routes, interval)
            })
        })();

        match result {
            Ok(()) => {
                info!("pipeline started with {} stage(s)", pipeline.stages.len());
                Ok(pipeline)
            }
            Err(e) => {
                error!("failed to start pipeline: {}", e);
                context.shutdown();
                pipeline.wait();
                Err(e)
            }
        }
    }
}

/// A running pipeline.
pub struct Pipeline {
    context: Arc<PipelineContext>,
    stages: Vec<(String, JoinHandle<StageReport>)>,
    before_spawn: Option<SpawnCheck>,
}

impl Pipeline {
    /// Builds, runs and waits for a pipeline.
    pub fn run(builder: PipelineBuilder) -> Result<PipelineReport> {
        Ok(builder.spawn()?.wait())
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.context
    }

    fn spawn_stage<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce() -> StageReport + Send + 'static,
    {
        if let Some(check) = self.before_spawn.as_mut() {
            check(name)?;
        }
        let context = Arc::clone(&self.context);
        let stage = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let started_at = Utc::now();
                match panic::catch_unwind(AssertUnwindSafe(body)) {
                    Ok(report) => report,
                    Err(_) => {
                        error!("{}: stage panicked, shutting the pipeline down", stage);
                        context.shutdown();
                        StageReport::panicked(&stage, started_at)
                    }
                }
            })?;
        self.stages.push((name.to_string(), handle));
        Ok(())
    }

    /// Blocks until every stage has terminated.
    pub fn wait(self) -> PipelineReport {
        let mut stages = Vec::with_capacity(self.stages.len());
        for (name, handle) in self.stages {
            let started_at = Utc::now();
            match handle.join() {
                Ok(report) => stages.push(report),
                Err(_) => stages.push(StageReport::panicked(&name, started_at)),
            }
        }
        PipelineReport { stages }
    }
}

/// Outcome of every stage of a finished pipeline.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// True when every stage ran to completion.
    pub fn is_success(&self) -> bool {
        self.stages.iter().all(StageReport::is_completed)
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageReport> {
        self.stages
            .iter()
            .filter(|report| report.outcome != StageOutcome::Completed)
    }
}
