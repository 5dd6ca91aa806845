use log::{debug, error, warn};

use super::stage::{StageOutcome, StageReport, StageState, StageTracker};
use crate::av::{
    EncodeParameters, Frame, Packet, Rational, Resource, StreamKind, StreamParameters,
};
use crate::codec::{Decoder, Encoder, OpenDecoder, OpenEncoder};
use crate::error::{PipelineError, Result};
use crate::handoff::{Inlet, Outlet};

/// An opened codec capability as seen by the stage loop: one unit in, zero
/// or more units out.
pub(crate) trait Transform: Send {
    type Input: Resource;
    type Output;

    fn send(&mut self, input: &Self::Input) -> Result<()>;
    fn send_eof(&mut self) -> Result<()>;
    fn receive(&mut self) -> Result<Option<Self::Output>>;
}

pub(crate) struct DecodeStep {
    decoder: Box<dyn Decoder>,
    kind: StreamKind,
}

impl Transform for DecodeStep {
    type Input = Packet;
    type Output = Frame;

    fn send(&mut self, packet: &Packet) -> Result<()> {
        self.decoder.send_packet(packet)
    }

    fn send_eof(&mut self) -> Result<()> {
        self.decoder.send_eof()
    }

    fn receive(&mut self) -> Result<Option<Frame>> {
        let mut frame = self.decoder.receive_frame()?;
        if let Some(frame) = frame.as_mut() {
            frame.kind = self.kind;
        }
        Ok(frame)
    }
}

pub(crate) struct EncodeStep {
    encoder: Box<dyn Encoder>,
    kind: StreamKind,
    stream_index: usize,
    regenerate_pts: bool,
    next_pts: i64,
    time_base: Option<Rational>,
    target_time_base: Rational,
}

impl Transform for EncodeStep {
    type Input = Frame;
    type Output = Packet;

    fn send(&mut self, frame: &Frame) -> Result<()> {
        if frame.data.is_empty() {
            return Err(PipelineError::Send("empty frame".into()));
        }
        if self.regenerate_pts {
            let mut frame = frame.clone();
            frame.pts = Some(self.next_pts);
            self.next_pts += 1;
            return self.encoder.send_frame(&frame);
        }
        self.encoder.send_frame(frame)
    }

    fn send_eof(&mut self) -> Result<()> {
        self.encoder.send_eof()
    }

    fn receive(&mut self) -> Result<Option<Packet>> {
        let mut packet = self.encoder.receive_packet()?;
        if let Some(packet) = packet.as_mut() {
            packet.kind = self.kind;
            packet.stream_index = self.stream_index;
            if let Some(from) = self.time_base.filter(|tb| *tb != self.target_time_base) {
                let to = self.target_time_base;
                packet.pts = packet.pts.map(|pts| from.rescale(pts, to));
                packet.dts = packet.dts.map(|dts| from.rescale(dts, to));
            }
        }
        Ok(packet)
    }
}

/// Runs a decode stage for the source stream described by `source`.
pub(crate) fn run_decode(
    name: &str,
    kind: StreamKind,
    source: Option<StreamParameters>,
    open: OpenDecoder,
    inlet: &dyn Inlet<Packet>,
    outlet: &dyn Outlet<Frame>,
    progress_interval: u64,
) -> StageReport {
    let tracker = StageTracker::new(name, progress_interval);
    run_stage(
        tracker,
        inlet,
        outlet,
        || {
            let params = source.ok_or_else(|| {
                PipelineError::InvalidParameters(format!("no {} stream in input", kind))
            })?;
            params.validate()?;
            Ok(params)
        },
        |params| Ok(DecodeStep { decoder: open(&params)?, kind }),
    )
}

/// Runs an encode stage producing packets for output stream `stream_index`.
pub(crate) fn run_encode(
    name: &str,
    params: EncodeParameters,
    stream_index: usize,
    open: OpenEncoder,
    inlet: &dyn Inlet<Frame>,
    outlet: &dyn Outlet<Packet>,
    progress_interval: u64,
) -> StageReport {
    let tracker = StageTracker::new(name, progress_interval);
    run_stage(
        tracker,
        inlet,
        outlet,
        || {
            params.validate()?;
            Ok(params)
        },
        |params| {
            let encoder = open(&params)?;
            let time_base = encoder.time_base();
            Ok(EncodeStep {
                encoder,
                kind: params.kind(),
                stream_index,
                regenerate_pts: params.regenerate_pts,
                next_pts: 0,
                time_base,
                target_time_base: params.stream.time_base,
            })
        },
    )
}

/// The stage loop shared by decode and encode stages.
fn run_stage<T, C>(
    mut tracker: StageTracker,
    inlet: &dyn Inlet<T::Input>,
    outlet: &dyn Outlet<T::Output>,
    init: impl FnOnce() -> Result<C>,
    open: impl FnOnce(C) -> Result<T>,
) -> StageReport
where
    T: Transform,
{
    let config = match init() {
        Ok(config) => config,
        Err(e) => return abort(tracker, e, inlet, outlet),
    };

    tracker.enter(StageState::OpenCapability);
    let mut step = match open(config) {
        Ok(step) => step,
        Err(e) => return abort(tracker, e, inlet, outlet),
    };
    debug!("{}: capability open", tracker.name());

    tracker.enter(StageState::Running);
    let mut unit = T::Input::allocate();
    loop {
        match inlet.recv(&mut unit) {
            Ok(()) => {}
            Err(e) if e.is_end_of_stream() => break,
            Err(e) => {
                warn!("{}: lost input unit: {}", tracker.name(), e);
                tracker.dropped();
                continue;
            }
        }
        tracker.received();

        let sent = step.send(&unit);
        unit.release();
        if let Err(e) = sent {
            warn!("{}: skipping unit: {}", tracker.name(), e);
            tracker.dropped();
            continue;
        }
        forward(&mut step, outlet, &mut tracker);
    }

    tracker.enter(StageState::Draining);
    if let Err(e) = step.send_eof() {
        warn!("{}: end of input rejected: {}", tracker.name(), e);
    }
    forward(&mut step, outlet, &mut tracker);

    tracker.enter(StageState::FlushingDownstream);
    outlet.finish();

    tracker.enter(StageState::Terminated);
    drop(step);
    tracker.finish(StageOutcome::Completed)
}

/// Pushes everything the capability has ready.
fn forward<T: Transform>(step: &mut T, outlet: &dyn Outlet<T::Output>, tracker: &mut StageTracker) {
    loop {
        match step.receive() {
            Ok(Some(output)) => match outlet.send(output) {
                Ok(()) => tracker.produced(),
                Err(e) => {
                    warn!("{}: downstream refused unit: {}", tracker.name(), e);
                    tracker.dropped();
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!("{}: receive failed: {}", tracker.name(), e);
                break;
            }
        }
    }
}

/// Ends a stage that never reached `Running`.
fn abort<I, O>(
    mut tracker: StageTracker,
    err: PipelineError,
    inlet: &dyn Inlet<I>,
    outlet: &dyn Outlet<O>,
) -> StageReport {
    error!("{}: failed in {}: {}", tracker.name(), tracker.state(), err);
    tracker.enter(StageState::FlushingDownstream);
    outlet.finish();
    inlet.abandon();
    tracker.finish(StageOutcome::Failed(err.to_string()))
}
