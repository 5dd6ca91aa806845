use log::debug;

use crate::av::{Frame, Packet, Sentinel, StreamKind};
use crate::config::PipelineConfig;
use crate::handoff::{BlockingQueue, DeepCopyQueue, Inlet, Outlet, SlotBuffer};

/// Every hand-off structure of one pipeline run.
///
/// Built once before the stages start and shared with each of them by
/// `Arc`. Two pipelines never share a context.
#[derive(Debug)]
pub struct PipelineContext {
    pub video_packets: BlockingQueue<Packet>,
    pub audio_packets: BlockingQueue<Packet>,
    pub video_frames: SlotBuffer<Frame>,
    pub audio_frames: SlotBuffer<Frame>,
    /// Encoded video never blocks its encoder.
    pub video_encoded: DeepCopyQueue<Packet>,
    pub audio_encoded: SlotBuffer<Packet>,
}

impl PipelineContext {
    /// # Panics
    ///
    /// Panics if a configured capacity is zero; see
    /// [`PipelineConfig::validate`].
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            video_packets: BlockingQueue::new(),
            audio_packets: BlockingQueue::new(),
            video_frames: SlotBuffer::new(config.video_frame_capacity),
            audio_frames: SlotBuffer::new(config.audio_frame_capacity),
            video_encoded: DeepCopyQueue::new(),
            audio_encoded: SlotBuffer::new(config.audio_packet_capacity),
        }
    }

    pub fn packets(&self, kind: StreamKind) -> &BlockingQueue<Packet> {
        match kind {
            StreamKind::Video => &self.video_packets,
            StreamKind::Audio => &self.audio_packets,
        }
    }

    pub fn frames(&self, kind: StreamKind) -> &SlotBuffer<Frame> {
        match kind {
            StreamKind::Video => &self.video_frames,
            StreamKind::Audio => &self.audio_frames,
        }
    }

    pub(crate) fn encoded_outlet(&self, kind: StreamKind) -> &dyn Outlet<Packet> {
        match kind {
            StreamKind::Video => &self.video_encoded,
            StreamKind::Audio => &self.audio_encoded,
        }
    }

    pub(crate) fn encoded_inlet(&self, kind: StreamKind) -> &dyn Inlet<Packet> {
        match kind {
            StreamKind::Video => &self.video_encoded,
            StreamKind::Audio => &self.audio_encoded,
        }
    }

    /// Signals end of stream on every structure, releasing any stage that
    /// is blocked on one. Already buffered units can still be read.
    pub fn shutdown(&self) {
        debug!("shutting down pipeline hand-offs");
        self.video_packets.push(Packet::sentinel());
        self.audio_packets.push(Packet::sentinel());
        self.video_frames.flush();
        self.audio_frames.flush();
        self.video_encoded.mark_done();
        self.audio_encoded.flush();
    }
}
