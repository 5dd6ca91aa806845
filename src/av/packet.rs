use bytes::Bytes;
use std::time::Duration;

use super::{Resource, Sentinel, StreamKind};
use crate::error::Result;

/// An encoded media packet. The payload is reference counted, so cloning a
/// packet shares its bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packet {
    pub data: Bytes,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub kind: StreamKind,
    pub stream_index: usize,
    pub is_key: bool,
    pub duration: Option<Duration>,
}

impl Packet {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    /// The end-of-stream packet: no payload.
    pub fn eos() -> Self {
        Self::default()
    }

    pub fn is_eos(&self) -> bool {
        self.data.is_empty()
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_dts(mut self, dts: i64) -> Self {
        self.dts = Some(dts);
        self
    }

    pub fn with_kind(mut self, kind: StreamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_stream_index(mut self, index: usize) -> Self {
        self.stream_index = index;
        self
    }

    pub fn with_key_flag(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl Resource for Packet {
    fn allocate() -> Self {
        Self::default()
    }

    fn share_from(&mut self, src: &Self) -> Result<()> {
        self.clone_from(src);
        Ok(())
    }

    fn release(&mut self) {
        *self = Self::default();
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Sentinel for Packet {
    fn sentinel() -> Self {
        Self::eos()
    }

    fn is_sentinel(&self) -> bool {
        self.is_eos()
    }
}
