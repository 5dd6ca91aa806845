use bytes::Bytes;

use super::{Resource, StreamKind};
use crate::error::Result;

/// A decoded frame: a picture for video, a block of samples for audio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub data: Bytes,
    pub kind: StreamKind,
    pub pts: Option<i64>,
    pub width: u32,
    pub height: u32,
    pub nb_samples: u32,
    pub key_frame: bool,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: StreamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_samples(mut self, nb_samples: u32) -> Self {
        self.nb_samples = nb_samples;
        self
    }

    pub fn with_key_frame(mut self, key_frame: bool) -> Self {
        self.key_frame = key_frame;
        self
    }
}

impl Resource for Frame {
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
