use std::fmt;

use bytes::Bytes;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamKind {
    #[default]
    Video,
    Audio,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodecType {
    H264,
    H265,
    MPEG4,
    AAC,
    AC3,
    OPUS,
}

/// A rational number, used for time bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    pub fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// Converts a timestamp counted in `self` units into `to` units,
    /// rounding half away from zero. Invalid bases leave the value as is.
    pub fn rescale(self, value: i64, to: Rational) -> i64 {
        if !self.is_valid() || !to.is_valid() || self == to {
            return value;
        }
        let num = value as i128 * self.num as i128 * to.den as i128;
        let den = self.den as i128 * to.num as i128;
        let half = den / 2;
        let rounded = if num >= 0 {
            (num + half) / den
        } else {
            (num - half) / den
        };
        rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Codec parameters of one stream, as reported by a demuxer or handed to a
/// muxer.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParameters {
    pub kind: StreamKind,
    pub codec: CodecType,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub time_base: Rational,
    pub bit_rate: Option<u64>,
    pub extra_data: Option<Bytes>,
}

impl StreamParameters {
    pub fn video(codec: CodecType, width: u32, height: u32, time_base: Rational) -> Self {
        Self {
            kind: StreamKind::Video,
            codec,
            width: Some(width),
            height: Some(height),
            sample_rate: None,
            channels: None,
            time_base,
            bit_rate: None,
            extra_data: None,
        }
    }

    pub fn audio(codec: CodecType, sample_rate: u32, channels: u16, time_base: Rational) -> Self {
        Self {
            kind: StreamKind::Audio,
            codec,
            width: None,
            height: None,
            sample_rate: Some(sample_rate),
            channels: Some(channels),
            time_base,
            bit_rate: None,
            extra_data: None,
        }
    }

    pub fn with_bit_rate(mut self, bit_rate: u64) -> Self {
        self.bit_rate = Some(bit_rate);
        self
    }

    pub fn with_extra_data(mut self, extra_data: impl Into<Bytes>) -> Self {
        self.extra_data = Some(extra_data.into());
        self
    }

    /// Checks that the fields a codec needs for this stream kind are present.
    pub fn validate(&self) -> Result<()> {
        if !self.time_base.is_valid() {
            return Err(PipelineError::InvalidParameters(format!(
                "{} stream has invalid time base {}",
                self.kind, self.time_base
            )));
        }
        match self.kind {
            StreamKind::Video => match (self.width, self.height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => Ok(()),
                _ => Err(PipelineError::InvalidParameters(
                    "video stream requires non-zero width and height".into(),
                )),
            },
            StreamKind::Audio => match (self.sample_rate, self.channels) {
                (Some(rate), Some(ch)) if rate > 0 && ch > 0 => Ok(()),
                _ => Err(PipelineError::InvalidParameters(
                    "audio stream requires sample rate and channel count".into(),
                )),
            },
        }
    }
}

/// Target of an encode stage: the output stream plus encoder tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParameters {
    pub stream: StreamParameters,
    pub gop_size: Option<u32>,
    pub max_b_frames: Option<u32>,
    /// Replace incoming frame timestamps with a 0-based counter in the
    /// target time base.
    pub regenerate_pts: bool,
}

impl EncodeParameters {
    pub fn new(stream: StreamParameters) -> Self {
        Self {
            stream,
            gop_size: None,
            max_b_frames: None,
            regenerate_pts: false,
        }
    }

    pub fn with_gop_size(mut self, gop_size: u32) -> Self {
        self.gop_size = Some(gop_size);
        self
    }

    pub fn with_max_b_frames(mut self, max_b_frames: u32) -> Self {
        self.max_b_frames = Some(max_b_frames);
        self
    }

    pub fn with_regenerated_pts(mut self) -> Self {
        self.regenerate_pts = true;
        self
    }

    pub fn kind(&self) -> StreamKind {
        self.stream.kind
    }

    pub fn validate(&self) -> Result<()> {
        self.stream.validate()?;
        if self.gop_size == Some(0) {
            return Err(PipelineError::InvalidParameters("gop size must be non-zero".into()));
        }
        Ok(())
    }
}
