//! Codec capabilities that move payloads through unchanged.
//!
//! The decoder wraps each packet's payload in a frame and the encoder wraps
//! each frame's payload in a packet, sharing the underlying bytes. They are
//! useful to exercise a pipeline without a real codec library.

use std::collections::VecDeque;

use bytes::Bytes;

use super::{Decoder, Encoder};
use crate::av::{EncodeParameters, Frame, Packet, StreamKind, StreamParameters};
use crate::error::{PipelineError, Result};

#[derive(Debug)]
pub struct PassthroughDecoder {
    params: StreamParameters,
    pending: VecDeque<Frame>,
    eof: bool,
}

impl PassthroughDecoder {
    pub fn new(params: &StreamParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params: params.clone(),
            pending: VecDeque::new(),
            eof: false,
        })
    }

    pub fn open(params: &StreamParameters) -> Result<Box<dyn Decoder>> {
        Ok(Box::new(Self::new(params)?))
    }
}

impl Decoder for PassthroughDecoder {
    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        if self.eof {
            return Err(PipelineError::Send("decoder already received eof".into()));
        }
        let mut frame = Frame::new(packet.data.clone()).with_kind(self.params.kind);
        frame.pts = packet.pts;
        frame.key_frame = packet.is_key;
        if self.params.kind == StreamKind::Video {
            frame.width = self.params.width.unwrap_or_default();
            frame.height = self.params.height.unwrap_or_default();
        }
        self.pending.push_back(frame);
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.pending.pop_front())
    }
}

/// Pass-through encoder with a configurable look-ahead: it holds back
/// `latency` frames until more input (or end of input) arrives, the way a
/// real encoder with B-frames does.
#[derive(Debug)]
pub struct PassthroughEncoder {
    kind: StreamKind,
    gop_size: Option<u32>,
    latency: usize,
    held: VecDeque<Packet>,
    encoded: u64,
    eof: bool,
}

impl PassthroughEncoder {
    pub fn new(params: &EncodeParameters, latency: usize) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            kind: params.kind(),
            gop_size: params.gop_size,
            latency,
            held: VecDeque::new(),
            encoded: 0,
            eof: false,
        })
    }

    pub fn open(params: &EncodeParameters) -> Result<Box<dyn Encoder>> {
        Ok(Box::new(Self::new(params, 0)?))
    }

    /// Returns an opener that builds encoders with the given look-ahead.
    pub fn with_latency(
        latency: usize,
    ) -> impl FnOnce(&EncodeParameters) -> Result<Box<dyn Encoder>> + Send {
        move |params: &EncodeParameters| {
            Ok(Box::new(Self::new(params, latency)?) as Box<dyn Encoder>)
        }
    }

    fn is_key(&self) -> bool {
        match self.gop_size {
            Some(gop) => self.encoded % gop as u64 == 0,
            None => self.encoded == 0,
        }
    }
}

impl Encoder for PassthroughEncoder {
    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.eof {
            return Err(PipelineError::Send("encoder already received eof".into()));
        }
        if frame.data.is_empty() {
            return Err(PipelineError::Send("empty frame".into()));
        }
        let mut packet = Packet::new(Bytes::clone(&frame.data))
            .with_kind(self.kind)
            .with_key_flag(self.is_key());
        packet.pts = frame.pts;
        packet.dts = frame.pts;
        self.encoded += 1;
        self.held.push_back(packet);
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        self.eof = true;
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Option<Packet>> {
        if self.eof || self.held.len() > self.latency {
            return Ok(self.held.pop_front());
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{CodecType, Rational};

    fn video_params() -> StreamParameters {
        StreamParameters::video(CodecType::H264, 320, 240, Rational::new(1, 25))
    }

    #[test]
    fn test_decoder_shares_payload() {
        let mut decoder = PassthroughDecoder::new(&video_params()).unwrap();
        let packet = Packet::new(vec![0x65u8, 1, 2]).with_pts(3).with_key_flag(true);
        decoder.send_packet(&packet).unwrap();

        let frame = decoder.receive_frame().unwrap().unwrap();
        assert_eq!(frame.data.as_ptr(), packet.data.as_ptr());
        assert_eq!((frame.width, frame.height), (320, 240));
        assert_eq!(frame.pts, Some(3));
        assert!(frame.key_frame);
        assert!(decoder.receive_frame().unwrap().is_none());
    }

    #[test]
    fn test_decoder_rejects_invalid_params() {
        let mut params = video_params();
        params.width = None;
        assert!(PassthroughDecoder::new(&params).is_err());
    }

    #[test]
    fn test_encoder_latency() {
        let params = EncodeParameters::new(video_params()).with_gop_size(2);
        let mut encoder = PassthroughEncoder::new(&params, 2).unwrap();

        for pts in 0..3 {
            encoder.send_frame(&Frame::new(vec![1u8]).with_pts(pts)).unwrap();
        }
        let first = encoder.receive_packet().unwrap().unwrap();
        assert_eq!(first.pts, Some(0));
        assert!(first.is_key);
        assert!(encoder.receive_packet().unwrap().is_none());

        encoder.send_eof().unwrap();
        let rest: Vec<_> = std::iter::from_fn(|| encoder.receive_packet().unwrap()).collect();
        assert_eq!(rest.len(), 2);
        assert!(!rest[0].is_key);
        assert!(rest[1].is_key);
    }

    #[test]
    fn test_encoder_rejects_empty_frame() {
        let params = EncodeParameters::new(video_params());
        let mut encoder = PassthroughEncoder::new(&params, 0).unwrap();
        assert!(matches!(
            encoder.send_frame(&Frame::default()),
            Err(PipelineError::Send(_))
        ));
    }
}
