use crate::av::{EncodeParameters, Frame, Packet, Rational, StreamParameters};
use crate::error::Result;

pub mod passthrough;

pub use passthrough::{PassthroughDecoder, PassthroughEncoder};

/// An opened decoder, driven with the send/receive pattern: send one packet,
/// then receive until `Ok(None)`.
pub trait Decoder: Send {
    fn send_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Signals end of input so buffered frames can be received.
    fn send_eof(&mut self) -> Result<()>;

    /// Returns the next available frame, or `None` if the decoder needs more
    /// input (or is fully drained after `send_eof`).
    fn receive_frame(&mut self) -> Result<Option<Frame>>;
}

/// An opened encoder, driven like [`Decoder`].
pub trait Encoder: Send {
    fn send_frame(&mut self, frame: &Frame) -> Result<()>;
    fn send_eof(&mut self) -> Result<()>;
    fn receive_packet(&mut self) -> Result<Option<Packet>>;

    /// Time base of the timestamps on received packets. `None` means they
    /// already count in the target stream's time base.
    fn time_base(&self) -> Option<Rational> {
        None
    }
}

/// Opens a decoder for a source stream.
pub type OpenDecoder = Box<dyn FnOnce(&StreamParameters) -> Result<Box<dyn Decoder>> + Send>;

/// Opens an encoder for a target stream.
pub type OpenEncoder = Box<dyn FnOnce(&EncodeParameters) -> Result<Box<dyn Encoder>> + Send>;
