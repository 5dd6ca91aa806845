use crate::error::Result;

mod frame;
mod packet;
mod params;

pub use frame::*;
pub use packet::*;
pub use params::*;

/// A heavyweight media unit that moves between stages by handle.
///
/// Implementations keep their payload behind shared, reference-counted
/// storage so that [`Resource::share_from`] never duplicates bytes. The
/// hand-off structures only ever touch a resource through these four
/// operations.
pub trait Resource: Sized + Send {
    /// Creates an empty handle, ready to receive content.
    fn allocate() -> Self;

    /// Drops whatever `self` currently references and makes it share the
    /// content of `src`.
    fn share_from(&mut self, src: &Self) -> Result<()>;

    /// Drops the referenced content, leaving an empty, reusable handle.
    fn release(&mut self);

    fn is_empty(&self) -> bool;
}

/// A distinguished value that travels through a FIFO to mark end of input.
pub trait Sentinel {
    fn sentinel() -> Self;
    fn is_sentinel(&self) -> bool;
}

/// Source of encoded packets, typically an input container reader.
pub trait Demuxer: Send {
    /// Parameters of every stream the input carries.
    fn streams(&self) -> Vec<StreamParameters>;

    /// Returns the next packet, or `None` at end of input.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// Output container writer. Opening a muxer (see [`OpenMuxer`]) is
/// expected to write the container header.
pub trait Muxer: Send {
    fn write_packet(&mut self, packet: &Packet) -> Result<()>;
    fn write_trailer(&mut self) -> Result<()>;
}

/// Opens a muxer for the given output streams, in output index order.
pub type OpenMuxer = Box<dyn FnOnce(&[StreamParameters]) -> Result<Box<dyn Muxer>> + Send>;
