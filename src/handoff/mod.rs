//! # Hand-off Structures
//!
//! Thread-safe structures that move media units between pipeline stages:
//!
//! - [`SlotBuffer`]: bounded ring of pre-allocated slots with backpressure
//!   and a one-shot flush (abandon) signal
//! - [`BlockingQueue`]: unbounded by-value FIFO terminated by a sentinel
//! - [`DeepCopyQueue`]: unbounded FIFO of shared copies terminated by a
//!   done flag
//!
//! Stages do not talk to these types directly; they see an [`Inlet`] on the
//! pull side and an [`Outlet`] on the push side, so the same stage loop
//! works whichever structure sits between two stages.

mod deep_copy;
mod queue;
mod slot_buffer;

pub use deep_copy::DeepCopyQueue;
pub use queue::BlockingQueue;
pub use slot_buffer::{SlotBuffer, DEFAULT_FRAME_CAPACITY, DEFAULT_PACKET_CAPACITY};

use crate::av::{Resource, Sentinel};
use crate::error::{PipelineError, Result};

/// Pull side of a hand-off structure.
pub trait Inlet<T>: Send + Sync {
    /// Blocks for the next unit and stores it in `out`.
    ///
    /// [`PipelineError::Drained`] is terminal: the consumer must stop
    /// calling `recv`. Any other error means one unit was lost and the
    /// consumer may keep going.
    fn recv(&self, out: &mut T) -> Result<()>;

    /// Called by a consumer that stops before draining, so producers
    /// blocked on this structure give up instead of waiting forever.
    fn abandon(&self) {}
}

/// Push side of a hand-off structure.
pub trait Outlet<T>: Send + Sync {
    fn send(&self, item: T) -> Result<()>;

    /// Signals that no more units will be sent.
    fn finish(&self);
}

impl<T: Sentinel + Send> Inlet<T> for BlockingQueue<T> {
    fn recv(&self, out: &mut T) -> Result<()> {
        let item = self.pop();
        if item.is_sentinel() {
            return Err(PipelineError::Drained);
        }
        *out = item;
        Ok(())
    }
}

impl<T: Sentinel + Send> Outlet<T> for BlockingQueue<T> {
    fn send(&self, item: T) -> Result<()> {
        self.push(item);
        Ok(())
    }

    fn finish(&self) {
        self.push(T::sentinel());
    }
}

impl<T: Resource> Inlet<T> for SlotBuffer<T> {
    fn recv(&self, out: &mut T) -> Result<()> {
        self.pop(out)
    }

    fn abandon(&self) {
        self.flush();
    }
}

impl<T: Resource> Outlet<T> for SlotBuffer<T> {
    fn send(&self, item: T) -> Result<()> {
        self.push(&item)
    }

    fn finish(&self) {
        self.flush();
    }
}

impl<T: Resource> Inlet<T> for DeepCopyQueue<T> {
    fn recv(&self, out: &mut T) -> Result<()> {
        self.pop(out, true)
    }

    /// Refuses further pushes and frees whatever is queued; nobody will
    /// read it.
    fn abandon(&self) {
        self.mark_done();
        self.clear();
    }
}

impl<T: Resource> Outlet<T> for DeepCopyQueue<T> {
    fn send(&self, item: T) -> Result<()> {
        self.push(&item)
    }

    fn finish(&self) {
        self.mark_done();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{mpsc, Arc};
    use std::thread;

    use super::SlotBuffer;
    use crate::av::Resource;
    use crate::error::{PipelineError, Result};

    /// Resource whose copy can be made to fail, from either side.
    #[derive(Debug, Default)]
    pub(crate) struct Flaky {
        pub value: Option<u32>,
        broken: bool,
        refuse: bool,
    }

    impl Flaky {
        pub fn value(value: u32) -> Self {
            Self {
                value: Some(value),
                ..Default::default()
            }
        }

        /// A source that cannot be copied.
        pub fn broken() -> Self {
            Self {
                value: Some(0),
                broken: true,
                refuse: false,
            }
        }

        /// A destination that refuses every copy.
        pub fn refusing() -> Self {
            Self {
                refuse: true,
                ..Default::default()
            }
        }
    }

    impl Resource for Flaky {
        fn allocate() -> Self {
            Self::default()
        }

        fn share_from(&mut self, src: &Self) -> Result<()> {
            if src.broken || self.refuse {
                return Err(PipelineError::Clone("flaky resource".into()));
            }
            self.value = src.value;
            Ok(())
        }

        fn release(&mut self) {
            self.value = None;
        }

        fn is_empty(&self) -> bool {
            self.value.is_none()
        }
    }

    pub(crate) fn spawn_pop<T: Resource + 'static>(
        buf: &Arc<SlotBuffer<T>>,
    ) -> mpsc::Receiver<Result<()>> {
        let (tx, rx) = mpsc::channel();
        let buf = Arc::clone(buf);
        thread::spawn(move || {
            let mut out = T::allocate();
            let _ = tx.send(buf.pop(&mut out));
        });
        rx
    }
}
