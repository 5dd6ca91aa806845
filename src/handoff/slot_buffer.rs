use std::fmt;

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::av::Resource;
use crate::error::{PipelineError, Result};

/// Default capacity for decoded frame buffers.
pub const DEFAULT_FRAME_CAPACITY: usize = 30;
/// Default capacity for encoded packet buffers.
pub const DEFAULT_PACKET_CAPACITY: usize = 50;

struct Ring<T> {
    slots: Vec<T>,
    read: usize,
    write: usize,
    len: usize,
    flushed: bool,
}

impl<T> Ring<T> {
    fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    fn advance(&self, idx: usize) -> usize {
        (idx + 1) % self.slots.len()
    }

    fn check_invariant(&self) {
        let cap = self.slots.len();
        debug_assert!(self.len <= cap);
        debug_assert_eq!(self.len % cap, (self.write + cap - self.read) % cap);
    }
}

/// Fixed-capacity circular buffer of pre-allocated resource slots.
///
/// `push` copies a shared reference into the next free slot and blocks
/// while the buffer is full; `pop` copies the oldest slot out into the
/// caller's handle, releases the slot for reuse and blocks while the buffer
/// is empty. Every slot always holds an allocated handle, so the hot path
/// never allocates beyond the reference copy itself.
///
/// [`SlotBuffer::flush`] is a one-shot abandon signal observed by both
/// sides: pending and future pushes are refused, while pops keep returning
/// whatever is still buffered and report [`PipelineError::Drained`] once
/// the buffer is empty.
pub struct SlotBuffer<T> {
    ring: Mutex<Ring<T>>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T: Resource> SlotBuffer<T> {
    /// Creates a buffer with `capacity` pre-allocated slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "slot buffer capacity must be non-zero");
        let slots = (0..capacity).map(|_| T::allocate()).collect();
        Self {
            ring: Mutex::new(Ring {
                slots,
                read: 0,
                write: 0,
                len: 0,
                flushed: false,
            }),
            capacity,
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Copies `item` into the next write slot, waiting for space.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Flushed`] if the buffer was flushed before or
    ///   while waiting; nothing is stored.
    /// - [`PipelineError::Clone`] (or whatever the resource reports) if the
    ///   copy failed; the slot is released and the buffer stays usable.
    pub fn push(&self, item: &T) -> Result<()> {
        let mut ring = self.ring.lock();
        while ring.is_full() && !ring.flushed {
            self.not_full.wait(&mut ring);
        }
        if ring.flushed {
            debug!("slot buffer flushed, refusing push");
            return Err(PipelineError::Flushed);
        }

        let idx = ring.write;
        if let Err(e) = ring.slots[idx].share_from(item) {
            ring.slots[idx].release();
            return Err(e);
        }
        ring.write = ring.advance(idx);
        ring.len += 1;
        ring.check_invariant();
        self.not_empty.notify_one();
        Ok(())
    }

    /// Copies the oldest element into `out`, waiting for data.
    ///
    /// Returns [`PipelineError::Drained`] once the buffer is both empty and
    /// flushed. If copying into `out` fails the element is still consumed
    /// (the unit is dropped) so the next pop does not retry the same slot.
    pub fn pop(&self, out: &mut T) -> Result<()> {
        let mut ring = self.ring.lock();
        while ring.len == 0 && !ring.flushed {
            self.not_empty.wait(&mut ring);
        }
        if ring.len == 0 {
            return Err(PipelineError::Drained);
        }

        let idx = ring.read;
        let copied = out.share_from(&ring.slots[idx]);
        ring.slots[idx].release();
        ring.read = ring.advance(idx);
        ring.len -= 1;
        ring.check_invariant();
        self.not_full.notify_one();
        copied
    }

    /// Sets the flush flag and wakes every waiting producer and consumer.
    pub fn flush(&self) {
        let mut ring = self.ring.lock();
        if !ring.flushed {
            ring.flushed = true;
            debug!("slot buffer flushed with {} element(s) pending", ring.len);
        }
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Returns the buffer to its just-constructed state: every slot is
    /// released and re-allocated, indices are zeroed and the flush flag is
    /// cleared. Exclusive access guarantees no push or pop is in flight.
    pub fn reset(&mut self) {
        let ring = self.ring.get_mut();
        for slot in ring.slots.iter_mut() {
            slot.release();
            *slot = T::allocate();
        }
        ring.read = 0;
        ring.write = 0;
        ring.len = 0;
        ring.flushed = false;
        debug!("slot buffer reset ({} slots)", self.capacity);
    }
}

impl<T> SlotBuffer<T> {
    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_flushed(&self) -> bool {
        self.ring.lock().flushed
    }
}

impl<T> fmt::Debug for SlotBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("SlotBuffer")
            .field("capacity", &self.capacity)
            .field("len", &ring.len)
            .field("read", &ring.read)
            .field("write", &ring.write)
            .field("flushed", &ring.flushed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::Packet;
    use crate::handoff::test_support::{spawn_pop, Flaky};
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);
    const BRIEF: Duration = Duration::from_millis(100);

    fn packet(byte: u8) -> Packet {
        Packet::new(vec![byte]).with_pts(byte as i64)
    }

    #[test]
    fn test_drain_then_terminate() {
        let buf = SlotBuffer::<Packet>::new(2);
        buf.push(&packet(b'A')).unwrap();
        buf.push(&packet(b'B')).unwrap();
        buf.flush();

        let mut out = Packet::allocate();
        buf.pop(&mut out).unwrap();
        assert_eq!(&out.data[..], b"A");
        buf.pop(&mut out).unwrap();
        assert_eq!(&out.data[..], b"B");
        assert!(buf.pop(&mut out).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_push_after_flush_is_refused() {
        let buf = SlotBuffer::<Packet>::new(4);
        buf.flush();
        assert!(matches!(buf.push(&packet(1)), Err(PipelineError::Flushed)));
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_clone_independence() {
        let buf = SlotBuffer::<Packet>::new(2);
        let mut original = packet(7);
        buf.push(&original).unwrap();

        original.data = bytes::Bytes::from_static(b"changed");
        original.pts = Some(99);

        let mut out = Packet::allocate();
        buf.pop(&mut out).unwrap();
        assert_eq!(&out.data[..], &[7]);
        assert_eq!(out.pts, Some(7));
    }

    #[test]
    fn test_pop_after_release_blocks() {
        let buf = Arc::new(SlotBuffer::<Packet>::new(2));
        buf.push(&packet(1)).unwrap();
        let mut out = Packet::allocate();
        buf.pop(&mut out).unwrap();

        let rx = spawn_pop(&buf);
        assert!(rx.recv_timeout(BRIEF).is_err(), "pop returned stale data");

        buf.flush();
        let result = rx.recv_timeout(WAIT).expect("pop did not wake after flush");
        assert!(result.unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_push_blocks_while_full() {
        let buf = Arc::new(SlotBuffer::<Packet>::new(1));
        buf.push(&packet(1)).unwrap();

        let (tx, rx) = mpsc::channel();
        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || tx.send(buf.push(&packet(2))).unwrap())
        };
        assert!(rx.recv_timeout(BRIEF).is_err(), "push did not block on a full buffer");

        let mut out = Packet::allocate();
        buf.pop(&mut out).unwrap();
        rx.recv_timeout(WAIT).unwrap().unwrap();
        producer.join().unwrap();

        buf.pop(&mut out).unwrap();
        assert_eq!(&out.data[..], &[2]);
    }

    #[test]
    fn test_flush_releases_all_waiters() {
        let full = Arc::new(SlotBuffer::<Packet>::new(1));
        full.push(&packet(0)).unwrap();
        let empty = Arc::new(SlotBuffer::<Packet>::new(1));

        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::new();
        for i in 0..4u8 {
            let full = Arc::clone(&full);
            let tx = tx.clone();
            handles.push(thread::spawn(move || {
                tx.send(full.push(&packet(i)).is_err()).unwrap()
            }));
        }
        for _ in 0..4 {
            let empty = Arc::clone(&empty);
            let tx = tx.clone();
            handles.push(thread::spawn(move || {
                let mut out = Packet::allocate();
                tx.send(empty.pop(&mut out).is_err()).unwrap()
            }));
        }
        drop(tx);
        assert!(rx.recv_timeout(BRIEF).is_err());

        full.flush();
        empty.flush();
        for _ in 0..8 {
            assert!(rx.recv_timeout(WAIT).expect("waiter stuck after flush"));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // the element buffered before the flush is still served
        let mut out = Packet::allocate();
        full.pop(&mut out).unwrap();
        assert_eq!(&out.data[..], &[0]);
    }

    #[test]
    fn test_fifo_across_threads() {
        let buf = Arc::new(SlotBuffer::<Packet>::new(3));
        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                for i in 0..200u8 {
                    buf.push(&packet(i)).unwrap();
                }
                buf.flush();
            })
        };

        let mut seen = Vec::new();
        let mut out = Packet::allocate();
        while buf.pop(&mut out).is_ok() {
            assert!(buf.len() <= buf.capacity());
            seen.push(out.data[0]);
        }
        producer.join().unwrap();
        assert_eq!(seen, (0..200u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_push_clone_failure_keeps_buffer_usable() {
        let buf = SlotBuffer::<Flaky>::new(2);
        assert!(matches!(buf.push(&Flaky::broken()), Err(PipelineError::Clone(_))));
        assert_eq!(buf.len(), 0);

        buf.push(&Flaky::value(5)).unwrap();
        let mut out = Flaky::allocate();
        buf.pop(&mut out).unwrap();
        assert_eq!(out.value, Some(5));
    }

    #[test]
    fn test_pop_clone_failure_drops_unit() {
        let buf = SlotBuffer::<Flaky>::new(2);
        buf.push(&Flaky::value(1)).unwrap();
        buf.push(&Flaky::value(2)).unwrap();

        let mut refusing = Flaky::refusing();
        assert!(matches!(buf.pop(&mut refusing), Err(PipelineError::Clone(_))));
        assert_eq!(buf.len(), 1);

        let mut out = Flaky::allocate();
        buf.pop(&mut out).unwrap();
        assert_eq!(out.value, Some(2));
    }

    #[test]
    fn test_reset() {
        let mut buf = SlotBuffer::<Packet>::new(3);
        buf.push(&packet(1)).unwrap();
        buf.push(&packet(2)).unwrap();
        buf.flush();

        buf.reset();
        assert_eq!(buf.len(), 0);
        assert!(!buf.is_flushed());

        buf.push(&packet(3)).unwrap();
        let mut out = Packet::allocate();
        buf.pop(&mut out).unwrap();
        assert_eq!(&out.data[..], &[3]);
    }

    #[test]
    #[should_panic(expected = "capacity must be non-zero")]
    fn test_zero_capacity_panics() {
        let _ = SlotBuffer::<Packet>::new(0);
    }

    // Replays a push/pop script without ever blocking: pushes are skipped
    // while full and pops while empty.
    #[quickcheck]
    fn prop_len_stays_within_capacity(capacity: u8, ops: Vec<bool>) -> bool {
        let capacity = (capacity % 8) as usize + 1;
        let buf = SlotBuffer::<Packet>::new(capacity);
        let mut out = Packet::allocate();
        let mut expected = 0usize;

        for push in ops {
            if push && expected < capacity {
                buf.push(&packet(1)).unwrap();
                expected += 1;
            } else if !push && expected > 0 {
                buf.pop(&mut out).unwrap();
                expected -= 1;
            }
            if buf.len() != expected || buf.len() > capacity {
                return false;
            }
        }
        true
    }

    #[quickcheck]
    fn prop_fifo_order(values: Vec<u8>, capacity: u8) -> bool {
        let capacity = (capacity % 8) as usize + 1;
        let buf = SlotBuffer::<Packet>::new(capacity);
        let mut out = Packet::allocate();
        let mut popped = Vec::new();

        for chunk in values.chunks(capacity) {
            for &v in chunk {
                buf.push(&packet(v)).unwrap();
            }
            for _ in chunk {
                buf.pop(&mut out).unwrap();
                popped.push(out.data[0]);
            }
        }
        popped == values
    }
}
