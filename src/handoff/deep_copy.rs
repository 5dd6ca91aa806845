use std::collections::VecDeque;

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::av::Resource;
use crate::error::{PipelineError, Result};

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    done: bool,
}

/// Unbounded queue that owns a shared copy of every pushed resource.
///
/// `push` never blocks the producer. [`DeepCopyQueue::mark_done`] declares
/// that no more pushes will happen; whatever is queued is still served, and
/// a blocking pop on an empty, done queue returns [`PipelineError::Drained`].
#[derive(Debug)]
pub struct DeepCopyQueue<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T: Resource> DeepCopyQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                done: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Stores a shared copy of `item`; the caller keeps its own handle.
    ///
    /// Fails with [`PipelineError::Closed`] once the queue is marked done.
    pub fn push(&self, item: &T) -> Result<()> {
        let mut copy = T::allocate();
        copy.share_from(item)?;

        let mut state = self.state.lock();
        if state.done {
            return Err(PipelineError::Closed);
        }
        state.items.push_back(copy);
        self.cond.notify_one();
        Ok(())
    }

    /// Moves the oldest resource into `out`, replacing its previous content.
    ///
    /// With `block` set this waits until a resource arrives or the queue is
    /// marked done. Returns [`PipelineError::Drained`] when the queue is empty
    /// and done, and [`PipelineError::Empty`] when a non-blocking pop finds
    /// nothing yet.
    pub fn pop(&self, out: &mut T, block: bool) -> Result<()> {
        let mut state = self.state.lock();
        if block {
            while state.items.is_empty() && !state.done {
                self.cond.wait(&mut state);
            }
        }
        match state.items.pop_front() {
            Some(item) => {
                *out = item;
                Ok(())
            }
            None if state.done => Err(PipelineError::Drained),
            None => Err(PipelineError::Empty),
        }
    }

    pub fn mark_done(&self) {
        let mut state = self.state.lock();
        state.done = true;
        self.cond.notify_all();
    }

    pub fn is_empty_and_done(&self) -> bool {
        let state = self.state.lock();
        state.items.is_empty() && state.done
    }

    /// Releases every queued resource. The done flag is left untouched.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.items.len();
        state.items.clear();
        if dropped > 0 {
            debug!("deep copy queue cleared {} pending resource(s)", dropped);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl<T: Resource> Default for DeepCopyQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::Packet;
    use crate::handoff::test_support::Flaky;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_empty_done_is_terminal() {
        let queue = DeepCopyQueue::<Packet>::new();
        queue.mark_done();
        assert!(queue.is_empty_and_done());

        let mut out = Packet::allocate();
        assert!(queue.pop(&mut out, true).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_done_still_drains() {
        let queue = DeepCopyQueue::new();
        queue.push(&Packet::new(vec![1u8]).with_pts(1)).unwrap();
        queue.push(&Packet::new(vec![2u8]).with_pts(2)).unwrap();
        queue.mark_done();
        assert!(!queue.is_empty_and_done());

        let mut out = Packet::allocate();
        queue.pop(&mut out, true).unwrap();
        assert_eq!(out.pts, Some(1));
        queue.pop(&mut out, true).unwrap();
        assert_eq!(out.pts, Some(2));
        assert!(queue.is_empty_and_done());
        assert!(matches!(queue.pop(&mut out, true), Err(PipelineError::Drained)));
    }

    #[test]
    fn test_push_after_done_is_refused() {
        let queue = DeepCopyQueue::new();
        queue.mark_done();
        assert!(matches!(
            queue.push(&Packet::new(vec![1u8])),
            Err(PipelineError::Closed)
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_non_blocking_pop() {
        let queue = DeepCopyQueue::<Packet>::new();
        let mut out = Packet::allocate();
        assert!(matches!(queue.pop(&mut out, false), Err(PipelineError::Empty)));

        queue.push(&Packet::new(vec![3u8])).unwrap();
        queue.pop(&mut out, false).unwrap();
        assert_eq!(&out.data[..], &[3]);
    }

    #[test]
    fn test_push_is_a_copy() {
        let queue = DeepCopyQueue::new();
        let mut original = Packet::new(vec![5u8]).with_pts(5);
        queue.push(&original).unwrap();
        original.pts = Some(50);

        let mut out = Packet::allocate();
        queue.pop(&mut out, false).unwrap();
        assert_eq!(out.pts, Some(5));
        assert_eq!(out.data.as_ptr(), original.data.as_ptr());
    }

    #[test]
    fn test_clone_failure_is_reported() {
        let queue = DeepCopyQueue::<Flaky>::new();
        assert!(matches!(queue.push(&Flaky::broken()), Err(PipelineError::Clone(_))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_mark_done_wakes_waiters() {
        let queue = Arc::new(DeepCopyQueue::<Packet>::new());
        let (tx, rx) = mpsc::channel();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                thread::spawn(move || {
                    let mut out = Packet::allocate();
                    tx.send(queue.pop(&mut out, true).is_err()).unwrap();
                })
            })
            .collect();
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        queue.mark_done();
        for _ in 0..3 {
            assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_clear() {
        let queue = DeepCopyQueue::new();
        for i in 0..4u8 {
            queue.push(&Packet::new(vec![i + 1])).unwrap();
        }
        assert_eq!(queue.len(), 4);
        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.is_empty_and_done());
    }
}
