use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// Unbounded FIFO that moves values between threads.
///
/// There is no completion flag: producers signal end of input by pushing a
/// sentinel value, and consumers must stop popping once they have seen it.
#[derive(Debug)]
pub struct BlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    cond: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }

    pub fn push(&self, item: T) {
        let mut items = self.items.lock();
        items.push_back(item);
        self.cond.notify_one();
    }

    /// Removes the oldest value, waiting until one is available.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            self.cond.wait(&mut items);
        }
    }

    /// Removes the oldest value without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{Packet, Sentinel};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_try_pop_empty() {
        let queue = BlockingQueue::<u32>::new();
        assert_eq!(queue.try_pop(), None);
        queue.push(4);
        assert_eq!(queue.try_pop(), Some(4));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_waits_for_push() {
        let queue = Arc::new(BlockingQueue::<u32>::new());
        let (tx, rx) = mpsc::channel();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || tx.send(queue.pop()).unwrap())
        };
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        queue.push(11);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 11);
        consumer.join().unwrap();
    }

    #[test]
    fn test_sentinel_arrives_after_data() {
        let queue = BlockingQueue::new();
        for i in 0..3 {
            queue.push(Packet::new(vec![i as u8 + 1]).with_pts(i));
        }
        queue.push(Packet::sentinel());
        assert_eq!(queue.len(), 4);

        let mut pts = Vec::new();
        loop {
            let packet = queue.pop();
            if packet.is_sentinel() {
                break;
            }
            pts.push(packet.pts.unwrap());
        }
        assert_eq!(pts, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }
}
