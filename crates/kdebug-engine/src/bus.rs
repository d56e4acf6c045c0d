//! The message bus: one lock-free MPSC queue per dispatch thread. A
//! producer posts items from any thread; the owning dispatch thread blocks
//! on the first one, then drains whatever else has queued up since,
//! running every item to completion in arrival order before blocking
//! again — the "swap-and-drain" loop the concurrency model calls for,
//! without ever holding a lock across an action's execution.

use crossbeam_channel::{unbounded, Receiver, Sender};

pub struct BusSender<T> {
    tx: Sender<T>,
}

impl<T> Clone for BusSender<T> {
    fn clone(&self) -> Self {
        BusSender { tx: self.tx.clone() }
    }
}

impl<T> BusSender<T> {
    /// Posts an item. The receiver may already be gone (process shutting
    /// down); that is not this thread's problem to report.
    pub fn send(&self, item: T) {
        let _ = self.tx.send(item);
    }
}

pub struct BusReceiver<T> {
    rx: Receiver<T>,
}

impl<T> BusReceiver<T> {
    /// Blocks for the first item, then drains everything already queued.
    /// Returns `None` once every sender has dropped and the queue is empty.
    pub fn recv_batch(&self) -> Option<Vec<T>> {
        let first = self.rx.recv().ok()?;
        let mut batch = vec![first];
        while let Ok(item) = self.rx.try_recv() {
            batch.push(item);
        }
        Some(batch)
    }
}

pub fn bus<T>() -> (BusSender<T>, BusReceiver<T>) {
    let (tx, rx) = unbounded();
    (BusSender { tx }, BusReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_batch_drains_everything_queued_before_the_block_returns() {
        let (tx, rx) = bus::<u32>();
        tx.send(1);
        tx.send(2);
        tx.send(3);
        assert_eq!(rx.recv_batch(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn recv_batch_returns_none_once_senders_are_gone() {
        let (tx, rx) = bus::<u32>();
        drop(tx);
        assert_eq!(rx.recv_batch(), None);
    }

    #[test]
    fn sender_clones_share_the_same_queue() {
        let (tx, rx) = bus::<u32>();
        let tx2 = tx.clone();
        tx.send(1);
        tx2.send(2);
        assert_eq!(rx.recv_batch(), Some(vec![1, 2]));
    }
}
