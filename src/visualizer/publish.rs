use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use super::VisualSnapshot;

/// Fans snapshots out to every live subscriber.
#[derive(Debug, Default)]
pub struct SnapshotPublisher {
    subscribers: Vec<Sender<Arc<VisualSnapshot>>>,
}

impl SnapshotPublisher {
    pub fn subscribe(&mut self) -> Receiver<Arc<VisualSnapshot>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Send to everyone; subscribers whose receiver is gone are dropped.
    pub fn publish(&mut self, snapshot: &Arc<VisualSnapshot>) {
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(snapshot)).is_ok());
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}
