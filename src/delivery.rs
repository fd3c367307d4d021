use std::sync::Arc;

use tokio::sync::mpsc;

/// A unit of work scheduled onto the delivery context
pub type DeliveryTask = Box<dyn FnOnce() + Send>;

/// Marshals flush callbacks onto a caller-designated execution context,
/// decoupling observer-side work from the background ingestion path.
///
/// Tasks posted from one engine instance run FIFO and never concurrently
/// with each other.
pub trait DeliveryChannel: Send + Sync {
    fn post(&self, task: DeliveryTask);
}

/// Delivery channel backed by a single tokio task draining an unbounded
/// queue. One drain task per channel keeps execution serialized.
pub struct TokioDelivery {
    tx: mpsc::UnboundedSender<DeliveryTask>,
}

impl TokioDelivery {
    /// Spawn the drain task on the current runtime
    pub fn spawn() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<DeliveryTask>();
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                task();
            }
        });
        Arc::new(Self { tx })
    }
}

impl DeliveryChannel for TokioDelivery {
    fn post(&self, task: DeliveryTask) {
        // The receiver only goes away at runtime shutdown; dropping the
        // task is the right outcome then.
        let _ = self.tx.send(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_posts_run_in_fifo_order() {
        let delivery = TokioDelivery::spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = Arc::clone(&seen);
            delivery.post(Box::new(move || seen.lock().push(i)));
        }

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        delivery.post(Box::new(move || {
            let _ = done_tx.send(());
        }));
        done_rx.await.unwrap();

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }
}
