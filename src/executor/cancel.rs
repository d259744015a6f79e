//! External cancellation signal for a run

use tokio::sync::watch;

/// Owning side of the cancellation signal
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

/// Observing side, cheap to clone
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationHandle {
    pub fn new() -> (Self, CancellationSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancellationSignal { receiver })
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal { receiver: self.sender.subscribe() }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl CancellationSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (handle, signal) = CancellationHandle::new();
        // Dropping the sender leaves the value at `false` forever.
        drop(handle);
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
