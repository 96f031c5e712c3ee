//! External cancellation of pipeline runs.

use tokio::sync::watch;

/// Held by whoever may stop a run.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Stop starting new steps and retries. In-flight calls still finish.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observed by a run before each step and each retry.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_reaches_every_signal() {
        let (handle, signal) = cancel_pair();
        let other = handle.signal();
        assert!(!signal.is_cancelled());

        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(other.is_cancelled());
    }

    #[test]
    fn never_stays_clear() {
        assert!(!CancelSignal::never().is_cancelled());
    }
}
