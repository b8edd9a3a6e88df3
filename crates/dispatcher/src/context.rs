//! BatchContext - batch-wide cancellation

use std::sync::Arc;

use tokio::sync::watch;

/// Shared cancellation flag of one batch
///
/// Cancelling stops workers from claiming pending units; units already
/// running finish normally.
#[derive(Debug, Clone)]
pub struct BatchContext {
    cancel: Arc<watch::Sender<bool>>,
}

impl BatchContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            cancel: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

impl Default for BatchContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let ctx = BatchContext::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());
        ctx.cancel();
        assert!(clone.is_cancelled());
    }
}
