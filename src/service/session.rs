// service/session.rs
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks which users the front-end is currently awaiting wallet input
/// from. `begin` hands back a guard; dropping it clears the flag on every
/// exit path, so an early return or error can never leave a user stuck in
/// the waiting state.
#[derive(Debug, Clone, Default)]
pub struct PendingWalletInputs {
    inner: Arc<Mutex<HashSet<i64>>>,
}

impl PendingWalletInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, user_id: i64) -> PendingWalletGuard {
        self.inner
            .lock()
            .expect("pending input set poisoned")
            .insert(user_id);
        PendingWalletGuard {
            inner: Arc::clone(&self.inner),
            user_id,
        }
    }

    pub fn is_pending(&self, user_id: i64) -> bool {
        self.inner
            .lock()
            .expect("pending input set poisoned")
            .contains(&user_id)
    }
}

#[derive(Debug)]
pub struct PendingWalletGuard {
    inner: Arc<Mutex<HashSet<i64>>>,
    user_id: i64,
}

impl Drop for PendingWalletGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.inner.lock() {
            set.remove(&self.user_id);
        }
    }
}
