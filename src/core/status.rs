// src/core/status.rs
use crate::types::WalletStatus;
use tracing::info;

/// Cache of the wallet status last asserted by the wallet manager.
/// `None` until the first successful read.
#[derive(Debug, Default, Clone)]
pub struct WalletStatusTracker {
    status: Option<WalletStatus>,
}

impl WalletStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<WalletStatus> {
        self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.status == Some(WalletStatus::Loaded)
    }

    /// Records a fresh observation. Returns true when it differs from the cache.
    pub fn observe(&mut self, status: WalletStatus) -> bool {
        if self.status == Some(status) {
            return false;
        }
        info!("Wallet status: {:?} -> {:?}", self.status, status);
        self.status = Some(status);
        true
    }
}
