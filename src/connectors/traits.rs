// src/connectors/traits.rs
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::CollaboratorError;
use crate::types::{Balances, LoanRequest, RateTick, RequestId, SwapRequest, WalletStatus};

/// Message contract with the background process that holds the keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackgroundClient: Send + Sync {
    async fn get_wallet_status(&self) -> Result<WalletStatus, CollaboratorError>;

    async fn get_wallet_balance(&self) -> Result<Balances, CollaboratorError>;

    async fn get_swap_to_sign(&self) -> Result<Option<SwapRequest>, CollaboratorError>;

    async fn get_loan_to_sign(&self) -> Result<Option<LoanRequest>, CollaboratorError>;

    async fn confirm_sign(&self, id: &RequestId) -> Result<(), CollaboratorError>;

    async fn cancel_sign(&self, id: &RequestId) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A live rate subscription. Ticks stop once the handle is given back.
pub struct RateSubscription {
    pub handle: SubscriptionHandle,
    pub ticks: mpsc::Receiver<RateTick>,
}

pub trait RateFeed: Send {
    fn subscribe(&mut self) -> Result<RateSubscription>;

    /// Consumes the handle; a released subscription cannot be resumed.
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}
