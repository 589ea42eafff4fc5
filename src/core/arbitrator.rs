// src/core/arbitrator.rs
use crate::connectors::traits::BackgroundClient;
use crate::error::{CoreError, CoreResult};
use crate::types::{LoanRequest, RequestId, RequestKind, SigningRequest, SwapRequest};
use tracing::{error, info, warn};

/// The single request the UI is allowed to act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PendingSlot {
    #[default]
    Idle,
    SwapPending(SwapRequest),
    LoanPending(LoanRequest),
}

impl PendingSlot {
    pub fn kind(&self) -> Option<RequestKind> {
        match self {
            PendingSlot::Idle => None,
            PendingSlot::SwapPending(_) => Some(RequestKind::Swap),
            PendingSlot::LoanPending(_) => Some(RequestKind::Loan),
        }
    }

    pub fn active(&self) -> Option<SigningRequest> {
        match self {
            PendingSlot::Idle => None,
            PendingSlot::SwapPending(swap) => Some(SigningRequest::Swap(swap.clone())),
            PendingSlot::LoanPending(loan) => Some(SigningRequest::Loan(loan.clone())),
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            PendingSlot::Idle => None,
            PendingSlot::SwapPending(swap) => Some(&swap.id),
            PendingSlot::LoanPending(loan) => Some(&loan.id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PendingSlot::Idle)
    }
}

/// Swap beats loan: a loan is only surfaced while no swap is outstanding.
/// The withheld loan is left untouched at the background.
pub fn poll(swap: Option<SwapRequest>, loan: Option<LoanRequest>) -> PendingSlot {
    match (swap, loan) {
        (Some(swap), _) => PendingSlot::SwapPending(swap),
        (None, Some(loan)) => PendingSlot::LoanPending(loan),
        (None, None) => PendingSlot::Idle,
    }
}

/// Returned when a confirm or cancel resolved the slot; the caller must refresh.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequired;

#[derive(Debug, Clone, Copy)]
enum Resolution {
    Confirm,
    Cancel,
}

#[derive(Debug, Default)]
pub struct SigningArbitrator {
    slot: PendingSlot,
}

impl SigningArbitrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> &PendingSlot {
        &self.slot
    }

    /// Replaces the slot with the arbitration of the latest candidates.
    /// Returns true when the surfaced request changed.
    pub fn apply_poll(&mut self, swap: Option<SwapRequest>, loan: Option<LoanRequest>) -> bool {
        let next = poll(swap, loan);
        if next == self.slot {
            return false;
        }
        match &next {
            PendingSlot::Idle => info!("Signing slot cleared"),
            PendingSlot::SwapPending(swap) => info!("Swap {} surfaced for signing", swap.id),
            PendingSlot::LoanPending(loan) => info!("Loan {} surfaced for signing", loan.id),
        }
        self.slot = next;
        true
    }

    pub async fn confirm(
        &mut self,
        id: &RequestId,
        client: &dyn BackgroundClient,
    ) -> CoreResult<RefreshRequired> {
        self.resolve(id, client, Resolution::Confirm).await
    }

    pub async fn cancel(
        &mut self,
        id: &RequestId,
        client: &dyn BackgroundClient,
    ) -> CoreResult<RefreshRequired> {
        self.resolve(id, client, Resolution::Cancel).await
    }

    async fn resolve(
        &mut self,
        id: &RequestId,
        client: &dyn BackgroundClient,
        resolution: Resolution,
    ) -> CoreResult<RefreshRequired> {
        if self.slot.id() != Some(id) {
            let current = self.slot.id().cloned();
            info!(
                "{:?} of {} ignored: slot holds {:?}",
                resolution, id, current
            );
            return Err(CoreError::StaleRequest {
                requested: id.clone(),
                current,
            });
        }

        let result = match resolution {
            Resolution::Confirm => client.confirm_sign(id).await,
            Resolution::Cancel => client.cancel_sign(id).await,
        };

        match result {
            Ok(()) => {
                info!("{:?} of {} accepted by background", resolution, id);
                self.slot = PendingSlot::Idle;
                Ok(RefreshRequired)
            }
            Err(e) => {
                let err = CoreError::from(e);
                if err.is_retryable() {
                    warn!("{:?} of {} failed, request kept: {}", resolution, id, err);
                } else {
                    error!("{:?} of {} rejected, request kept: {}", resolution, id, err);
                }
                Err(err)
            }
        }
    }
}
