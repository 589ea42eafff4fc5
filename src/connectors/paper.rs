// src/connectors/paper.rs
use crate::connectors::traits::BackgroundClient;
use crate::error::CollaboratorError;
use crate::types::{Balances, LoanRequest, RequestId, SwapRequest, WalletStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// Message kinds of the background contract, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackgroundCall {
    WalletStatus,
    WalletBalance,
    SwapToSign,
    LoanToSign,
    ConfirmSign,
    CancelSign,
}

#[derive(Debug)]
struct PaperState {
    status: WalletStatus,
    balances: Balances,
    swap: Option<SwapRequest>,
    loan: Option<LoanRequest>,
    failures: HashMap<BackgroundCall, CollaboratorError>,
    calls: HashMap<BackgroundCall, usize>,
}

/// In-memory background process. Signing settles the request against the
/// balances instead of producing a transaction.
#[derive(Debug)]
pub struct PaperBackground {
    state: Mutex<PaperState>,
}

impl PaperBackground {
    pub fn new(status: WalletStatus, balances: Balances) -> Self {
        Self {
            state: Mutex::new(PaperState {
                status,
                balances,
                swap: None,
                loan: None,
                failures: HashMap::new(),
                calls: HashMap::new(),
            }),
        }
    }

    /// A poisoned lock is recovered: every mutation leaves the state consistent.
    fn lock(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PaperState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn set_status(&self, status: WalletStatus) {
        self.with_state(|s| s.status = status);
    }

    pub fn set_balances(&self, balances: Balances) {
        self.with_state(|s| s.balances = balances);
    }

    /// Replaces any outstanding swap request.
    pub fn offer_swap(&self, swap: SwapRequest) {
        info!("Paper: swap {} awaiting signature", swap.id);
        self.with_state(|s| s.swap = Some(swap));
    }

    pub fn offer_loan(&self, loan: LoanRequest) {
        info!("Paper: loan {} awaiting signature", loan.id);
        self.with_state(|s| s.loan = Some(loan));
    }

    /// Drops a request as if it expired on the background side.
    pub fn expire(&self, id: &RequestId) {
        self.with_state(|s| {
            if s.swap.as_ref().is_some_and(|r| &r.id == id) {
                s.swap = None;
            }
            if s.loan.as_ref().is_some_and(|r| &r.id == id) {
                s.loan = None;
            }
        });
    }

    /// Every later `call` fails with `err` until [`PaperBackground::heal`].
    pub fn fail(&self, call: BackgroundCall, err: CollaboratorError) {
        self.with_state(|s| {
            s.failures.insert(call, err);
        });
    }

    pub fn heal(&self, call: BackgroundCall) {
        self.with_state(|s| {
            s.failures.remove(&call);
        });
    }

    pub fn calls(&self, call: BackgroundCall) -> usize {
        self.with_state(|s| s.calls.get(&call).copied().unwrap_or(0))
    }

    fn enter(&self, call: BackgroundCall) -> Result<MutexGuard<'_, PaperState>, CollaboratorError> {
        let mut state = self.lock();
        *state.calls.entry(call).or_insert(0) += 1;
        if let Some(err) = state.failures.get(&call) {
            return Err(err.clone());
        }
        Ok(state)
    }
}

fn checked_sum(a: Decimal, b: Decimal) -> Result<Decimal, CollaboratorError> {
    a.checked_add(b)
        .ok_or_else(|| CollaboratorError::Rejected(format!("{} + {} is out of range", a, b)))
}

fn require_loaded(state: &PaperState) -> Result<(), CollaboratorError> {
    if state.status != WalletStatus::Loaded {
        return Err(CollaboratorError::Rejected("wallet is not unlocked".into()));
    }
    Ok(())
}

#[async_trait]
impl BackgroundClient for PaperBackground {
    async fn get_wallet_status(&self) -> Result<WalletStatus, CollaboratorError> {
        Ok(self.enter(BackgroundCall::WalletStatus)?.status)
    }

    async fn get_wallet_balance(&self) -> Result<Balances, CollaboratorError> {
        let state = self.enter(BackgroundCall::WalletBalance)?;
        require_loaded(&state)?;
        Ok(state.balances.clone())
    }

    async fn get_swap_to_sign(&self) -> Result<Option<SwapRequest>, CollaboratorError> {
        Ok(self.enter(BackgroundCall::SwapToSign)?.swap.clone())
    }

    async fn get_loan_to_sign(&self) -> Result<Option<LoanRequest>, CollaboratorError> {
        Ok(self.enter(BackgroundCall::LoanToSign)?.loan.clone())
    }

    async fn confirm_sign(&self, id: &RequestId) -> Result<(), CollaboratorError> {
        let mut state = self.enter(BackgroundCall::ConfirmSign)?;
        require_loaded(&state)?;

        if let Some(swap) = state.swap.clone().filter(|r| &r.id == id) {
            let available = state.balances.get(swap.sell_asset);
            let needed = checked_sum(swap.sell_amount, swap.fee)?;
            if available < needed {
                return Err(CollaboratorError::Rejected(format!(
                    "insufficient {}: have {}, need {}",
                    swap.sell_asset, available, needed
                )));
            }
            let bought = checked_sum(state.balances.get(swap.buy_asset), swap.buy_amount)?;
            state.balances = std::mem::take(&mut state.balances)
                .with(swap.sell_asset, available - needed)
                .with(swap.buy_asset, bought);
            state.swap = None;
            info!("Paper: swap {} signed", id);
            return Ok(());
        }

        if let Some(loan) = state.loan.clone().filter(|r| &r.id == id) {
            let available = state.balances.get(loan.collateral_asset);
            let needed = checked_sum(loan.collateral_amount, loan.fee)?;
            if available < needed {
                return Err(CollaboratorError::Rejected(format!(
                    "insufficient {}: have {}, need {}",
                    loan.collateral_asset, available, needed
                )));
            }
            let principal =
                checked_sum(state.balances.get(loan.principal_asset), loan.principal_amount)?;
            state.balances = std::mem::take(&mut state.balances)
                .with(loan.collateral_asset, available - needed)
                .with(loan.principal_asset, principal);
            state.loan = None;
            info!("Paper: loan {} signed", id);
            return Ok(());
        }

        Err(CollaboratorError::Rejected(format!("no request {} to sign", id)))
    }

    async fn cancel_sign(&self, id: &RequestId) -> Result<(), CollaboratorError> {
        let mut state = self.enter(BackgroundCall::CancelSign)?;
        if state.swap.as_ref().is_some_and(|r| &r.id == id) {
            state.swap = None;
        } else if state.loan.as_ref().is_some_and(|r| &r.id == id) {
            state.loan = None;
        } else {
            return Err(CollaboratorError::Rejected(format!("no request {} to cancel", id)));
        }
        info!("Paper: request {} cancelled", id);
        Ok(())
    }
}
