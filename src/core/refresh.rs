// src/core/refresh.rs
use crate::connectors::traits::BackgroundClient;
use crate::core::arbitrator::SigningArbitrator;
use crate::core::status::WalletStatusTracker;
use crate::error::{CoreError, CoreResult};
use crate::types::{BalanceView, Balances, LoanRequest, SwapRequest, WalletStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    WalletStatus,
    WalletBalance,
    SwapCandidate,
    LoanCandidate,
}

/// Raw results of one refresh cycle, not yet applied.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub cycle: u64,
    pub status: CoreResult<WalletStatus>,
    pub balances: CoreResult<Balances>,
    pub swap: CoreResult<Option<SwapRequest>>,
    pub loan: CoreResult<Option<LoanRequest>>,
}

impl RefreshOutcome {
    fn failures(&self) -> Vec<(ReadKind, CoreError)> {
        [
            (ReadKind::WalletStatus, self.status.as_ref().err()),
            (ReadKind::WalletBalance, self.balances.as_ref().err()),
            (ReadKind::SwapCandidate, self.swap.as_ref().err()),
            (ReadKind::LoanCandidate, self.loan.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(kind, err)| err.map(|e| (kind, e.clone())))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub cycle: u64,
    pub failures: Vec<(ReadKind, CoreError)>,
    pub status_changed: bool,
    pub slot_changed: bool,
    /// False when a failed read kept the previous slot.
    pub slot_arbitrated: bool,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the four background reads of a cycle and applies them in one step.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    next_cycle: AtomicU64,
    last_applied: Option<u64>,
    balances: BalanceView,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balances(&self) -> &BalanceView {
        &self.balances
    }

    /// Issues the reads concurrently. Takes `&self` so cycles may overlap.
    pub async fn fetch(&self, client: &dyn BackgroundClient) -> RefreshOutcome {
        let cycle = self.next_cycle.fetch_add(1, Ordering::Relaxed);
        debug!("Refresh cycle {} started", cycle);

        let (status, balances, swap, loan) = tokio::join!(
            client.get_wallet_status(),
            client.get_wallet_balance(),
            client.get_swap_to_sign(),
            client.get_loan_to_sign(),
        );

        RefreshOutcome {
            cycle,
            status: status.map_err(CoreError::from),
            balances: balances.map_err(CoreError::from),
            swap: swap.map_err(CoreError::from),
            loan: loan.map_err(CoreError::from),
        }
    }

    /// Applies a whole cycle. The slot is only re-arbitrated when every read
    /// succeeded; a failed read means "unknown", never "no request".
    pub fn apply(
        &mut self,
        outcome: RefreshOutcome,
        tracker: &mut WalletStatusTracker,
        arbitrator: &mut SigningArbitrator,
    ) -> RefreshReport {
        let failures = outcome.failures();
        for (kind, err) in &failures {
            warn!("Refresh cycle {}: {:?} read failed: {}", outcome.cycle, kind, err);
        }

        if self.last_applied.is_some_and(|last| last > outcome.cycle) {
            debug!(
                "Cycle {} applied after cycle {:?}; latest application wins",
                outcome.cycle, self.last_applied
            );
        }
        self.last_applied = Some(outcome.cycle);

        let status_changed = match outcome.status {
            Ok(status) => tracker.observe(status),
            Err(_) => false,
        };

        self.balances = match outcome.balances {
            Ok(balances) => BalanceView::Known(balances),
            Err(_) => BalanceView::Unknown,
        };

        let (slot_arbitrated, slot_changed) = match (failures.is_empty(), outcome.swap, outcome.loan) {
            (true, Ok(swap), Ok(loan)) => (true, arbitrator.apply_poll(swap, loan)),
            _ => {
                if let Some(id) = arbitrator.slot().id() {
                    info!("Keeping request {} after incomplete refresh", id);
                }
                (false, false)
            }
        };

        RefreshReport {
            cycle: outcome.cycle,
            failures,
            status_changed,
            slot_changed,
            slot_arbitrated,
        }
    }

    pub async fn refresh(
        &mut self,
        client: &dyn BackgroundClient,
        tracker: &mut WalletStatusTracker,
        arbitrator: &mut SigningArbitrator,
    ) -> RefreshReport {
        let outcome = self.fetch(client).await;
        self.apply(outcome, tracker, arbitrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::traits::MockBackgroundClient;
    use crate::core::arbitrator::PendingSlot;
    use crate::error::CollaboratorError;
    use crate::types::{AssetType, RequestId};
    use rust_decimal::Decimal;

    fn swap(id: &str) -> SwapRequest {
        SwapRequest {
            id: RequestId::new(id),
            sell_asset: AssetType::Usdt,
            sell_amount: Decimal::new(100, 0),
            buy_asset: AssetType::Btc,
            buy_amount: Decimal::new(5, 3),
            fee: Decimal::ZERO,
        }
    }

    fn outcome(cycle: u64, swap: CoreResult<Option<SwapRequest>>) -> RefreshOutcome {
        RefreshOutcome {
            cycle,
            status: Ok(WalletStatus::Loaded),
            balances: Ok(Balances::new().with(AssetType::Btc, Decimal::ONE)),
            swap,
            loan: Ok(None),
        }
    }

    #[test]
    fn failed_balance_read_keeps_slot() {
        let mut coordinator = RefreshCoordinator::new();
        let mut tracker = WalletStatusTracker::new();
        let mut arbitrator = SigningArbitrator::new();
        arbitrator.apply_poll(Some(swap("s1")), None);

        let mut cycle = outcome(0, Ok(None));
        cycle.balances = Err(CoreError::CollaboratorUnavailable("timeout".into()));
        let report = coordinator.apply(cycle, &mut tracker, &mut arbitrator);

        assert_eq!(arbitrator.slot(), &PendingSlot::SwapPending(swap("s1")));
        assert_eq!(coordinator.balances(), &BalanceView::Unknown);
        assert!(!report.slot_arbitrated);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, ReadKind::WalletBalance);
        // The status read still succeeded and is recorded.
        assert_eq!(tracker.status(), Some(WalletStatus::Loaded));
    }

    #[test]
    fn failed_candidate_read_is_unknown_not_absent() {
        let mut coordinator = RefreshCoordinator::new();
        let mut tracker = WalletStatusTracker::new();
        let mut arbitrator = SigningArbitrator::new();
        arbitrator.apply_poll(Some(swap("s1")), None);

        let cycle = outcome(0, Err(CoreError::CollaboratorUnavailable("timeout".into())));
        coordinator.apply(cycle, &mut tracker, &mut arbitrator);
        assert_eq!(arbitrator.slot().id(), Some(&RequestId::new("s1")));
    }

    #[test]
    fn complete_cycle_clears_resolved_request() {
        let mut coordinator = RefreshCoordinator::new();
        let mut tracker = WalletStatusTracker::new();
        let mut arbitrator = SigningArbitrator::new();
        arbitrator.apply_poll(Some(swap("s1")), None);

        let report = coordinator.apply(outcome(0, Ok(None)), &mut tracker, &mut arbitrator);
        assert!(report.is_complete());
        assert!(report.slot_changed);
        assert!(arbitrator.slot().is_idle());
    }

    #[test]
    fn last_applied_cycle_wins() {
        let mut coordinator = RefreshCoordinator::new();
        let mut tracker = WalletStatusTracker::new();
        let mut arbitrator = SigningArbitrator::new();

        coordinator.apply(outcome(1, Ok(Some(swap("s2")))), &mut tracker, &mut arbitrator);
        coordinator.apply(outcome(0, Ok(Some(swap("s1")))), &mut tracker, &mut arbitrator);
        assert_eq!(arbitrator.slot().id(), Some(&RequestId::new("s1")));
    }

    #[tokio::test]
    async fn fetch_issues_each_read_once() {
        let mut client = MockBackgroundClient::new();
        client
            .expect_get_wallet_status()
            .times(1)
            .returning(|| Ok(WalletStatus::NotLoaded));
        client
            .expect_get_wallet_balance()
            .times(1)
            .returning(|| Err(CollaboratorError::Rejected("wallet is not unlocked".into())));
        client.expect_get_swap_to_sign().times(1).returning(|| Ok(None));
        client.expect_get_loan_to_sign().times(1).returning(|| Ok(None));

        let coordinator = RefreshCoordinator::new();
        let first = coordinator.fetch(&client).await;
        assert_eq!(first.cycle, 0);
        assert_eq!(first.status, Ok(WalletStatus::NotLoaded));
        assert!(first.balances.is_err());
    }
}
