// src/core/session.rs
use crate::connectors::traits::{BackgroundClient, RateFeed};
use crate::core::arbitrator::{PendingSlot, RefreshRequired, SigningArbitrator};
use crate::core::refresh::{RefreshCoordinator, RefreshReport};
use crate::core::status::WalletStatusTracker;
use crate::error::{CoreError, CoreResult};
use crate::quote::{Quote, QuoteEvent, QuoteMachine};
use crate::types::{AssetType, BalanceView, RequestId, SigningRequest, WalletStatus};
use anyhow::Result;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Notifications for whatever renders the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    QuoteUpdated(Quote),
    StatusChanged(WalletStatus),
    SlotChanged(Option<SigningRequest>),
    Log(String),
}

/// User intents delivered to a running session. Outcomes come back as
/// [`SessionEvent`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SetAlphaAmount(Decimal),
    SetAlphaAsset(AssetType),
    SetBetaAsset(AssetType),
    SwapSides,
    Confirm(RequestId),
    Cancel(RequestId),
    Refresh,
    PublishTransaction(String),
}

/// UI-facing surface: owns the quote, the status cache and the signing slot,
/// and routes every mutation through them.
pub struct WalletSession {
    defaults: Quote,
    quote: QuoteMachine,
    tracker: WalletStatusTracker,
    arbitrator: SigningArbitrator,
    coordinator: RefreshCoordinator,
    client: Arc<dyn BackgroundClient>,
    ui_sender: Option<mpsc::Sender<SessionEvent>>,
    last_transaction: Option<String>,
}

impl WalletSession {
    pub fn new(defaults: Quote, client: Arc<dyn BackgroundClient>) -> Self {
        Self {
            defaults,
            quote: QuoteMachine::new(defaults),
            tracker: WalletStatusTracker::new(),
            arbitrator: SigningArbitrator::new(),
            coordinator: RefreshCoordinator::new(),
            client,
            ui_sender: None,
            last_transaction: None,
        }
    }

    pub fn with_events(mut self, sender: mpsc::Sender<SessionEvent>) -> Self {
        self.ui_sender = Some(sender);
        self
    }

    pub fn quote(&self) -> &Quote {
        self.quote.quote()
    }

    pub fn wallet_status(&self) -> Option<WalletStatus> {
        self.tracker.status()
    }

    pub fn pending(&self) -> &PendingSlot {
        self.arbitrator.slot()
    }

    pub fn balances(&self) -> &BalanceView {
        self.coordinator.balances()
    }

    pub fn last_transaction(&self) -> Option<&str> {
        self.last_transaction.as_deref()
    }

    /// The surfaced request, but only while the wallet is unlocked.
    pub fn actionable_request(&self) -> Option<SigningRequest> {
        if !self.tracker.is_loaded() {
            return None;
        }
        self.arbitrator.slot().active()
    }

    fn send_ui_event(&self, event: SessionEvent) {
        let Some(sender) = &self.ui_sender else {
            return;
        };
        match sender.try_send(event) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("UI channel closed! Interface is likely gone.");
            }
        }
    }

    fn apply_quote(&mut self, event: QuoteEvent) -> CoreResult<Quote> {
        let quote = *self.quote.apply(event)?;
        self.send_ui_event(SessionEvent::QuoteUpdated(quote));
        Ok(quote)
    }

    pub fn set_alpha_amount(&mut self, value: Decimal) -> CoreResult<Quote> {
        self.apply_quote(QuoteEvent::AlphaAmount(value))
    }

    pub fn set_alpha_asset(&mut self, asset: AssetType) -> CoreResult<Quote> {
        self.apply_quote(QuoteEvent::AlphaAsset(asset))
    }

    pub fn set_beta_asset(&mut self, asset: AssetType) -> CoreResult<Quote> {
        self.apply_quote(QuoteEvent::BetaAsset(asset))
    }

    pub fn swap_sides(&mut self) -> CoreResult<Quote> {
        self.apply_quote(QuoteEvent::SwapSides)
    }

    pub fn on_rate(&mut self, rate: Decimal) -> CoreResult<Quote> {
        self.apply_quote(QuoteEvent::RateChange(rate))
    }

    /// Ends the swap session: the quote goes back to the defaults.
    pub fn publish_transaction(&mut self, tx_id: impl Into<String>) {
        let tx_id = tx_id.into();
        info!("Transaction {} published, quote reset", tx_id);
        self.quote.reset(self.defaults);
        self.last_transaction = Some(tx_id);
        self.send_ui_event(SessionEvent::QuoteUpdated(self.defaults));
    }

    pub async fn refresh_all(&mut self) -> RefreshReport {
        let report = self
            .coordinator
            .refresh(self.client.as_ref(), &mut self.tracker, &mut self.arbitrator)
            .await;

        if report.status_changed {
            if let Some(status) = self.tracker.status() {
                self.send_ui_event(SessionEvent::StatusChanged(status));
            }
        }
        if report.slot_changed {
            self.send_ui_event(SessionEvent::SlotChanged(self.arbitrator.slot().active()));
        }
        for (kind, err) in &report.failures {
            self.send_ui_event(SessionEvent::Log(format!("{:?} unavailable: {}", kind, err)));
        }
        report
    }

    /// Signs the surfaced request and refreshes once on success.
    pub async fn confirm(&mut self, id: &RequestId) -> CoreResult<RefreshReport> {
        let result = self.arbitrator.confirm(id, self.client.as_ref()).await;
        self.after_resolution(result).await
    }

    pub async fn cancel(&mut self, id: &RequestId) -> CoreResult<RefreshReport> {
        let result = self.arbitrator.cancel(id, self.client.as_ref()).await;
        self.after_resolution(result).await
    }

    async fn after_resolution(
        &mut self,
        result: CoreResult<RefreshRequired>,
    ) -> CoreResult<RefreshReport> {
        match result {
            Ok(_) => {
                self.send_ui_event(SessionEvent::SlotChanged(None));
                Ok(self.refresh_all().await)
            }
            Err(e) => {
                self.send_ui_event(SessionEvent::Log(e.to_string()));
                Err(e)
            }
        }
    }

    /// Applies one command; quote rejections are also reported as a `Log` event.
    pub async fn execute(&mut self, command: SessionCommand) -> CoreResult<()> {
        let result = match command {
            SessionCommand::SetAlphaAmount(value) => self.set_alpha_amount(value).map(drop),
            SessionCommand::SetAlphaAsset(asset) => self.set_alpha_asset(asset).map(drop),
            SessionCommand::SetBetaAsset(asset) => self.set_beta_asset(asset).map(drop),
            SessionCommand::SwapSides => self.swap_sides().map(drop),
            SessionCommand::Confirm(id) => return self.confirm(&id).await.map(drop),
            SessionCommand::Cancel(id) => return self.cancel(&id).await.map(drop),
            SessionCommand::Refresh => {
                self.refresh_all().await;
                Ok(())
            }
            SessionCommand::PublishTransaction(tx_id) => {
                self.publish_transaction(tx_id);
                Ok(())
            }
        };
        if let Err(e @ CoreError::InvalidInput(_)) = &result {
            self.send_ui_event(SessionEvent::Log(e.to_string()));
        }
        result
    }

    /// Feeds rate pushes and user commands into the session until `shutdown`
    /// resolves, then releases the subscription. A closed command channel
    /// leaves the rate feed running.
    pub async fn run<F>(
        &mut self,
        feed: &mut dyn RateFeed,
        mut commands: mpsc::Receiver<SessionCommand>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Session starting...");
        let report = self.refresh_all().await;
        if !report.is_complete() {
            warn!("Initial refresh incomplete: {} read(s) failed", report.failures.len());
        }

        let mut subscription = feed.subscribe()?;
        tokio::pin!(shutdown);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                tick = subscription.ticks.recv() => {
                    let Some(tick) = tick else {
                        warn!("Rate feed ended");
                        break;
                    };
                    if let Err(e) = self.on_rate(tick.rate) {
                        warn!("Rate push ignored: {}", e);
                    }
                }
                command = commands.recv(), if commands_open => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        commands_open = false;
                        continue;
                    };
                    debug!(?command, "command received");
                    if let Err(e) = self.execute(command).await {
                        warn!("Command failed: {}", e);
                    }
                }
            }
        }

        feed.unsubscribe(subscription.handle);
        info!("Session stopped");
        Ok(())
    }
}
