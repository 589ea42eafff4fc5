// src/main.rs
use dotenvy::dotenv;
use std::sync::Arc;
use swap_wallet_core::config::AppConfig;
use swap_wallet_core::connectors::paper::PaperBackground;
use swap_wallet_core::connectors::rate_feed::{FixedRateFeed, WsRateFeed};
use swap_wallet_core::connectors::traits::RateFeed;
use swap_wallet_core::utils::logging;
use swap_wallet_core::{SessionCommand, SessionEvent, WalletSession};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new()?;
    let _log_guard = logging::init(config.log_dir.as_deref())?;

    let defaults = config.quote.to_quote()?;
    info!("========================================");
    info!("       SWAP WALLET - paper background");
    info!("========================================");
    info!("Quote: {}", defaults);

    // 2. Initialize Components
    let background = Arc::new(PaperBackground::new(
        config.paper.status,
        config.paper.balances(),
    ));
    let seeded = config.paper.initial_swap(&defaults);
    if let Some(swap) = &seeded {
        background.offer_swap(swap.clone());
    }
    let mut feed: Box<dyn RateFeed> = match &config.rate_feed.url {
        Some(url) => Box::new(WsRateFeed::new(url)?),
        None => Box::new(FixedRateFeed::new(
            config.rate_feed.fixed_rate,
            config.rate_feed.interval(),
        )),
    };

    // 3. Create Channels
    let (ui_tx, mut ui_rx) = mpsc::channel(100);
    tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            match event {
                SessionEvent::QuoteUpdated(quote) => info!(
                    "Quote: {} {} -> {} {} ({})",
                    quote.alpha.amount, quote.alpha.asset, quote.beta.amount, quote.beta.asset, quote
                ),
                SessionEvent::StatusChanged(status) => {
                    info!("Wallet {:?}: show {:?}", status, status.flow())
                }
                SessionEvent::SlotChanged(request) => info!("Awaiting signature: {:?}", request),
                SessionEvent::Log(msg) => info!("{}", msg),
            }
        }
    });

    // Demo user: signs the seeded swap once the first rate push has landed.
    let (command_tx, command_rx) = mpsc::channel(16);
    if let Some(swap) = seeded {
        let delay = config.rate_feed.interval();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("Demo: confirming {}", swap.id);
            if command_tx.send(SessionCommand::Confirm(swap.id)).await.is_err() {
                error!("Session no longer accepts commands");
            }
        });
    }

    // 4. Run Session
    let mut session = WalletSession::new(defaults, background).with_events(ui_tx);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = session.run(feed.as_mut(), command_rx, shutdown).await {
        error!("Fatal session error: {}", e);
    }

    Ok(())
}
