// src/connectors/rate_feed.rs
use crate::connectors::messages::RateMessage;
use crate::connectors::traits::{RateFeed, RateSubscription, SubscriptionHandle};
use crate::types::RateTick;
use anyhow::{bail, Result};
use chrono::Utc;
use futures_util::StreamExt;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};
use url::Url;

const TICK_BUFFER: usize = 100;

/// Background tasks backing each live subscription.
#[derive(Default)]
struct Subscriptions(HashMap<SubscriptionHandle, JoinHandle<()>>);

impl Subscriptions {
    fn insert(&mut self, handle: SubscriptionHandle, task: JoinHandle<()>) {
        self.0.insert(handle, task);
    }

    fn release(&mut self, handle: SubscriptionHandle) {
        match self.0.remove(&handle) {
            Some(task) => {
                task.abort();
                info!("Rate subscription {:?} released", handle);
            }
            None => debug!("Unsubscribe for unknown handle {:?} ignored", handle),
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for (_, task) in self.0.drain() {
            task.abort();
        }
    }
}

/// Pushes the same rate on a fixed interval, like the fake rate service.
pub struct FixedRateFeed {
    rate: Decimal,
    interval: Duration,
    subscriptions: Subscriptions,
}

impl FixedRateFeed {
    pub fn new(rate: Decimal, interval: Duration) -> Self {
        Self {
            rate,
            interval,
            subscriptions: Subscriptions::default(),
        }
    }
}

impl RateFeed for FixedRateFeed {
    fn subscribe(&mut self) -> Result<RateSubscription> {
        if self.rate <= Decimal::ZERO {
            bail!("fixed rate must be positive, got {}", self.rate);
        }
        let (sender, ticks) = mpsc::channel(TICK_BUFFER);
        let handle = SubscriptionHandle::new();
        let rate = self.rate;
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let tick = RateTick {
                    rate,
                    timestamp: Utc::now().timestamp_millis() as u64,
                };
                if sender.send(tick).await.is_err() {
                    break;
                }
            }
        });
        self.subscriptions.insert(handle, task);
        info!("Fixed rate feed subscribed at {}", rate);

        Ok(RateSubscription { handle, ticks })
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.subscriptions.release(handle);
    }
}

/// Reads `RateMessage` frames from a WebSocket endpoint.
pub struct WsRateFeed {
    url: Url,
    subscriptions: Subscriptions,
}

impl WsRateFeed {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            subscriptions: Subscriptions::default(),
        })
    }
}

impl RateFeed for WsRateFeed {
    fn subscribe(&mut self) -> Result<RateSubscription> {
        let (sender, ticks) = mpsc::channel(TICK_BUFFER);
        let handle = SubscriptionHandle::new();
        let url = self.url.clone();

        info!("Starting WebSocket rate task for: {}", url);

        let task = tokio::spawn(async move {
            match connect_async(url.as_str()).await {
                Ok((ws_stream, _)) => {
                    let (_, mut read) = ws_stream.split();
                    info!("WebSocket connected to {}", url);

                    while let Some(message) = read.next().await {
                        let msg = match message {
                            Ok(msg) => msg,
                            Err(e) => {
                                error!("WebSocket error for {}: {}", url, e);
                                continue;
                            }
                        };
                        let Ok(text) = msg.to_text() else {
                            continue;
                        };
                        let Some(tick) = parse_tick(text) else {
                            continue;
                        };
                        if sender.send(tick).await.is_err() {
                            break;
                        }
                    }
                }
                Err(e) => error!("Failed to connect WebSocket {}: {}", url, e),
            }
            info!("WebSocket rate task finished for {}", url);
        });
        self.subscriptions.insert(handle, task);

        Ok(RateSubscription { handle, ticks })
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.subscriptions.release(handle);
    }
}

/// Frames that are not rate messages, or carry a non-positive rate, are dropped.
fn parse_tick(text: &str) -> Option<RateTick> {
    let msg = match serde_json::from_str::<RateMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("Ignoring frame {:?}: {}", text, e);
            return None;
        }
    };
    if msg.rate <= Decimal::ZERO {
        warn!("Ignoring non-positive rate {}", msg.rate);
        return None;
    }
    Some(RateTick {
        rate: msg.rate,
        timestamp: msg
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis() as u64),
    })
}
