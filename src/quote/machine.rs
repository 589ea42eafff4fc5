// src/quote/machine.rs
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::types::AssetType;

/// One leg of a two-sided quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetState {
    pub asset: AssetType,
    pub amount: Decimal,
}

impl AssetState {
    pub fn new(asset: AssetType, amount: Decimal) -> Self {
        Self { asset, amount }
    }
}

/// `rate` is Beta per unit of Alpha as of the last recompute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub alpha: AssetState,
    pub beta: AssetState,
    pub rate: Decimal,
}

impl Quote {
    pub fn new(alpha: AssetState, beta: AssetState, rate: Decimal) -> CoreResult<Self> {
        if alpha.asset == beta.asset {
            return Err(CoreError::InvalidInput(format!(
                "both sides hold {}",
                alpha.asset
            )));
        }
        check_amount(alpha.amount)?;
        check_amount(beta.amount)?;
        check_rate(rate)?;
        Ok(Self { alpha, beta, rate })
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1 {} = {} {}", self.alpha.asset, self.rate, self.beta.asset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuoteEvent {
    AlphaAmount(Decimal),
    AlphaAsset(AssetType),
    BetaAsset(AssetType),
    SwapSides,
    RateChange(Decimal),
}

/// Pure transition. Invalid events are rejected and the caller keeps the old quote.
pub fn reduce(quote: &Quote, event: QuoteEvent) -> CoreResult<Quote> {
    let mut next = *quote;
    match event {
        QuoteEvent::AlphaAmount(value) => {
            check_amount(value)?;
            next.alpha.amount = value;
            next.beta.amount = derive_beta(value, quote.rate)?;
        }
        QuoteEvent::AlphaAsset(asset) => {
            if quote.beta.asset == asset {
                next.beta.asset = quote.alpha.asset;
            }
            next.alpha.asset = asset;
        }
        QuoteEvent::BetaAsset(asset) => {
            if quote.alpha.asset == asset {
                next.alpha.asset = quote.beta.asset;
            }
            next.beta.asset = asset;
        }
        QuoteEvent::SwapSides => {
            next.alpha = quote.beta;
            next.beta = quote.alpha;
        }
        QuoteEvent::RateChange(rate) => {
            check_rate(rate)?;
            // Alpha stays authoritative: a Beta edit is overwritten here.
            next.rate = rate;
            next.beta.amount = derive_beta(quote.alpha.amount, rate)?;
        }
    }
    Ok(next)
}

fn derive_beta(alpha: Decimal, rate: Decimal) -> CoreResult<Decimal> {
    alpha.checked_mul(rate).ok_or_else(|| {
        CoreError::InvalidInput(format!("{} at rate {} is out of range", alpha, rate))
    })
}

fn check_amount(value: Decimal) -> CoreResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CoreError::InvalidInput(format!(
            "amount must be non-negative, got {}",
            value
        )));
    }
    Ok(())
}

fn check_rate(rate: Decimal) -> CoreResult<()> {
    if rate <= Decimal::ZERO {
        return Err(CoreError::InvalidInput(format!(
            "rate must be positive, got {}",
            rate
        )));
    }
    Ok(())
}

/// Converts a UI float into an amount, rejecting NaN, infinities and negatives.
pub fn amount_from_f64(value: f64) -> CoreResult<Decimal> {
    if !value.is_finite() {
        return Err(CoreError::InvalidInput(format!("amount is not finite: {}", value)));
    }
    let amount = Decimal::from_f64(value)
        .ok_or_else(|| CoreError::InvalidInput(format!("amount out of range: {}", value)))?;
    check_amount(amount)?;
    Ok(amount)
}

/// Parses the text of an amount field.
pub fn parse_amount(input: &str) -> CoreResult<Decimal> {
    let amount = Decimal::from_str(input.trim())
        .map_err(|e| CoreError::InvalidInput(format!("'{}' is not an amount: {}", input, e)))?;
    check_amount(amount)?;
    Ok(amount)
}

/// Owns the session quote; every mutation goes through [`reduce`].
#[derive(Debug, Clone)]
pub struct QuoteMachine {
    quote: Quote,
}

impl QuoteMachine {
    pub fn new(quote: Quote) -> Self {
        Self { quote }
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn apply(&mut self, event: QuoteEvent) -> CoreResult<&Quote> {
        match reduce(&self.quote, event) {
            Ok(next) => {
                debug!(?event, quote = %next, "quote updated");
                self.quote = next;
                Ok(&self.quote)
            }
            Err(e) => {
                warn!(?event, "quote event rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Discards the current quote, e.g. once its transaction is published.
    pub fn reset(&mut self, quote: Quote) {
        self.quote = quote;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Quote {
        Quote::new(
            AssetState::new(AssetType::Btc, Decimal::new(1, 2)),
            AssetState::new(AssetType::Usdt, Decimal::new(19134, 2)),
            Decimal::new(1913374, 2),
        )
        .unwrap()
    }

    #[test]
    fn alpha_amount_recomputes_beta() {
        let next = reduce(&sample(), QuoteEvent::AlphaAmount(Decimal::new(42, 2))).unwrap();
        assert_eq!(next.alpha.amount, Decimal::new(42, 2));
        assert_eq!(next.beta.amount, Decimal::from_str("8036.1708").unwrap());
        assert_eq!(next.rate, Decimal::new(1913374, 2));
    }

    #[test]
    fn beta_is_alpha_times_rate_across_magnitudes() {
        let cases = [
            ("0", "0"),
            ("0.00000001", "0.0001913374"),
            ("1", "19133.74"),
            ("1000000000000000", "19133740000000000000"),
        ];
        for (alpha, beta) in cases {
            let value = Decimal::from_str(alpha).unwrap();
            let next = reduce(&sample(), QuoteEvent::AlphaAmount(value)).unwrap();
            assert_eq!(next.alpha.amount, value, "alpha {}", alpha);
            assert_eq!(next.beta.amount, Decimal::from_str(beta).unwrap(), "alpha {}", alpha);
        }
    }

    #[test]
    fn overflowing_amount_is_rejected_without_change() {
        let mut machine = QuoteMachine::new(sample());
        let huge = amount_from_f64(1e25).unwrap();
        let err = machine.apply(QuoteEvent::AlphaAmount(huge)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert_eq!(machine.quote(), &sample());
    }

    #[test]
    fn overflowing_rate_push_is_rejected_without_change() {
        let mut machine = QuoteMachine::new(sample());
        machine.apply(QuoteEvent::AlphaAmount(Decimal::TEN)).unwrap();
        let before = *machine.quote();

        let err = machine
            .apply(QuoteEvent::RateChange(Decimal::from_scientific("1e28").unwrap()))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert_eq!(machine.quote(), &before);
    }

    #[test]
    fn negative_amount_is_rejected() {
        let mut machine = QuoteMachine::new(sample());
        let err = machine
            .apply(QuoteEvent::AlphaAmount(Decimal::new(-1, 0)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert_eq!(machine.quote(), &sample());
    }

    #[test]
    fn asset_collision_swaps_types_and_keeps_amounts() {
        let quote = sample();
        let next = reduce(&quote, QuoteEvent::AlphaAsset(AssetType::Usdt)).unwrap();
        assert_eq!(next.alpha.asset, AssetType::Usdt);
        assert_eq!(next.beta.asset, AssetType::Btc);
        assert_eq!(next.alpha.amount, quote.alpha.amount);
        assert_eq!(next.beta.amount, quote.beta.amount);

        let next = reduce(&next, QuoteEvent::BetaAsset(AssetType::Usdt)).unwrap();
        assert_eq!(next.alpha.asset, AssetType::Btc);
        assert_eq!(next.beta.asset, AssetType::Usdt);
    }

    #[test]
    fn setting_same_asset_on_both_sides_never_collides() {
        for asset in AssetType::ALL {
            let next = reduce(&sample(), QuoteEvent::AlphaAsset(asset)).unwrap();
            let next = reduce(&next, QuoteEvent::BetaAsset(asset)).unwrap();
            assert_ne!(next.alpha.asset, next.beta.asset);
        }
    }

    #[test]
    fn swap_sides_twice_is_identity() {
        let quote = sample();
        let once = reduce(&quote, QuoteEvent::SwapSides).unwrap();
        assert_eq!(once.alpha, quote.beta);
        assert_eq!(once.beta, quote.alpha);
        assert_eq!(once.rate, quote.rate);
        let twice = reduce(&once, QuoteEvent::SwapSides).unwrap();
        assert_eq!(twice, quote);
    }

    #[test]
    fn rate_change_recomputes_beta_from_alpha() {
        let mut quote = sample();
        // A Beta edit that disagrees with the rate is discarded on the next push.
        quote.beta.amount = Decimal::new(500, 0);
        let next = reduce(&quote, QuoteEvent::RateChange(Decimal::new(20000, 0))).unwrap();
        assert_eq!(next.rate, Decimal::new(20000, 0));
        assert_eq!(next.beta.amount, Decimal::new(200, 0));
        assert_eq!(next.alpha, quote.alpha);
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        assert!(reduce(&sample(), QuoteEvent::RateChange(Decimal::ZERO)).is_err());
    }

    #[test]
    fn float_and_text_inputs_are_validated() {
        assert!(amount_from_f64(f64::NAN).is_err());
        assert!(amount_from_f64(f64::INFINITY).is_err());
        assert!(amount_from_f64(-0.5).is_err());
        assert_eq!(amount_from_f64(0.42).unwrap(), Decimal::new(42, 2));

        assert_eq!(parse_amount(" 0.42 ").unwrap(), Decimal::new(42, 2));
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("-3").is_err());
    }

    #[test]
    fn rate_label() {
        assert_eq!(sample().to_string(), "1 BTC = 19133.74 USDT");
    }

    #[test]
    fn quote_rejects_equal_assets() {
        let side = AssetState::new(AssetType::Btc, Decimal::ONE);
        assert!(Quote::new(side, side, Decimal::ONE).is_err());
    }
}
