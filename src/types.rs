// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "USDT")]
    Usdt,
}

impl AssetType {
    pub const ALL: [AssetType; 2] = [AssetType::Btc, AssetType::Usdt];

    pub fn symbol(&self) -> &'static str {
        match self {
            AssetType::Btc => "BTC",
            AssetType::Usdt => "USDT",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for AssetType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetType::ALL
            .into_iter()
            .find(|asset| asset.symbol().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown asset symbol '{}'", s)))
    }
}

/// Coarse wallet lifecycle as reported by the wallet manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletStatus {
    /// No wallet on this device.
    None,
    /// A wallet exists but is locked.
    NotLoaded,
    /// Unlocked and usable.
    Loaded,
}

/// Which screen the UI should show for a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletFlow {
    CreateWallet,
    UnlockWallet,
    SwapAndSign,
}

impl WalletStatus {
    pub fn flow(&self) -> WalletFlow {
        match self {
            WalletStatus::None => WalletFlow::CreateWallet,
            WalletStatus::NotLoaded => WalletFlow::UnlockWallet,
            WalletStatus::Loaded => WalletFlow::SwapAndSign,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances(HashMap<AssetType, Decimal>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, asset: AssetType, amount: Decimal) -> Self {
        self.0.insert(asset, amount);
        self
    }

    /// Missing assets read as zero.
    pub fn get(&self, asset: AssetType) -> Decimal {
        self.0.get(&asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetType, &Decimal)> {
        self.0.iter()
    }
}

/// Balances as last observed; a failed read leaves them `Unknown`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BalanceView {
    #[default]
    Unknown,
    Known(Balances),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: RequestId,
    pub sell_asset: AssetType,
    pub sell_amount: Decimal,
    pub buy_asset: AssetType,
    pub buy_amount: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub id: RequestId,
    pub collateral_asset: AssetType,
    pub collateral_amount: Decimal,
    pub principal_asset: AssetType,
    pub principal_amount: Decimal,
    pub principal_repayment: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Swap,
    Loan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SigningRequest {
    Swap(SwapRequest),
    Loan(LoanRequest),
}

impl SigningRequest {
    pub fn id(&self) -> &RequestId {
        match self {
            SigningRequest::Swap(swap) => &swap.id,
            SigningRequest::Loan(loan) => &loan.id,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            SigningRequest::Swap(_) => RequestKind::Swap,
            SigningRequest::Loan(_) => RequestKind::Loan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTick {
    pub rate: Decimal,
    pub timestamp: u64,
}
