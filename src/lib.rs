// src/lib.rs
pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod quote;
pub mod types;
pub mod utils;

pub use crate::core::arbitrator::{poll, PendingSlot, RefreshRequired, SigningArbitrator};
pub use crate::core::refresh::{ReadKind, RefreshCoordinator, RefreshOutcome, RefreshReport};
pub use crate::core::session::{SessionCommand, SessionEvent, WalletSession};
pub use crate::core::status::WalletStatusTracker;
pub use crate::error::{CollaboratorError, CoreError, CoreResult};
