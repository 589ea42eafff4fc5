// src/quote/mod.rs
pub mod machine;

pub use machine::{amount_from_f64, parse_amount, reduce, AssetState, Quote, QuoteEvent, QuoteMachine};
