// src/connectors/mod.rs
pub mod messages;
pub mod paper;
pub mod rate_feed;
pub mod traits;
