// src/core/mod.rs
pub mod arbitrator;
pub mod refresh;
pub mod session;
pub mod status;
