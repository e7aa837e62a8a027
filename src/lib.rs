//! Event-sourced key-value store.
//!
//! Every create, update and delete appends an immutable event to a per-key
//! log; the current value of a key is the latest event in its chain.

pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod service;
pub mod utils;
