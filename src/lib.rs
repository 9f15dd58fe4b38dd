//! wellfeed library
//!
//! Quota-aware content acquisition: a TTL cache, a quota breaker, a manual
//! refresh governor and fallback content around a paginated video provider.
//! The binary in `main.rs` is a thin CLI over `orchestrator::Orchestrator`.

pub mod breaker;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod fallback;
pub mod orchestrator;
pub mod refresh;
