//! Nullable infrastructure for deterministic testing.
//!
//! The wallet reaches the outside world through the `NetworkClient` and
//! `FeeQuoteService` traits. This crate provides test-friendly implementations that:
//! - Serve a wallet state set programmatically
//! - Record broadcasts instead of sending them
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod network;
pub mod quotes;

pub use network::NullNetwork;
pub use quotes::NullQuoteService;
