//! Nullable infrastructure for deterministic testing.
//!
//! Everything external to the verification core (the clock and the
//! attestation service) is reached through a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod attestor;
pub mod clock;

pub use attestor::NullAttestor;
pub use clock::NullClock;
