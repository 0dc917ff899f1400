//! Fundamental types for vouch.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! user and request identifiers, timestamps and clocks, and the quorum parameters
//! that govern when a verification request is settled.

pub mod error;
pub mod ids;
pub mod params;
pub mod time;

pub use error::IdError;
pub use ids::{CertificateId, RequestId, UserId};
pub use params::{QuorumPolicy, VerificationParams};
pub use time::{Clock, SystemClock, Timestamp};
