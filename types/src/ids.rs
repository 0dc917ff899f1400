//! Identifiers for users, verification requests, and certificates.

use crate::error::IdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A platform user handle. Requesters and validators are both users.
///
/// Handles are trimmed, non-empty, and contain no inner whitespace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Parse and normalise a user handle.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, IdError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdError::BlankUserId);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(IdError::WhitespaceInUserId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of a verification request, rendered as `req-<n>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub const PREFIX: &'static str = "req-";

    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for RequestId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix(Self::PREFIX).unwrap_or(s.trim());
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| IdError::InvalidRequestId(s.to_string()))
    }
}

/// Identifier of an issued certificate, rendered as `cert-<n>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CertificateId(u64);

impl CertificateId {
    pub const PREFIX: &'static str = "cert-";

    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for CertificateId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix(Self::PREFIX).unwrap_or(s.trim());
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| IdError::InvalidCertificateId(s.to_string()))
    }
}
