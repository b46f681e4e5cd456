//! Customer identity
//!
//! The identity provider hands the core an opaque, already verified string.
//! Ownership checks compare identities only; the role is a separate
//! capability lookup used for admin routes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque customer identity (the member's login, e.g. an email address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerIdentity(String);

impl CustomerIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CustomerIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Capability attached to an identity by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}
