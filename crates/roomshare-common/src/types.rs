//! Identity types for the roomshare client.

use serde::{Deserialize, Serialize};

/// Unique identifier for an authenticated user.
///
/// Issued by the authentication service; the client treats it as opaque and
/// only uses it to key storage paths and record paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
