//! Caller identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identity of the caller, passed by value on every operation.
///
/// The authentication layer (external) resolves sessions to this; the core
/// never consults process-wide current-user state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IdentityContext {
    /// Acting user
    pub user_id: UserId,
    /// Administrative privilege flag
    pub is_admin: bool,
}

impl IdentityContext {
    /// A regular user.
    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    /// An administrator.
    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }
}
