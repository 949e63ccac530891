//! Caller identity.
//!
//! Identities are resolved by `flongo_middleware` before the authorization
//! gate runs; the core only describes them.

use serde::{Deserialize, Serialize};

/// A user authenticated upstream of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable identifier of the user.
    pub user_id: String,
    /// Roles granted to the user.
    pub roles: Vec<String>,
}

/// The identity of the caller making a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// An authenticated user.
    User(UserIdentity),
    /// No credentials were presented.
    #[default]
    Anonymous,
}

impl CallerIdentity {
    /// Creates a user identity.
    pub fn user<I, R>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::User(UserIdentity {
            user_id: user_id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        })
    }

    /// Creates an anonymous identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Returns `true` if no credentials were presented.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::User(u) => format!("user:{}", u.user_id),
            Self::Anonymous => "anonymous".to_string(),
        }
    }

    /// Returns the roles held by this caller.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        match self {
            Self::User(u) => &u.roles,
            Self::Anonymous => &[],
        }
    }

    /// Returns `true` if the caller holds at least one of `required`.
    ///
    /// An empty `required` list always passes.
    #[must_use]
    pub fn has_any_role(&self, required: &[String]) -> bool {
        required.is_empty() || required.iter().any(|r| self.roles().contains(r))
    }
}
