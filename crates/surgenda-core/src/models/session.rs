//! Session state and role handling.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session expired: no valid token")]
    Expired,

    #[error("Token rejected by the remote store")]
    Rejected,

    #[error("Permission denied: manager role required")]
    NotManager,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Opaque session token supplied by the operator.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Role attached to a verified token (wire `GESTOR` / `USER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Manager,
    User,
}

impl Role {
    /// Parse a wire role string; unknown roles read as plain users.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "GESTOR" => Self::Manager,
            _ => Self::User,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Manager => "GESTOR",
            Self::User => "USER",
        }
    }
}

/// Identity the remote store vouched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Display name
    pub name: String,
    pub role: Role,
}

/// Client-side session: the operator's token plus the verified identity.
///
/// The cache layers never read this directly; operations that need the remote
/// store call [`Session::token`] and short-circuit locally when it is absent.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<SessionToken>,
    user: Option<AuthUser>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token the remote store has verified.
    pub fn establish(&mut self, token: SessionToken, user: AuthUser) {
        self.token = Some(token);
        self.user = Some(user);
    }

    /// Current token, or the "session expired" signal.
    pub fn token(&self) -> SessionResult<&SessionToken> {
        self.token.as_ref().ok_or(SessionError::Expired)
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn is_manager(&self) -> bool {
        matches!(
            self.user,
            Some(AuthUser {
                role: Role::Manager,
                ..
            })
        )
    }

    /// Require the manager role for a destructive action.
    pub fn require_manager(&self) -> SessionResult<&SessionToken> {
        if !self.is_manager() {
            return Err(SessionError::NotManager);
        }
        self.token()
    }

    /// Drop the token and identity (logout or strict re-prompt policy).
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }
}
