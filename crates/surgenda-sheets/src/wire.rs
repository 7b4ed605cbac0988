//! Response payloads served by the sheet web app.

use std::collections::HashMap;

use serde::Deserialize;
use surgenda_core::{AuthUser, RawSlotRecord, RemoteError, Role};

/// Read endpoints answer either a row array or an error object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RowsResponse {
    Rows(Vec<RawSlotRecord>),
    Failure { error: String },
}

impl RowsResponse {
    pub fn into_result(self) -> Result<Vec<RawSlotRecord>, RemoteError> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Failure { error } => Err(RemoteError::Rejected(error)),
        }
    }
}

/// Acknowledgment body for a POSTed action.
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
}

impl WriteResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// One entry of the token membership map (`?type=tokens`).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl TokenEntry {
    pub fn to_user(&self) -> AuthUser {
        AuthUser {
            name: self.name.clone().unwrap_or_default(),
            role: Role::parse(&self.role),
        }
    }
}

/// Full token map as served by the backend.
pub type TokenMap = HashMap<String, TokenEntry>;
