//! The JSON response envelope of spec §6: every Orchestrator operation that
//! crosses the HTTP or CLI boundary reports through one of these, success or
//! failure alike, instead of a bare `Result`.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApiStatus {
    Success,
    Failure,
}

impl Serialize for ApiStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            ApiStatus::Success => "api:success",
            ApiStatus::Failure => "api:failure",
        })
    }
}

/// `{ "api:status", "api:message", "api:error_term"?, <op-specific keys> }`.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    #[serde(rename = "api:status")]
    pub status: ApiStatus,
    #[serde(rename = "api:message")]
    pub message: String,
    #[serde(rename = "api:error_term", skip_serializing_if = "Option::is_none")]
    pub error_term: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Success,
            message: message.into(),
            error_term: None,
            fields: Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>, error_term: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Failure,
            message: message.into(),
            error_term: Some(error_term.into()),
            fields: Map::new(),
        }
    }

    /// Attach an op-specific key, e.g. `head_has_updated`, `applied_commits`.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ApiStatus::Success
    }
}
