//! Form response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::de::null_as_default;

/// Location recorded for responses that arrive over the realtime channel,
/// which does not carry geo information.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Payload of a `new_response` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResponseData {
    /// Response identifier.
    pub id: String,
    /// Form the response was submitted to.
    pub form_id: String,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Field id to submitted value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: HashMap<String, Value>,
    /// Device class reported by the submitting browser ("desktop", "mobile", ...).
    #[serde(default)]
    pub device: String,
}

/// Compact response entry shown in the dashboard's recent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    /// Response identifier.
    pub id: String,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Device class.
    #[serde(default)]
    pub device: String,
    /// Coarse location.
    #[serde(default)]
    pub location: String,
    /// Field id to submitted value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub response_data: HashMap<String, Value>,
}

impl From<&NewResponseData> for ResponseSummary {
    fn from(response: &NewResponseData) -> Self {
        Self {
            id: response.id.clone(),
            submitted_at: response.submitted_at,
            device: response.device.clone(),
            location: UNKNOWN_LOCATION.to_string(),
            response_data: response.data.clone(),
        }
    }
}
