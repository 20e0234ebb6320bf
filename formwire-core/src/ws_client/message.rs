//! Wire codec for the analytics hub protocol.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound frames
//! also carry an RFC 3339 `timestamp`, a `formId` for topic-scoped kinds and
//! a `data` payload for `new_response` and `analytics_update`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ParseError, Result};
use crate::types::{AnalyticsData, NewResponseData};

/// Message discriminator, the `type` field of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A form received a submission.
    NewResponse,
    /// A full analytics snapshot for a form.
    AnalyticsUpdate,
    /// Server keep-alive.
    Heartbeat,
    /// Server acknowledged a subscribe.
    Subscribed,
    /// Server acknowledged an unsubscribe.
    Unsubscribed,
    /// Reply to a client `ping`.
    Pong,
    /// Client request to follow a form.
    Subscribe,
    /// Client request to stop following a form.
    Unsubscribe,
    /// Client keep-alive.
    Ping,
}

impl MessageKind {
    /// Every kind, inbound first.
    pub const ALL: [MessageKind; 9] = [
        Self::NewResponse,
        Self::AnalyticsUpdate,
        Self::Heartbeat,
        Self::Subscribed,
        Self::Unsubscribed,
        Self::Pong,
        Self::Subscribe,
        Self::Unsubscribe,
        Self::Ping,
    ];

    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewResponse => "new_response",
            Self::AnalyticsUpdate => "analytics_update",
            Self::Heartbeat => "heartbeat",
            Self::Subscribed => "subscribed",
            Self::Unsubscribed => "unsubscribed",
            Self::Pong => "pong",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Ping => "ping",
        }
    }

    /// `true` for kinds the server sends.
    #[inline]
    pub fn is_inbound(self) -> bool {
        !matches!(self, Self::Subscribe | Self::Unsubscribe | Self::Ping)
    }

    /// `true` for kinds that always name a form.
    #[inline]
    pub fn is_topic_scoped(self) -> bool {
        matches!(
            self,
            Self::NewResponse
                | Self::AnalyticsUpdate
                | Self::Subscribed
                | Self::Unsubscribed
                | Self::Subscribe
                | Self::Unsubscribe
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::invalid_value("type", format!("unknown message type '{s}'")))
    }
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A form received a submission.
    NewResponse {
        /// Form the response belongs to.
        form_id: String,
        /// The submitted response.
        data: NewResponseData,
        /// Server send time.
        timestamp: DateTime<Utc>,
    },
    /// Authoritative analytics snapshot for a form.
    AnalyticsUpdate {
        /// Form the snapshot belongs to.
        form_id: String,
        /// The snapshot.
        data: Box<AnalyticsData>,
        /// Server send time.
        timestamp: DateTime<Utc>,
    },
    /// Server keep-alive.
    Heartbeat {
        /// Server send time.
        timestamp: DateTime<Utc>,
    },
    /// Subscribe acknowledgement.
    Subscribed {
        /// Acknowledged form.
        form_id: String,
        /// Server send time.
        timestamp: DateTime<Utc>,
    },
    /// Unsubscribe acknowledgement.
    Unsubscribed {
        /// Acknowledged form.
        form_id: String,
        /// Server send time.
        timestamp: DateTime<Utc>,
    },
    /// Reply to a client `ping`.
    Pong {
        /// Server send time.
        timestamp: DateTime<Utc>,
    },
}

impl InboundMessage {
    /// Decodes one text frame.
    ///
    /// The discriminator is read first; unknown kinds, outbound-only kinds,
    /// topic-scoped kinds without a `formId` and payloads that do not match
    /// their kind are all rejected with [`Error::Parse`]. A missing
    /// `timestamp` is replaced by the local receive time.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut frame) = value else {
            return Err(ParseError::invalid_value("frame", "expected a JSON object").into());
        };

        let kind: MessageKind = frame
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError::missing_field("type"))?
            .parse()?;
        let timestamp = decode_timestamp(&frame)?;
        let form_id = if kind.is_topic_scoped() {
            match frame.get("formId").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => return Err(ParseError::missing_field("formId").into()),
            }
        } else {
            String::new()
        };

        let message = match kind {
            MessageKind::NewResponse => Self::NewResponse {
                form_id,
                data: decode_payload(&mut frame)?,
                timestamp,
            },
            MessageKind::AnalyticsUpdate => Self::AnalyticsUpdate {
                form_id,
                data: Box::new(decode_payload(&mut frame)?),
                timestamp,
            },
            MessageKind::Heartbeat => Self::Heartbeat { timestamp },
            MessageKind::Subscribed => Self::Subscribed { form_id, timestamp },
            MessageKind::Unsubscribed => Self::Unsubscribed { form_id, timestamp },
            MessageKind::Pong => Self::Pong { timestamp },
            MessageKind::Subscribe | MessageKind::Unsubscribe | MessageKind::Ping => {
                return Err(ParseError::invalid_value(
                    "type",
                    format!("'{kind}' is only sent by clients"),
                )
                .into());
            }
        };
        Ok(message)
    }

    /// Discriminator of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::NewResponse { .. } => MessageKind::NewResponse,
            Self::AnalyticsUpdate { .. } => MessageKind::AnalyticsUpdate,
            Self::Heartbeat { .. } => MessageKind::Heartbeat,
            Self::Subscribed { .. } => MessageKind::Subscribed,
            Self::Unsubscribed { .. } => MessageKind::Unsubscribed,
            Self::Pong { .. } => MessageKind::Pong,
        }
    }

    /// Form this message is about, for topic-scoped kinds.
    pub fn form_id(&self) -> Option<&str> {
        match self {
            Self::NewResponse { form_id, .. }
            | Self::AnalyticsUpdate { form_id, .. }
            | Self::Subscribed { form_id, .. }
            | Self::Unsubscribed { form_id, .. } => Some(form_id),
            Self::Heartbeat { .. } | Self::Pong { .. } => None,
        }
    }

    /// Server send time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::NewResponse { timestamp, .. }
            | Self::AnalyticsUpdate { timestamp, .. }
            | Self::Heartbeat { timestamp }
            | Self::Subscribed { timestamp, .. }
            | Self::Unsubscribed { timestamp, .. }
            | Self::Pong { timestamp } => *timestamp,
        }
    }
}

fn decode_timestamp(frame: &Map<String, Value>) -> Result<DateTime<Utc>> {
    match frame.get("timestamp") {
        None | Some(Value::Null) => Ok(Utc::now()),
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| ParseError::timestamp_owned(format!("'{raw}': {e}")).into()),
        Some(other) => Err(ParseError::invalid_value(
            "timestamp",
            format!("expected an RFC 3339 string, got {other}"),
        )
        .into()),
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(frame: &mut Map<String, Value>) -> Result<T> {
    match frame.remove("data") {
        None | Some(Value::Null) => Err(ParseError::missing_field("data").into()),
        Some(data) => serde_json::from_value(data).map_err(Error::from),
    }
}

/// A control frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Start receiving messages for a form.
    Subscribe {
        /// Form to follow.
        #[serde(rename = "formId")]
        form_id: String,
    },
    /// Stop receiving messages for a form.
    Unsubscribe {
        /// Form to stop following.
        #[serde(rename = "formId")]
        form_id: String,
    },
    /// Keep-alive; the server answers with `pong`.
    Ping,
}

impl OutboundMessage {
    /// Builds a `subscribe` frame.
    pub fn subscribe(form_id: impl Into<String>) -> Self {
        Self::Subscribe {
            form_id: form_id.into(),
        }
    }

    /// Builds an `unsubscribe` frame.
    pub fn unsubscribe(form_id: impl Into<String>) -> Self {
        Self::Unsubscribe {
            form_id: form_id.into(),
        }
    }

    /// Discriminator of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Subscribe { .. } => MessageKind::Subscribe,
            Self::Unsubscribe { .. } => MessageKind::Unsubscribe,
            Self::Ping => MessageKind::Ping,
        }
    }

    /// Serializes the frame to its JSON text.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
