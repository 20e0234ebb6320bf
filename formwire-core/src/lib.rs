//! Formwire core library.
//!
//! Shared building blocks of the Formwire analytics client: the error
//! taxonomy, logging setup, the payload types exchanged with the backend and
//! the reconnecting realtime subscription client.
//!
//! # Example
//!
//! ```rust,no_run
//! use formwire_core::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = WsConfig::from_origin("https://forms.example.com")?;
//! let client = WsClient::new(config);
//!
//! client.on_topic("form-1", MessageKind::NewResponse, |message: &InboundMessage| {
//!     println!("new response at {}", message.timestamp());
//! });
//! client.subscribe("form-1")?;
//! client.connect();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// - module_name_repetitions: WsConfig in ws_client, ParseError in error
// - missing_errors_doc / missing_panics_doc: too verbose for every Result
// - must_use_candidate: not every accessor needs #[must_use]
// - doc_markdown: wire names (formId, analytics_update) read better bare
// - cast_possible_truncation / cast_sign_loss / cast_possible_wrap: byte
//   counts and millisecond timestamps move between u64, u128 and i64
// - return_self_not_must_use: builder-style config setters
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::return_self_not_must_use)]

pub use serde;
pub use serde_json;

pub mod error;
pub mod logging;
pub mod types;
pub mod ws_client;

pub use error::{ConfigValidationError, ContextExt, Error, NetworkError, ParseError, Result};
pub use types::{AnalyticsData, FieldStats, FormId, NewResponseData, ResponseSummary, TrendPoint};
pub use ws_client::{
    ConnectionState, EventKey, HandlerId, InboundMessage, MessageKind, OutboundMessage, WsClient,
    WsConfig, WsEvent,
};

/// Prelude module for convenient imports
///
/// ```rust
/// use formwire_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ContextExt, Error, Result};
    pub use crate::logging::{LogConfig, LogFormat, LogLevel, init_logging, try_init_logging};
    pub use crate::types::{
        AnalyticsData, FieldStats, FormId, NewResponseData, ResponseSummary, TrendPoint,
    };
    pub use crate::ws_client::{
        BackoffConfig, ConnectionState, Connector, EventKey, HandlerId, InboundMessage,
        MessageKind, OutboundMessage, WsClient, WsConfig, WsEvent, WsStatsSnapshot,
    };
    pub use serde::{Deserialize, Serialize};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
