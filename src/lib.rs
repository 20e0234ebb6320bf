//! # Formwire
//!
//! Realtime form analytics client.
//!
//! ## Features
//!
//! - **Reconnecting subscriptions**: one WebSocket per client, subscriptions
//!   replayed on every open, exponential backoff after unexpected closes
//! - **Typed messages**: `new_response` and `analytics_update` payloads
//!   decoded into [`NewResponseData`] and [`AnalyticsData`]
//! - **Live views**: [`LiveAnalytics`] keeps one form's aggregate current
//! - **Polling fallback**: [`AnalyticsPoller`] for deployments without the hub
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formwire::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = FormwireConfig::from_env();
//!     let client = Arc::new(WsClient::new(config.ws_config()?));
//!     let source = Arc::new(HttpAnalyticsSource::from_config(&config)?);
//!
//!     let live = LiveAnalytics::new(client, source, "contact-form", LiveAnalyticsOptions::default());
//!     live.start().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub use formwire_analytics;
pub use formwire_core;

pub use formwire_analytics::{
    AnalyticsPoller, AnalyticsSource, AnalyticsView, FormwireConfig, HttpAnalyticsSource,
    LiveAnalytics, LiveAnalyticsOptions, PollUpdate,
};
pub use formwire_core::{
    error::{Error, Result},
    types::*,
    ws_client::{ConnectionState, WsClient, WsConfig, WsEvent},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use formwire_analytics::{
        AnalyticsPoller, AnalyticsSource, AnalyticsView, FormwireConfig, HttpAnalyticsSource,
        LiveAnalytics, LiveAnalyticsOptions, PollUpdate,
    };
    pub use formwire_core::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_prelude_reexports() {
        use crate::prelude::*;
        let config = FormwireConfig::default();
        let ws: WsConfig = config.ws_config().unwrap();
        assert_eq!(ws.url, "ws://localhost:8080/api/v1/ws");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}
