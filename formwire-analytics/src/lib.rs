//! Live form analytics on top of the Formwire realtime client.
//!
//! - [`LiveAnalytics`]: one form's aggregate, fetched over REST and kept
//!   current from `new_response` / `analytics_update` messages.
//! - [`AnalyticsPoller`]: the same data by periodic polling.
//! - [`AnalyticsSource`]: where aggregates are fetched from, with the
//!   [`HttpAnalyticsSource`] REST implementation.
//! - [`FormwireConfig`]: `FORMWIRE_` environment configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use formwire_analytics::{FormwireConfig, HttpAnalyticsSource, LiveAnalytics, LiveAnalyticsOptions};
//! use formwire_core::ws_client::WsClient;
//!
//! # async fn example() -> formwire_core::Result<()> {
//! let config = FormwireConfig::from_env();
//! let client = Arc::new(WsClient::new(config.ws_config()?));
//! let source = Arc::new(HttpAnalyticsSource::from_config(&config)?);
//!
//! let live = LiveAnalytics::new(
//!     client,
//!     source,
//!     "contact-form",
//!     LiveAnalyticsOptions::default().on_new_response(|response| {
//!         println!("new response {}", response.id);
//!     }),
//! );
//! live.start().await?;
//! println!("{:?}", live.snapshot().analytics);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod live;
pub mod poller;
pub mod source;

pub use config::{API_URL_ENV, DEFAULT_API_URL, FormwireConfig};
pub use live::{
    AnalyticsUpdateCallback, AnalyticsView, LiveAnalytics, LiveAnalyticsOptions,
    NewResponseCallback,
};
pub use poller::{AnalyticsPoller, DEFAULT_POLL_INTERVAL, PollCallback, PollUpdate, ResponseTracker};
pub use source::{AnalyticsSource, HttpAnalyticsSource};
