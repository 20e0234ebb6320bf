//! Where analytics snapshots come from.

use std::time::Duration;

use async_trait::async_trait;
use formwire_core::error::{Error, NetworkError, Result};
use formwire_core::types::AnalyticsData;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::FormwireConfig;

/// Fetches the full analytics aggregate of a form.
#[async_trait]
pub trait AnalyticsSource: Send + Sync + 'static {
    /// Returns the current aggregate for `form_id`.
    async fn fetch(&self, form_id: &str) -> Result<AnalyticsData>;
}

/// [`AnalyticsSource`] backed by `GET {api_url}/analytics/form/{formId}`.
#[derive(Debug, Clone)]
pub struct HttpAnalyticsSource {
    client: Client,
    base_url: Url,
}

impl HttpAnalyticsSource {
    /// Creates a source for the REST API at `api_url`.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(api_url)?;
        if base_url.cannot_be_a_base() {
            return Err(NetworkError::InvalidEndpoint(api_url.to_string()).into());
        }
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::from(NetworkError::Transport(Box::new(e))))?;
        Ok(Self { client, base_url })
    }

    /// Creates a source from loaded configuration.
    pub fn from_config(config: &FormwireConfig) -> Result<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }

    /// Endpoint for `form_id`. The id is percent-encoded as one segment.
    pub fn analytics_url(&self, form_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| NetworkError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["analytics", "form", form_id]);
        Ok(url)
    }
}

#[async_trait]
impl AnalyticsSource for HttpAnalyticsSource {
    #[instrument(name = "analytics_fetch", skip(self), fields(status))]
    async fn fetch(&self, form_id: &str) -> Result<AnalyticsData> {
        let url = self.analytics_url(form_id)?;
        debug!(url = %url, "fetching analytics");

        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());
        let body = response.text().await.map_err(map_reqwest)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "analytics request failed");
            return Err(Error::request_failed(
                status.as_u16(),
                format!("failed to fetch analytics: {body}"),
            ));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn map_reqwest(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::timeout(format!("analytics request timed out: {err}"))
    } else {
        NetworkError::Transport(Box::new(err)).into()
    }
}
