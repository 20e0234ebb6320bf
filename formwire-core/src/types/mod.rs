//! Domain payload types carried by the realtime protocol and the REST
//! analytics endpoint.

pub mod analytics;
pub mod response;

pub use analytics::{AnalyticsData, FieldStats, RECENT_RESPONSES_LIMIT, TrendPoint};
pub use response::{NewResponseData, ResponseSummary, UNKNOWN_LOCATION};

/// Identifier of a form; also the topic of realtime subscriptions.
pub type FormId = String;

/// Serde helpers shared by the payload types.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};

    /// Deserializes JSON `null` as `T::default()`.
    ///
    /// The backend serializes empty maps and slices as `null`.
    pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}
