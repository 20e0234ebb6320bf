//! Aggregated per-form analytics snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::de::null_as_default;
use super::response::{NewResponseData, ResponseSummary};

/// Maximum number of entries kept in [`AnalyticsData::recent_responses`].
pub const RECENT_RESPONSES_LIMIT: usize = 10;

/// Full analytics aggregate for one form.
///
/// Delivered whole by the REST endpoint and by `analytics_update` messages;
/// patched incrementally by `new_response` messages through
/// [`AnalyticsData::record_response`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    /// Form the aggregate belongs to.
    pub form_id: String,
    /// All-time submissions.
    pub total_responses: u64,
    /// Submissions since local midnight.
    pub today_responses: u64,
    /// Submissions in the last seven days.
    pub week_responses: u64,
    /// Submissions in the last thirty days.
    pub month_responses: u64,
    /// Percentage of started sessions that were submitted.
    #[serde(default)]
    pub completion_rate: f64,
    /// Average completion time in seconds.
    #[serde(default)]
    pub average_time: f64,
    /// Device class to submission count.
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_stats: HashMap<String, u64>,
    /// Field id to field statistics.
    #[serde(default, deserialize_with = "null_as_default")]
    pub field_analytics: HashMap<String, FieldStats>,
    /// Submission counts over time.
    #[serde(default, deserialize_with = "null_as_default")]
    pub response_trends: Vec<TrendPoint>,
    /// Newest first, at most [`RECENT_RESPONSES_LIMIT`] entries.
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_responses: Vec<ResponseSummary>,
    /// Time the aggregate was computed or last patched.
    pub last_updated: DateTime<Utc>,
    /// Hour of day (0-23) with the most submissions.
    #[serde(default)]
    pub peak_hour: u8,
    /// Most common referrer.
    #[serde(default)]
    pub top_referrer: String,
}

impl AnalyticsData {
    /// Folds one newly submitted response into the aggregate.
    ///
    /// Bumps every period counter, prepends a summary to the recent list
    /// (dropping the oldest beyond the limit) and stamps `last_updated`.
    /// Other aggregates (device stats, trends) are left for the next
    /// authoritative snapshot.
    pub fn record_response(&mut self, response: &NewResponseData, now: DateTime<Utc>) {
        self.total_responses += 1;
        self.today_responses += 1;
        self.week_responses += 1;
        self.month_responses += 1;

        self.recent_responses
            .insert(0, ResponseSummary::from(response));
        self.recent_responses.truncate(RECENT_RESPONSES_LIMIT);
        self.last_updated = now;
    }
}

/// Per-field statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStats {
    /// Field identifier.
    pub field_id: String,
    /// Human-readable label.
    #[serde(default)]
    pub field_label: String,
    /// Responses that answered the field.
    pub response_count: u64,
    /// Responses that skipped the field.
    #[serde(default)]
    pub skip_count: u64,
    /// Most frequent values with their counts.
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_values: HashMap<String, u64>,
    /// Mean of numeric answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_value: Option<f64>,
    /// Value distribution for choice fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<HashMap<String, Value>>,
}

/// One bucket of the response trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Bucket start.
    pub time: DateTime<Utc>,
    /// Submissions in the bucket.
    pub count: u64,
    /// Display label.
    #[serde(default)]
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(id: &str) -> NewResponseData {
        NewResponseData {
            id: id.to_string(),
            form_id: "f1".to_string(),
            submitted_at: Utc::now(),
            data: HashMap::new(),
            device: "desktop".to_string(),
        }
    }

    #[test]
    fn test_deserialize_backend_snapshot() {
        let payload = json!({
            "formId": "f1",
            "totalResponses": 42,
            "todayResponses": 3,
            "weekResponses": 10,
            "monthResponses": 30,
            "completionRate": 87.5,
            "averageTime": 95.2,
            "deviceStats": {"mobile": 20, "desktop": 22},
            "fieldAnalytics": {
                "rating": {
                    "fieldId": "rating",
                    "fieldLabel": "Rating",
                    "responseCount": 40,
                    "skipCount": 2,
                    "topValues": {"5": 25},
                    "averageValue": 4.4
                }
            },
            "responseTrends": [{"time": "2024-01-15T00:00:00Z", "count": 6, "label": "Mon"}],
            "recentResponses": null,
            "lastUpdated": "2024-01-17T11:30:00Z",
            "peakHour": 14,
            "topReferrer": "newsletter"
        });

        let data: AnalyticsData = serde_json::from_value(payload).unwrap();
        assert_eq!(data.total_responses, 42);
        assert_eq!(data.device_stats["desktop"], 22);
        assert_eq!(data.field_analytics["rating"].average_value, Some(4.4));
        assert!(data.field_analytics["rating"].distribution.is_none());
        assert!(data.recent_responses.is_empty());
        assert_eq!(data.peak_hour, 14);
    }

    #[test]
    fn test_record_response_bumps_all_counters() {
        let mut data = AnalyticsData {
            total_responses: 5,
            today_responses: 1,
            week_responses: 2,
            month_responses: 3,
            ..Default::default()
        };
        let now = Utc::now();
        data.record_response(&response("r1"), now);

        assert_eq!(data.total_responses, 6);
        assert_eq!(data.today_responses, 2);
        assert_eq!(data.week_responses, 3);
        assert_eq!(data.month_responses, 4);
        assert_eq!(data.recent_responses[0].id, "r1");
        assert_eq!(data.last_updated, now);
    }

    #[test]
    fn test_recent_responses_capped_newest_first() {
        let mut data = AnalyticsData::default();
        for i in 0..15 {
            data.record_response(&response(&format!("r{i}")), Utc::now());
        }
        assert_eq!(data.recent_responses.len(), RECENT_RESPONSES_LIMIT);
        assert_eq!(data.recent_responses[0].id, "r14");
        assert_eq!(data.recent_responses[9].id, "r5");
        assert_eq!(data.total_responses, 15);
    }
}
