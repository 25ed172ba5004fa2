//! YouTube Analytics API v2 report types.

use serde::{Deserialize, Serialize};

/// Dimensions of the per-video traffic-source report, in request order.
pub const TRAFFIC_SOURCE_DIMENSIONS: &str = "day,insightTrafficSourceType";

/// Metrics of the per-video traffic-source report, in request order.
pub const TRAFFIC_SOURCE_METRICS: &str = "views,averageViewDuration";

/// Response structure for the `reports.query` API call.
///
/// The report is a table: [`Self::column_headers`] describes the columns, and each entry of
/// [`Self::rows`] holds one value per column, dimensions first and metrics after.
///
/// See: <https://developers.google.com/youtube/analytics/reference/reports/query>
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub kind: String,
    #[serde(rename = "columnHeaders", default)]
    pub column_headers: Vec<ColumnHeader>,
    /// Absent when the query matched no data.
    #[serde(default)]
    pub rows: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnHeader {
    /// The dimension or metric name, e.g. `day` or `views`.
    pub name: String,
    /// `DIMENSION` or `METRIC`.
    #[serde(rename = "columnType")]
    pub column_type: String,
    /// `STRING`, `INTEGER`, `FLOAT`, ...
    #[serde(rename = "dataType")]
    pub data_type: String,
}

impl ReportResponse {
    /// Position of the column called `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.column_headers.iter().position(|h| h.name == name)
    }

    pub fn rows(&self) -> &[Vec<serde_json::Value>] {
        self.rows.as_deref().unwrap_or_default()
    }
}
