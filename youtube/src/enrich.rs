//! Joining video details with per-day traffic-source analytics.

use crate::config::ReportWindow;
use crate::youtube_api::{ReportResponse, Video, VideoApi};
use eyre::Context;
use serde::Serialize;
use std::collections::HashSet;

/// One exported line: a video's traffic from one source on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsRow {
    pub video_id: String,
    pub title: String,
    /// As reported by the analytics API, `YYYY-MM-DD`.
    pub day: String,
    #[serde(rename = "insightTrafficSourceType")]
    pub traffic_source_category: String,
    pub view_count: serde_json::Number,
    pub average_view_duration: serde_json::Number,
    /// `None` when the owner hides the count.
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

impl AnalyticsRow {
    /// Column names, in field order.
    pub const COLUMNS: [&'static str; 8] = [
        "video_id",
        "title",
        "day",
        "insightTrafficSourceType",
        "view_count",
        "average_view_duration",
        "like_count",
        "comment_count",
    ];

    fn key(&self) -> (&str, &str, &str) {
        (&self.video_id, &self.day, &self.traffic_source_category)
    }
}

/// Rows with at most one entry per video, day and traffic source.
#[derive(Debug, Clone, Default)]
pub struct ExportSet {
    rows: Vec<AnalyticsRow>,
}

impl ExportSet {
    /// Rows in first-occurrence order.
    pub fn rows(&self) -> &[AnalyticsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<AnalyticsRow> for ExportSet {
    fn from_iter<I: IntoIterator<Item = AnalyticsRow>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let rows = iter
            .into_iter()
            .filter(|row| {
                let (video_id, day, source) = row.key();
                seen.insert((video_id.to_owned(), day.to_owned(), source.to_owned()))
            })
            .collect();
        Self { rows }
    }
}

/// Fetches details and analytics for every ID and builds the deduplicated export.
///
/// A video whose lookup fails is logged and contributes nothing; the others are unaffected.
pub async fn enrich(api: &impl VideoApi, ids: &[String], window: &ReportWindow) -> ExportSet {
    let mut rows = Vec::new();
    for (i, video_id) in ids.iter().map(String::as_str).enumerate() {
        match enrich_one(api, video_id, window).await {
            Ok(video_rows) => {
                tracing::debug!(
                    video_id,
                    rows = video_rows.len(),
                    progress = i + 1,
                    total = ids.len(),
                    "enriched video"
                );
                rows.extend(video_rows);
            }
            Err(e) => {
                tracing::error!(video_id, "skipping video: {:#}", e);
            }
        }
    }

    let collected = rows.len();
    let export: ExportSet = rows.into_iter().collect();
    tracing::info!(
        videos = ids.len(),
        rows = export.len(),
        duplicates = collected - export.len(),
        "collected analytics rows"
    );
    export
}

async fn enrich_one(
    api: &impl VideoApi,
    video_id: &str,
    window: &ReportWindow,
) -> eyre::Result<Vec<AnalyticsRow>> {
    let Some(video) = api.video(video_id).await.context("fetch video details")? else {
        tracing::warn!(video_id, "video not found");
        return Ok(Vec::new());
    };
    let report = api
        .traffic_source_report(video_id, window)
        .await
        .context("fetch traffic-source report")?;
    flatten(&video, &report)
}

/// One row per report row, carrying the video's details along.
///
/// A report without one of the requested columns is an error. A single row with a cell of the
/// wrong type is logged and left out.
fn flatten(video: &Video, report: &ReportResponse) -> eyre::Result<Vec<AnalyticsRow>> {
    let column = |name: &str| {
        report
            .column(name)
            .ok_or_else(|| eyre::eyre!("report has no {name} column"))
    };
    let day = column("day")?;
    let source = column("insightTrafficSourceType")?;
    let views = column("views")?;
    let duration = column("averageViewDuration")?;

    let to_row = |row: &[serde_json::Value]| -> eyre::Result<AnalyticsRow> {
        let string = |i: usize| match row.get(i) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            other => Err(eyre::eyre!("expected a string in column {i}, got {other:?}")),
        };
        let number = |i: usize| match row.get(i) {
            Some(serde_json::Value::Number(n)) => Ok(n.clone()),
            other => Err(eyre::eyre!("expected a number in column {i}, got {other:?}")),
        };
        Ok(AnalyticsRow {
            video_id: video.id.clone(),
            title: video.snippet.title.clone(),
            day: string(day)?,
            traffic_source_category: string(source)?,
            view_count: number(views)?,
            average_view_duration: number(duration)?,
            like_count: video.statistics.like_count.clone(),
            comment_count: video.statistics.comment_count.clone(),
        })
    };

    Ok(report
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(n, row)| match to_row(row.as_slice()) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!(video_id = %video.id, row = n, "skipping report row: {:#}", e);
                None
            }
        })
        .collect())
}
