//! YouTube Data API v3 and YouTube Analytics API v2 client library.
//!
//! The export only needs four read operations, collected in [`VideoApi`]:
//!
//! 1. Resolve a channel to its *uploads* playlist (`channels.list`).
//! 2. Page through that playlist's video IDs (`playlistItems.list`).
//! 3. Look up a video's title and statistics (`videos.list`).
//! 4. Query the video's daily traffic-source analytics (`reports.query`).
//!
//! [`YouTubeClient`] implements them over HTTP; the pipeline only ever sees the trait.

pub mod analytics;
pub mod channels;
pub mod client;
pub mod playlist_items;
pub mod types;
pub mod videos;

pub use analytics::ReportResponse;
pub use client::{ApiBaseUrls, ApiError, YouTubeClient};
pub use types::{Page, PageInfo};
pub use videos::{Video, VideoStatistics};

use crate::config::{ChannelSelector, ReportWindow};

/// The YouTube operations the export is built from.
#[allow(async_fn_in_trait)]
pub trait VideoApi {
    /// The ID of the playlist containing every upload of `channel`.
    async fn uploads_playlist_id(&self, channel: &ChannelSelector) -> eyre::Result<String>;

    /// One page of video IDs from a playlist, in playlist order.
    async fn playlist_video_ids(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> eyre::Result<Page<String>>;

    /// Title and statistics of a video, or `None` if no such video is visible.
    async fn video(&self, video_id: &str) -> eyre::Result<Option<Video>>;

    /// Per-day, per-traffic-source views and average view duration of a video over `window`.
    async fn traffic_source_report(
        &self,
        video_id: &str,
        window: &ReportWindow,
    ) -> eyre::Result<ReportResponse>;
}
