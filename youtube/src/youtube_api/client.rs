//! Core YouTube API client functionality and authentication management.

use crate::config::{ChannelSelector, ReportWindow};
use crate::credential::{Credential, TokenFile};
use crate::oauth::TokenEndpoint;
use crate::youtube_api::analytics::{
    ReportResponse, TRAFFIC_SOURCE_DIMENSIONS, TRAFFIC_SOURCE_METRICS,
};
use crate::youtube_api::channels::ChannelListResponse;
use crate::youtube_api::playlist_items::PlaylistItemListResponse;
use crate::youtube_api::types::Page;
use crate::youtube_api::videos::{Video, VideoListResponse};
use crate::youtube_api::VideoApi;
use eyre::Context;
use http::Method;
use jiff::Timestamp;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// A YouTube API request that the server answered with a non-success status.
#[derive(Debug, thiserror::Error)]
#[error("YouTube API {method} request to {url} failed with status {status}: {body}")]
pub struct ApiError {
    pub method: Method,
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

impl ApiError {
    /// Finds the API error anywhere in a report's chain of causes.
    pub fn find(report: &eyre::Report) -> Option<&ApiError> {
        report.chain().find_map(|e| e.downcast_ref::<ApiError>())
    }
}

/// Where the two APIs are served from, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBaseUrls {
    /// YouTube Data API v3.
    pub data: String,
    /// YouTube Analytics API v2.
    pub analytics: String,
}

impl Default for ApiBaseUrls {
    fn default() -> Self {
        Self {
            data: "https://www.googleapis.com/youtube/v3".to_string(),
            analytics: "https://youtubeanalytics.googleapis.com/v2".to_string(),
        }
    }
}

/// Client for the YouTube Data API v3 and the YouTube Analytics API v2.
///
/// This client wraps an OAuth2 credential and provides methods to call the API endpoints the
/// export needs. The credential is refreshed through `E` before any request that would otherwise
/// be made with an expired access token, and every refreshed credential is written back to the
/// token file.
#[derive(Debug)]
pub struct YouTubeClient<E> {
    /// The current credential, locked across the check-and-refresh.
    credential: Arc<Mutex<Credential>>,
    token_endpoint: Arc<E>,
    token_file: TokenFile,
    base_urls: ApiBaseUrls,
    client: reqwest::Client,
}

impl<E: TokenEndpoint> YouTubeClient<E> {
    pub fn new(
        credential: Credential,
        token_endpoint: E,
        token_file: TokenFile,
        base_urls: ApiBaseUrls,
    ) -> Self {
        Self {
            credential: Arc::new(Mutex::new(credential)),
            token_endpoint: Arc::new(token_endpoint),
            token_file,
            base_urls,
            client: reqwest::Client::new(),
        }
    }

    /// Gets a guaranteed-fresh access token, refreshing if necessary.
    ///
    /// # Returns
    ///
    /// * `Ok(token)` - A guaranteed-fresh access token
    /// * `Err(_)` - Token refresh failed or network error occurred
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut credential = self.credential.lock().await;

        if credential.is_expired_at(Timestamp::now()) {
            tracing::debug!("access token expired, attempting refresh");

            if credential.refresh(&*self.token_endpoint).await? {
                tracing::info!("refreshed expired credentials");
                if let Err(e) = self.token_file.save(&credential).await {
                    tracing::warn!("could not persist refreshed credentials: {:#}", e);
                }
            } else {
                tracing::error!("access token refresh failed, client is unusable");
                eyre::bail!("Unable to refresh expired access token");
            }
        }

        Ok(credential.access_token.secret().to_string())
    }

    /// Makes an authenticated HTTP request with common error handling.
    ///
    /// A non-success status is turned into an [`ApiError`] so callers can tell quota and
    /// rate-limit rejections apart from other failures.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        method: Method,
        url: &str,
        query_params: &[(&str, &str)],
    ) -> eyre::Result<reqwest::Response> {
        let access_token = self.fresh_access_token().await?;

        let response = self
            .client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query_params)
            .send()
            .await
            .with_context(|| format!("send {} request to YouTube API: {}", method, url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError {
                method,
                url: url.to_string(),
                status,
                body,
            }
            .into());
        }

        Ok(response)
    }

    /// Internal method to call the `channels.list` API for the channel's content details.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    async fn list_channels_internal(
        &self,
        channel: &ChannelSelector,
    ) -> eyre::Result<ChannelListResponse> {
        let url = format!("{}/channels", self.base_urls.data);
        let mut query_params = vec![("part", "contentDetails")];
        match channel {
            ChannelSelector::Id(id) => query_params.push(("id", id.as_str())),
            ChannelSelector::Mine => query_params.push(("mine", "true")),
        }

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await?;

        let channels: ChannelListResponse = response
            .json()
            .await
            .context("parse YouTube channels API response as JSON")?;

        tracing::debug!(
            total_results = channels.page_info.total_results,
            returned_items = channels.items.len(),
            "fetched channels"
        );

        Ok(channels)
    }

    /// Internal method to call the `playlistItems.list` API.
    ///
    /// # Arguments
    ///
    /// * `playlist_id` - The playlist to list
    /// * `max_results` - Maximum number of items to return (1-50)
    /// * `page_token` - Optional page token for pagination
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlistItems/list>
    async fn list_playlist_items_internal(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> eyre::Result<PlaylistItemListResponse> {
        let url = format!("{}/playlistItems", self.base_urls.data);
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", max_results_string.as_str()),
        ];

        // Add pageToken if provided
        if let Some(token) = page_token {
            query_params.push(("pageToken", token));
        }

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await?;

        let items: PlaylistItemListResponse = response
            .json()
            .await
            .context("parse YouTube playlistItems API response as JSON")?;

        tracing::debug!(
            total_results = items.page_info.total_results,
            returned_items = items.items.len(),
            "fetched playlist items"
        );

        Ok(items)
    }
}

impl<E: TokenEndpoint> VideoApi for YouTubeClient<E> {
    /// Looks up the playlist holding every upload of the selected channel.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.readonly`
    #[instrument(skip(self))]
    async fn uploads_playlist_id(&self, channel: &ChannelSelector) -> eyre::Result<String> {
        let channels = self.list_channels_internal(channel).await?;
        channels
            .items
            .into_iter()
            .next()
            .map(|c| c.content_details.related_playlists.uploads)
            .ok_or_else(|| eyre::eyre!("channel not found: {:?}", channel))
    }

    #[instrument(skip(self))]
    async fn playlist_video_ids(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> eyre::Result<Page<String>> {
        let response = self
            .list_playlist_items_internal(playlist_id, max_results, page_token)
            .await?;
        Ok(Page {
            items: response
                .items
                .into_iter()
                .map(|item| item.snippet.resource_id.video_id)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    /// Gets the title and statistics of a single video.
    ///
    /// Returns `Ok(None)` if the video does not exist or is not visible to the caller.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    async fn video(&self, video_id: &str) -> eyre::Result<Option<Video>> {
        let url = format!("{}/videos", self.base_urls.data);
        let query_params = [("part", "snippet,statistics"), ("id", video_id)];

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await?;

        let videos: VideoListResponse = response
            .json()
            .await
            .context("parse YouTube videos API response as JSON")?;

        tracing::debug!(
            video_id,
            returned_items = videos.items.len(),
            "fetched video details"
        );

        Ok(videos.items.into_iter().next())
    }

    /// Daily views and average view duration of one video, broken down by traffic source.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/yt-analytics.readonly`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/analytics/reference/reports/query>
    #[instrument(skip(self))]
    async fn traffic_source_report(
        &self,
        video_id: &str,
        window: &ReportWindow,
    ) -> eyre::Result<ReportResponse> {
        let url = format!("{}/reports", self.base_urls.analytics);
        let start_date = window.start.to_string();
        let end_date = window.end.to_string();
        let filters = format!("video=={video_id}");
        let query_params = [
            ("ids", "channel==MINE"),
            ("startDate", start_date.as_str()),
            ("endDate", end_date.as_str()),
            ("dimensions", TRAFFIC_SOURCE_DIMENSIONS),
            ("metrics", TRAFFIC_SOURCE_METRICS),
            ("sort", "day"),
            ("filters", filters.as_str()),
        ];

        let response = self
            .make_authenticated_request(Method::GET, &url, &query_params)
            .await?;

        let report: ReportResponse = response
            .json()
            .await
            .context("parse YouTube Analytics reports API response as JSON")?;

        tracing::debug!(
            video_id,
            returned_rows = report.rows().len(),
            "fetched traffic-source report"
        );

        Ok(report)
    }
}
