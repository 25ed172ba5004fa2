//! Collecting every video ID of a playlist.

use crate::youtube_api::{ApiError, VideoApi};
use reqwest::StatusCode;

/// Items requested per page; the API maximum.
pub const PAGE_SIZE: u32 = 50;

/// How a failed page request should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageErrorKind {
    /// The API refused because of quota exhaustion or rate limiting (HTTP 403/429).
    QuotaOrRateLimit,
    /// Anything else: other statuses, transport failures, malformed responses.
    Other,
}

pub fn classify_page_error(error: &eyre::Report) -> PageErrorKind {
    match ApiError::find(error).map(|e| e.status) {
        Some(StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) => {
            PageErrorKind::QuotaOrRateLimit
        }
        _ => PageErrorKind::Other,
    }
}

/// Walks every page of `playlist_id` and returns the video IDs in server order.
///
/// A failed page ends the walk; whatever was collected up to that point is returned. Duplicate
/// IDs are kept.
pub async fn list_all_ids(api: &impl VideoApi, playlist_id: &str) -> Vec<String> {
    let mut all_videos = Vec::new();
    let mut next_page_token: Option<String> = None;
    let mut page = 0;

    loop {
        page += 1;
        let response = match api
            .playlist_video_ids(playlist_id, PAGE_SIZE, next_page_token.as_deref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                match classify_page_error(&e) {
                    PageErrorKind::QuotaOrRateLimit => {
                        tracing::warn!(page, "hit a quota or rate limit, stopping: {:#}", e);
                    }
                    PageErrorKind::Other => {
                        tracing::error!(page, "playlist page request failed, stopping: {:#}", e);
                    }
                }
                break;
            }
        };

        let retrieved = response.items.len();
        all_videos.extend(response.items);
        tracing::info!(
            page,
            retrieved,
            total = all_videos.len(),
            "retrieved playlist page"
        );

        next_page_token = response.next_page_token.filter(|t| !t.is_empty());
        if next_page_token.is_none() {
            tracing::info!("no more pages to fetch");
            break;
        }
    }

    all_videos
}
