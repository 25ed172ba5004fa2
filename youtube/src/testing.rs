//! In-memory stand-ins for the OAuth server and the YouTube APIs.

use crate::config::{ChannelSelector, ReportWindow};
use crate::credential::Credential;
use crate::oauth::TokenEndpoint;
use crate::youtube_api::analytics::ColumnHeader;
use crate::youtube_api::videos::{VideoSnippet, VideoStatistics};
use crate::youtube_api::{ApiError, Page, ReportResponse, Video, VideoApi};
use http::Method;
use jiff::Timestamp;
use oauth2::basic::{BasicTokenResponse, BasicTokenType};
use oauth2::url::Url;
use oauth2::{
    AccessToken, AuthorizationCode, CsrfToken, EmptyExtraTokenFields, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn token(access: &str, refresh: Option<&str>) -> BasicTokenResponse {
    let mut token = BasicTokenResponse::new(
        AccessToken::new(access.to_string()),
        BasicTokenType::Bearer,
        EmptyExtraTokenFields {},
    );
    token.set_expires_in(Some(&std::time::Duration::from_secs(3599)));
    token.set_refresh_token(refresh.map(|r| RefreshToken::new(r.to_string())));
    token
}

/// A credential as it would be read back from the token file.
pub fn stored(access: &str, refresh: Option<&str>, expiry: Timestamp) -> Credential {
    Credential {
        access_token: AccessToken::new(access.to_string()),
        refresh_token: refresh.map(|r| RefreshToken::new(r.to_string())),
        expiry,
        scopes: vec![crate::config::YOUTUBE_READONLY_SCOPE.to_string()],
    }
}

pub enum RefreshOutcome {
    Renewed,
    Rejected,
}

/// Grants `interactive-access` for the code `granted-code`, and `refreshed-access` (without a new
/// refresh token) on refresh unless told to reject it.
pub struct FakeEndpoint {
    pub refresh_outcome: RefreshOutcome,
    pub refresh_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
}

impl FakeEndpoint {
    pub fn new(refresh_outcome: RefreshOutcome) -> Self {
        Self {
            refresh_outcome,
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
        }
    }
}

impl TokenEndpoint for FakeEndpoint {
    fn authorize_url(
        &self,
        redirect: &RedirectUrl,
        csrf: &CsrfToken,
        _pkce_challenge: PkceCodeChallenge,
        _scopes: &[Scope],
    ) -> eyre::Result<Url> {
        Ok(Url::parse_with_params(
            "https://accounts.example/auth",
            &[
                ("state", csrf.secret().as_str()),
                ("redirect_uri", redirect.as_str()),
            ],
        )?)
    }

    async fn exchange_code(
        &self,
        code: AuthorizationCode,
        _redirect: RedirectUrl,
        _pkce_verifier: PkceCodeVerifier,
    ) -> eyre::Result<BasicTokenResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(code.secret(), "granted-code");
        Ok(token("interactive-access", Some("interactive-refresh")))
    }

    async fn refresh(
        &self,
        _refresh_token: &RefreshToken,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.refresh_outcome {
            RefreshOutcome::Renewed => Some(token("refreshed-access", None)),
            RefreshOutcome::Rejected => None,
        })
    }
}

impl<T: TokenEndpoint> TokenEndpoint for &T {
    fn authorize_url(
        &self,
        redirect: &RedirectUrl,
        csrf: &CsrfToken,
        pkce_challenge: PkceCodeChallenge,
        scopes: &[Scope],
    ) -> eyre::Result<Url> {
        (**self).authorize_url(redirect, csrf, pkce_challenge, scopes)
    }

    async fn exchange_code(
        &self,
        code: AuthorizationCode,
        redirect: RedirectUrl,
        pkce_verifier: PkceCodeVerifier,
    ) -> eyre::Result<BasicTokenResponse> {
        (**self).exchange_code(code, redirect, pkce_verifier).await
    }

    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        (**self).refresh(refresh_token).await
    }
}

pub enum PageOutcome {
    Ids(Vec<String>),
    Status(StatusCode),
    Transport,
}

#[derive(Default)]
pub struct FakeApi {
    pub uploads_playlist: Option<String>,
    /// Page `i` is served for the cursor `page-i`; the first page needs no cursor.
    pub pages: Vec<PageOutcome>,
    pub videos: HashMap<String, Video>,
    pub failing_videos: HashSet<String>,
    pub reports: HashMap<String, ReportResponse>,
    pub failing_reports: HashSet<String>,
    pub page_requests: Mutex<Vec<Option<String>>>,
    pub video_requests: Mutex<Vec<String>>,
}

impl FakeApi {
    /// A playlist with pages of the given sizes; IDs are `p<page>-<n>`.
    pub fn with_pages(sizes: &[usize]) -> Self {
        Self {
            uploads_playlist: Some("UU-uploads".to_string()),
            pages: sizes
                .iter()
                .enumerate()
                .map(|(page, &size)| {
                    PageOutcome::Ids((0..size).map(|n| format!("p{page}-{n}")).collect())
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_video(mut self, video: Video, report: ReportResponse) -> Self {
        self.reports.insert(video.id.clone(), report);
        self.videos.insert(video.id.clone(), video);
        self
    }

    pub fn page_requests(&self) -> Vec<Option<String>> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn video_requests(&self) -> Vec<String> {
        self.video_requests.lock().unwrap().clone()
    }
}

pub fn api_error(status: StatusCode) -> eyre::Report {
    ApiError {
        method: Method::GET,
        url: "https://fake.invalid/".to_string(),
        status,
        body: r#"{"error": {"message": "fake"}}"#.to_string(),
    }
    .into()
}

pub fn video(id: &str, title: &str, likes: Option<&str>, comments: Option<&str>) -> Video {
    Video {
        id: id.to_string(),
        snippet: VideoSnippet {
            title: title.to_string(),
        },
        statistics: VideoStatistics {
            view_count: Some("100".to_string()),
            like_count: likes.map(str::to_string),
            comment_count: comments.map(str::to_string),
        },
    }
}

/// A traffic-source report with the standard columns and the given
/// `(day, source, views, average_view_duration)` rows.
pub fn report(rows: &[(&str, &str, i64, i64)]) -> ReportResponse {
    let header = |name: &str, column_type: &str, data_type: &str| ColumnHeader {
        name: name.to_string(),
        column_type: column_type.to_string(),
        data_type: data_type.to_string(),
    };
    ReportResponse {
        kind: "youtubeAnalytics#resultTable".to_string(),
        column_headers: vec![
            header("day", "DIMENSION", "STRING"),
            header("insightTrafficSourceType", "DIMENSION", "STRING"),
            header("views", "METRIC", "INTEGER"),
            header("averageViewDuration", "METRIC", "INTEGER"),
        ],
        rows: Some(
            rows.iter()
                .map(|&(day, source, views, duration)| {
                    vec![
                        serde_json::json!(day),
                        serde_json::json!(source),
                        serde_json::json!(views),
                        serde_json::json!(duration),
                    ]
                })
                .collect(),
        ),
    }
}

impl VideoApi for FakeApi {
    async fn uploads_playlist_id(&self, channel: &ChannelSelector) -> eyre::Result<String> {
        self.uploads_playlist
            .clone()
            .ok_or_else(|| eyre::eyre!("channel not found: {:?}", channel))
    }

    async fn playlist_video_ids(
        &self,
        _playlist_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> eyre::Result<Page<String>> {
        assert_eq!(max_results, 50);
        self.page_requests
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));

        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .expect("only cursors handed out by the fake are used"),
        };
        match &self.pages[index] {
            PageOutcome::Ids(ids) => Ok(Page {
                items: ids.clone(),
                next_page_token: (index + 1 < self.pages.len())
                    .then(|| format!("page-{}", index + 1)),
            }),
            PageOutcome::Status(status) => Err(api_error(*status)),
            PageOutcome::Transport => Err(eyre::eyre!("connection reset by peer")),
        }
    }

    async fn video(&self, video_id: &str) -> eyre::Result<Option<Video>> {
        self.video_requests
            .lock()
            .unwrap()
            .push(video_id.to_string());
        if self.failing_videos.contains(video_id) {
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(self.videos.get(video_id).cloned())
    }

    async fn traffic_source_report(
        &self,
        video_id: &str,
        _window: &ReportWindow,
    ) -> eyre::Result<ReportResponse> {
        if self.failing_reports.contains(video_id) {
            return Err(api_error(StatusCode::BAD_REQUEST));
        }
        Ok(self.reports.get(video_id).cloned().unwrap_or_default())
    }
}
