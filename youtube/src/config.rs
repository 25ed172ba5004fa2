//! Run configuration.
//!
//! Everything a run needs to know about its environment lives in [`Config`], which `main` builds
//! once and hands to each component. Nothing here reads ambient state except [`Config::new`]'s
//! caller, which decides what "today" is.

use jiff::civil::{Date, date};
use oauth2::Scope;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Analytics data before this day is never requested.
pub const REPORT_FLOOR: Date = date(2020, 1, 1);

/// Read-only access to the channel's videos.
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// Read-only access to the channel's analytics reports.
pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/yt-analytics.readonly";

/// Which channel's uploads to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// A specific channel, by its YouTube channel ID.
    Id(String),
    /// The channel owned by the authenticated user.
    Mine,
}

/// The inclusive date range covered by the analytics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: Date,
    pub end: Date,
}

impl ReportWindow {
    /// The window for a run executed on `today`.
    ///
    /// The window always starts at [`REPORT_FLOOR`] and ends on the last day of `today`'s month,
    /// so every run within a month asks for the same range.
    pub fn for_run_on(today: Date) -> Self {
        Self {
            start: REPORT_FLOOR,
            end: today.last_of_month(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client secrets for an installed application.
    pub client_secrets_path: PathBuf,
    /// Where the OAuth credential is persisted between runs.
    pub token_path: PathBuf,
    /// Directory the export is written into.
    pub output_dir: PathBuf,
    /// Directory the run log is appended to.
    pub log_dir: PathBuf,
    pub channel: ChannelSelector,
    pub window: ReportWindow,
    /// Loopback ports tried, in order, for the OAuth redirect.
    pub callback_ports: RangeInclusive<u16>,
    pub scopes: Vec<Scope>,
}

impl Config {
    /// Builds the configuration for a run on `today`.
    ///
    /// The log directory is `log/` inside `output_dir`.
    pub fn new(
        client_secrets_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        channel: ChannelSelector,
        today: Date,
    ) -> Self {
        let output_dir = output_dir.into();
        Self {
            client_secrets_path: client_secrets_path.into(),
            token_path: token_path.into(),
            log_dir: output_dir.join("log"),
            output_dir,
            channel,
            window: ReportWindow::for_run_on(today),
            callback_ports: 8080..=8089,
            scopes: vec![
                Scope::new(YOUTUBE_READONLY_SCOPE.to_string()),
                Scope::new(ANALYTICS_READONLY_SCOPE.to_string()),
            ],
        }
    }

    /// The log file for this run; one file per target month.
    pub fn log_file_name(&self) -> String {
        format!("youtube_log_{}.txt", self.window.end)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}
