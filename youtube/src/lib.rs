use crate::callback::{LoopbackReceiver, SystemBrowser};
use crate::config::Config;
use crate::credential::{CredentialStore, TokenFile};
use crate::oauth::{ClientSecrets, OAuthManager};
use crate::sink::{CsvSink, RecordSink};
use crate::youtube_api::{ApiBaseUrls, VideoApi, YouTubeClient};
use eyre::Context;

pub mod callback;
pub mod config;
pub mod credential;
pub mod enrich;
pub mod fetcher;
pub mod logging;
pub mod oauth;
pub mod sink;
pub mod youtube_api;

#[cfg(test)]
mod testing;

/// Shown in the browser once the OAuth redirect has been received.
const OAUTH_DONE: &str = include_str!("../oauth_success.html");

/// Authorizes against YouTube and writes the traffic-source export for the configured channel.
pub async fn run(config: &Config) -> eyre::Result<()> {
    // ==============================================================================
    // Credentials
    // ==============================================================================
    // The stored token is reused or refreshed when possible; only otherwise does the user get
    // sent to the consent page.
    let secrets = ClientSecrets::from_file(&config.client_secrets_path).await?;
    let oauth_manager = OAuthManager::new(secrets)?;
    let token_file = TokenFile::new(&config.token_path);
    let store = CredentialStore::new(
        config,
        token_file.clone(),
        oauth_manager.clone(),
        LoopbackReceiver::new(OAUTH_DONE),
        SystemBrowser,
    );
    let credential = store.obtain().await.context("obtain YouTube credentials")?;

    // ==============================================================================
    // Export
    // ==============================================================================
    let yt = YouTubeClient::new(credential, oauth_manager, token_file, ApiBaseUrls::default());
    let mut sink = CsvSink::new(&config.output_dir);
    export(&yt, config, &mut sink).await
}

/// Lists every upload of the configured channel, enriches each one, and hands the rows to `sink`.
///
/// Only failing to find the channel's uploads playlist, or failing to write, is an error.
/// Listing and per-video failures shrink the export instead.
pub async fn export(
    api: &impl VideoApi,
    config: &Config,
    sink: &mut impl RecordSink,
) -> eyre::Result<()> {
    let playlist_id = api
        .uploads_playlist_id(&config.channel)
        .await
        .context("find the channel's uploads playlist")?;
    tracing::info!(%playlist_id, "found uploads playlist");

    let ids = fetcher::list_all_ids(api, &playlist_id).await;
    if ids.is_empty() {
        tracing::info!("no videos found");
        return Ok(());
    }
    tracing::info!(videos = ids.len(), "fetching video details and analytics");

    let rows = enrich::enrich(api, &ids, &config.window).await;
    sink.write(&rows).context("save export")
}
