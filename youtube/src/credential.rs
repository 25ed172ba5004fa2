//! The OAuth credential and its lifecycle: load, refresh, authorize, persist.

use crate::callback::{AuthorizationCodeReceiver, Browser, PendingRedirect};
use crate::config::Config;
use crate::oauth::{TokenEndpoint, verify_redirect};
use eyre::Context;
use jiff::{SignedDuration, Timestamp};
use oauth2::basic::BasicTokenResponse;
use oauth2::{AccessToken, CsrfToken, PkceCodeChallenge, RefreshToken, Scope, TokenResponse};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// A credential is considered expired this long before the server says it is.
const EXPIRY_MARGIN: SignedDuration = SignedDuration::from_secs(300);

/// Lifetime assumed for tokens whose response does not say when they expire.
const DEFAULT_LIFETIME: SignedDuration = SignedDuration::from_secs(3600);

/// An OAuth token bundle authorizing API calls.
///
/// This is also the on-disk format of the token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: AccessToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,
    /// When the access token stops being accepted.
    pub expiry: Timestamp,
    /// Scopes the user actually granted.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Builds a credential from a fresh token response received at `now`.
    ///
    /// If the response does not list granted scopes, the server granted what was `requested`.
    pub fn from_token_response(
        token: &BasicTokenResponse,
        requested: &[Scope],
        now: Timestamp,
    ) -> Self {
        let scopes = match token.scopes() {
            Some(granted) => granted.iter().map(|s| s.as_str().to_string()).collect(),
            None => requested.iter().map(|s| s.as_str().to_string()).collect(),
        };
        Self {
            access_token: token.access_token().clone(),
            refresh_token: token.refresh_token().cloned(),
            expiry: Self::expiry_of(token, now),
            scopes,
        }
    }

    fn expiry_of(token: &BasicTokenResponse, now: Timestamp) -> Timestamp {
        let lifetime = token
            .expires_in()
            .and_then(|d| SignedDuration::try_from(d).ok())
            .unwrap_or(DEFAULT_LIFETIME);
        now.checked_add(lifetime)
            .or_else(|_| now.checked_add(DEFAULT_LIFETIME))
            .unwrap_or(now)
    }

    /// Whether the access token must be refreshed before it is used at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now.checked_add(EXPIRY_MARGIN)
            .map_or(true, |deadline| deadline >= self.expiry)
    }

    /// Scopes in `requested` that this credential was not granted.
    pub fn missing_scopes<'a>(&self, requested: &'a [Scope]) -> Vec<&'a str> {
        requested
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !self.scopes.iter().any(|granted| granted.as_str() == *s))
            .collect()
    }

    /// Refreshes this credential in place, preserving the refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Credential was successfully refreshed
    /// * `Ok(false)` - Refresh was not possible (no refresh token, or it was rejected)
    /// * `Err(_)` - Network or other error occurred
    pub async fn refresh(&mut self, endpoint: &impl TokenEndpoint) -> eyre::Result<bool> {
        let Some(refresh_token) = self.refresh_token.clone() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(false);
        };

        tracing::trace!("refreshing token");
        let Some(token) = endpoint
            .refresh(&refresh_token)
            .await
            .context("refresh OAuth token")?
        else {
            return Ok(false);
        };

        self.access_token = token.access_token().clone();
        self.expiry = Self::expiry_of(&token, Timestamp::now());
        if let Some(new_refresh_token) = token.refresh_token() {
            tracing::debug!("new token includes refresh token");
            self.refresh_token = Some(new_refresh_token.clone());
        } else {
            tracing::trace!("new token lacks refresh token, keeping the previous one");
        }
        if let Some(granted) = token.scopes() {
            self.scopes = granted.iter().map(|s| s.as_str().to_string()).collect();
        }
        Ok(true)
    }
}

/// The JSON file a [`Credential`] is persisted to between runs.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored credential, if there is one.
    pub async fn load(&self) -> eyre::Result<Option<Credential>> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("check for token file {}", self.path.display()))?
        {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read token file {}", self.path.display()))?;
        let credential = serde_json::from_str(&json)
            .with_context(|| format!("parse token file {}", self.path.display()))?;
        Ok(Some(credential))
    }

    pub async fn save(&self, credential: &Credential) -> eyre::Result<()> {
        let json = serde_json::to_string_pretty(credential).context("serialize credential")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("write token file {}", self.path.display()))
    }
}

/// Why no credential could be obtained.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("no port in {first}..={last} was available for the OAuth redirect")]
    NoCallbackPort { first: u16, last: u16 },
    #[error("interactive authorization failed")]
    Interactive(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("could not persist the obtained credential")]
    Persist(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Produces a usable [`Credential`], from disk if possible and from the user if not.
#[derive(Debug)]
pub struct CredentialStore<E, R, B> {
    file: TokenFile,
    endpoint: E,
    receiver: R,
    browser: B,
    callback_ports: RangeInclusive<u16>,
    scopes: Vec<Scope>,
}

impl<E, R, B> CredentialStore<E, R, B>
where
    E: TokenEndpoint,
    R: AuthorizationCodeReceiver,
    B: Browser,
{
    pub fn new(config: &Config, file: TokenFile, endpoint: E, receiver: R, browser: B) -> Self {
        Self {
            file,
            endpoint,
            receiver,
            browser,
            callback_ports: config.callback_ports.clone(),
            scopes: config.scopes.clone(),
        }
    }

    /// Returns a credential whose access token is not expired.
    ///
    /// A stored credential is used as-is while it is valid and refreshed once it has expired. If
    /// there is no stored credential, or it cannot be refreshed, the user is sent through the
    /// interactive authorization flow. Any newly obtained credential is persisted before it is
    /// returned.
    pub async fn obtain(&self) -> Result<Credential, AuthFailure> {
        if let Some(mut credential) = self.load_candidate().await {
            if !credential.is_expired_at(Timestamp::now()) {
                tracing::info!("loaded credentials from token file");
                return Ok(credential);
            }

            if credential.refresh_token.is_some() {
                match credential.refresh(&self.endpoint).await {
                    Ok(true) => {
                        self.persist(&credential).await?;
                        tracing::info!("refreshed expired credentials");
                        return Ok(credential);
                    }
                    Ok(false) => {
                        tracing::warn!("stored refresh token was rejected, re-authorizing");
                    }
                    Err(e) => {
                        tracing::warn!("token refresh failed, re-authorizing: {:#}", e);
                    }
                }
            } else {
                tracing::info!("stored credentials expired and cannot be refreshed");
            }
        }

        let credential = self.authorize_interactively().await?;
        self.persist(&credential).await?;
        Ok(credential)
    }

    async fn load_candidate(&self) -> Option<Credential> {
        match self.file.load().await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!("ignoring unusable token file: {:#}", e);
                None
            }
        }
    }

    async fn persist(&self, credential: &Credential) -> Result<(), AuthFailure> {
        self.file
            .save(credential)
            .await
            .map_err(|e| AuthFailure::Persist(e.into()))?;
        tracing::debug!(path = %self.file.path().display(), "persisted credentials");
        Ok(())
    }

    /// Runs the authorization-code flow on the first callback port that can be bound.
    async fn authorize_interactively(&self) -> Result<Credential, AuthFailure> {
        let csrf = CsrfToken::new_random();
        for port in self.callback_ports.clone() {
            let pending = match self.receiver.bind(port, &csrf).await {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::warn!(port, error = %e, "port is unavailable");
                    continue;
                }
            };

            let credential = self
                .complete_authorization(pending, &csrf)
                .await
                .map_err(|e| AuthFailure::Interactive(e.into()))?;
            tracing::info!(port, "authenticated with state verification");
            return Ok(credential);
        }

        Err(AuthFailure::NoCallbackPort {
            first: *self.callback_ports.start(),
            last: *self.callback_ports.end(),
        })
    }

    async fn complete_authorization(
        &self,
        pending: R::Pending,
        csrf: &CsrfToken,
    ) -> eyre::Result<Credential> {
        let redirect = pending.redirect_url().clone();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let auth_url =
            self.endpoint
                .authorize_url(&redirect, csrf, pkce_challenge, &self.scopes)?;

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        if let Err(e) = self.browser.open(&auth_url) {
            // The URL is in the log, so the user can still open it by hand.
            tracing::warn!("could not open browser: {:#}", e);
        }

        let query = pending
            .receive()
            .await
            .context("await user authorization code")?;
        let code = verify_redirect(query, csrf)?;
        let token = self
            .endpoint
            .exchange_code(code, redirect, pkce_verifier)
            .await?;

        let credential = Credential::from_token_response(&token, &self.scopes, Timestamp::now());
        let missing = credential.missing_scopes(&self.scopes);
        if !missing.is_empty() {
            tracing::warn!(?missing, "user did not grant all requested scopes");
        }
        Ok(credential)
    }
}
