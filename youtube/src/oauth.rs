//! OAuth 2.0 against Google's authorization server.
//!
//! This module knows how to talk to the authorization and token endpoints: building the consent
//! URL, exchanging an authorization code, and exchanging a refresh token. Deciding *when* to do
//! which lives in [`crate::credential::CredentialStore`].

use crate::callback::RedirectQuery;
use eyre::Context;
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenUrl, reqwest,
};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client credentials for an installed application.
///
/// Deserialized from the `client_secret.json` file that the Google Cloud console hands out, which
/// wraps these fields in either an `installed` or a `web` object.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
enum ClientSecretsFile {
    #[serde(rename = "installed")]
    Installed(ClientSecrets),
    #[serde(rename = "web")]
    Web(ClientSecrets),
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        let file: ClientSecretsFile =
            serde_json::from_str(json).context("parse OAuth client secrets")?;
        Ok(match file {
            ClientSecretsFile::Installed(secrets) | ClientSecretsFile::Web(secrets) => secrets,
        })
    }

    pub async fn from_file(path: &Path) -> eyre::Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read OAuth client secrets from {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// The operations the credential lifecycle needs from an OAuth authorization server.
#[allow(async_fn_in_trait)]
pub trait TokenEndpoint {
    /// Builds the URL the user visits to grant access.
    ///
    /// The server echoes `csrf` back as the `state` parameter of the redirect to `redirect`.
    fn authorize_url(
        &self,
        redirect: &RedirectUrl,
        csrf: &CsrfToken,
        pkce_challenge: PkceCodeChallenge,
        scopes: &[Scope],
    ) -> eyre::Result<Url>;

    /// Exchanges an authorization code for a token.
    async fn exchange_code(
        &self,
        code: AuthorizationCode,
        redirect: RedirectUrl,
        pkce_verifier: PkceCodeVerifier,
    ) -> eyre::Result<BasicTokenResponse>;

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_token))` - Refresh succeeded
    /// * `Ok(None)` - The server no longer accepts this refresh token
    /// * `Err(_)` - Network or other error occurred during the refresh attempt
    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
    ) -> eyre::Result<Option<BasicTokenResponse>>;
}

/// Talks to Google's OAuth endpoints on behalf of one OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    secrets: ClientSecrets,
    http_client: reqwest::Client,
}

impl OAuthManager {
    pub fn new(secrets: ClientSecrets) -> eyre::Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build OAuth HTTP client")?;
        Ok(Self {
            secrets,
            http_client,
        })
    }

    fn client_id(&self) -> ClientId {
        ClientId::new(self.secrets.client_id.clone())
    }

    fn client_secret(&self) -> ClientSecret {
        ClientSecret::new(self.secrets.client_secret.clone())
    }

    fn token_url(&self) -> eyre::Result<TokenUrl> {
        TokenUrl::new(self.secrets.token_uri.clone()).context("parse token endpoint URL")
    }
}

impl TokenEndpoint for OAuthManager {
    fn authorize_url(
        &self,
        redirect: &RedirectUrl,
        csrf: &CsrfToken,
        pkce_challenge: PkceCodeChallenge,
        scopes: &[Scope],
    ) -> eyre::Result<Url> {
        let auth_url = AuthUrl::new(self.secrets.auth_uri.clone())
            .context("parse authorization endpoint URL")?;
        let client = BasicClient::new(self.client_id())
            .set_client_secret(self.client_secret())
            .set_auth_uri(auth_url)
            .set_redirect_uri(redirect.clone());

        let csrf = csrf.clone();
        let (url, _csrf) = client
            .authorize_url(move || csrf)
            .add_scopes(scopes.iter().cloned())
            // Without these Google only hands out a refresh token on the very first consent.
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: AuthorizationCode,
        redirect: RedirectUrl,
        pkce_verifier: PkceCodeVerifier,
    ) -> eyre::Result<BasicTokenResponse> {
        let client = BasicClient::new(self.client_id())
            .set_client_secret(self.client_secret())
            .set_token_uri(self.token_url()?)
            .set_redirect_uri(redirect);

        client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .context("exchange authorization code with access token")
    }

    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        tracing::debug!("attempting to refresh OAuth token");

        let client = BasicClient::new(self.client_id())
            .set_client_secret(self.client_secret())
            .set_token_uri(self.token_url()?);

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&self.http_client)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ RequestTokenError::ServerResponse(ref sr))
                if matches!(sr.error(), BasicErrorResponseType::InvalidGrant) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }
}

/// Checks that a redirect carries our anti-forgery state and extracts the authorization code.
pub fn verify_redirect(query: RedirectQuery, csrf: &CsrfToken) -> eyre::Result<AuthorizationCode> {
    if query.state.as_deref() != Some(csrf.secret().as_str()) {
        eyre::bail!("OAuth redirect carried an invalid csrf token");
    }
    if let Some(error) = query.error {
        eyre::bail!("authorization was not granted: {error}");
    }
    let Some(code) = query.code else {
        eyre::bail!("no authorization code found in OAuth redirect");
    };
    Ok(AuthorizationCode::new(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn redirect(state: Option<&str>, code: Option<&str>, error: Option<&str>) -> RedirectQuery {
        RedirectQuery {
            state: state.map(str::to_string),
            code: code.map(str::to_string),
            scope: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn parses_installed_client_secrets() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed": {
                "client_id": "123.apps.googleusercontent.com",
                "project_id": "acvb-metrics",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "client_secret": "GOCSPX-secret",
                "redirect_uris": ["http://localhost"]
            }}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "123.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "GOCSPX-secret");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn web_client_secrets_fall_back_to_default_endpoints() {
        let secrets =
            ClientSecrets::from_json(r#"{"web": {"client_id": "id", "client_secret": "s"}}"#)
                .unwrap();
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn rejects_unknown_client_secrets_shape() {
        assert!(ClientSecrets::from_json(r#"{"client_id": "id"}"#).is_err());
    }

    #[test]
    fn authorize_url_carries_state_scopes_and_offline_access() {
        let manager = OAuthManager::new(ClientSecrets {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        })
        .unwrap();
        let csrf = CsrfToken::new("state-123".to_string());
        let redirect = RedirectUrl::new("http://127.0.0.1:8081".to_string()).unwrap();
        let (challenge, _verifier) = PkceCodeChallenge::new_random_sha256();
        let scopes = [Scope::new(
            crate::config::YOUTUBE_READONLY_SCOPE.to_string(),
        )];

        let url = manager
            .authorize_url(&redirect, &csrf, challenge, &scopes)
            .unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["state"], "state-123");
        assert_eq!(params["client_id"], "client");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:8081");
        assert_eq!(params["scope"], crate::config::YOUTUBE_READONLY_SCOPE);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["code_challenge_method"], "S256");
    }

    #[test]
    fn accepts_redirect_with_matching_state() {
        let csrf = CsrfToken::new("expected".to_string());
        let code = verify_redirect(redirect(Some("expected"), Some("the-code"), None), &csrf)
            .unwrap();
        assert_eq!(code.secret(), "the-code");
    }

    #[test]
    fn rejects_forged_or_missing_state() {
        let csrf = CsrfToken::new("expected".to_string());
        assert!(verify_redirect(redirect(Some("forged"), Some("code"), None), &csrf).is_err());
        assert!(verify_redirect(redirect(None, Some("code"), None), &csrf).is_err());
    }

    #[test]
    fn rejects_denied_consent_and_missing_code() {
        let csrf = CsrfToken::new("expected".to_string());
        let denied = verify_redirect(
            redirect(Some("expected"), None, Some("access_denied")),
            &csrf,
        )
        .unwrap_err();
        assert!(denied.to_string().contains("access_denied"));
        assert!(verify_redirect(redirect(Some("expected"), None, None), &csrf).is_err());
    }
}
