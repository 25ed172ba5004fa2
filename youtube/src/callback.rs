//! Receiving the OAuth redirect.
//!
//! The interactive flow needs two things from the outside world: somewhere for the authorization
//! server to redirect the user's browser to, and a way to send the user to the consent page in
//! the first place. Both are traits so the flow can be exercised without a browser or a socket.

use eyre::Context;
use http_body_util::Full;
use hyper::body::{self, Bytes};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use oauth2::url::Url;
use oauth2::{CsrfToken, RedirectUrl};
use std::convert::Infallible;
use tokio::sync::{mpsc, oneshot, watch};

/// The query parameters of an OAuth redirect, as presented by the browser.
///
/// Nothing here is validated; see [`crate::oauth::verify_redirect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    /// Space-separated list of granted scopes.
    pub scope: Option<String>,
    /// Set instead of `code` when the user declined.
    pub error: Option<String>,
}

impl RedirectQuery {
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            match &*k {
                "state" => parsed.state = Some(v.into_owned()),
                "code" => parsed.code = Some(v.into_owned()),
                "scope" => parsed.scope = Some(v.into_owned()),
                "error" => parsed.error = Some(v.into_owned()),
                _ => {}
            }
        }
        parsed
    }

    fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// A listener for the OAuth redirect that can be bound to a specific local port.
#[allow(async_fn_in_trait)]
pub trait AuthorizationCodeReceiver {
    type Pending: PendingRedirect;

    /// Starts listening on `port` for a redirect that should echo `state`.
    ///
    /// Fails if the port is unavailable, in which case the caller may try another one.
    async fn bind(&self, port: u16, state: &CsrfToken) -> std::io::Result<Self::Pending>;
}

/// A bound listener waiting for the browser to arrive.
#[allow(async_fn_in_trait)]
pub trait PendingRedirect {
    /// The URL the authorization server should redirect to.
    fn redirect_url(&self) -> &RedirectUrl;

    /// Waits for the redirect and returns its query parameters.
    async fn receive(self) -> eyre::Result<RedirectQuery>;
}

/// Sends the user to the consent page.
pub trait Browser {
    fn open(&self, url: &Url) -> eyre::Result<()>;
}

/// Opens URLs in the user's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &Url) -> eyre::Result<()> {
        webbrowser::open(url.as_str()).context("open user's browser")
    }
}

/// Receives the redirect with a one-shot HTTP server on 127.0.0.1.
///
/// The server stops accepting once the first callback arrives, and every connection it opened is
/// then shut down gracefully.
#[derive(Debug, Clone, Copy)]
pub struct LoopbackReceiver {
    done_html: &'static str,
}

impl LoopbackReceiver {
    /// `done_html` is shown to the user once a redirect carrying the expected state has been
    /// received.
    pub fn new(done_html: &'static str) -> Self {
        Self { done_html }
    }
}

pub struct LoopbackRedirect {
    url: RedirectUrl,
    received: oneshot::Receiver<eyre::Result<RedirectQuery>>,
}

impl AuthorizationCodeReceiver for LoopbackReceiver {
    type Pending = LoopbackRedirect;

    async fn bind(&self, port: u16, state: &CsrfToken) -> std::io::Result<LoopbackRedirect> {
        let socket = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = socket.local_addr()?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .map_err(std::io::Error::other)?;

        let (tx, rx) = oneshot::channel();
        let pages = Pages {
            done_html: self.done_html,
            expected_state: state.secret().clone(),
        };
        tokio::spawn(async move {
            let (shutdown, shutdown_rx) = watch::channel(());
            let mut connections = tokio::task::JoinSet::new();
            let r: eyre::Result<RedirectQuery> = async {
                let socket = socket;
                let (got, mut gotten) = mpsc::channel(1);
                // Browsers open speculative connections and ask for favicons, so every connection
                // is served on its own until one of them carries the actual callback.
                loop {
                    tokio::select! {
                        accepted = socket.accept() => {
                            let (conn, _) = accepted.context("accept")?;
                            connections.spawn(serve_connection(
                                conn,
                                got.clone(),
                                pages.clone(),
                                shutdown_rx.clone(),
                            ));
                        }
                        Some(query) = gotten.recv() => return Ok(query),
                    }
                }
            }
            .await;
            let _ = tx.send(r);

            let _ = shutdown.send(());
            while connections.join_next().await.is_some() {}
        });

        Ok(LoopbackRedirect { url, received: rx })
    }
}

/// What the browser is shown, depending on the redirect it followed.
#[derive(Debug, Clone)]
struct Pages {
    done_html: &'static str,
    expected_state: String,
}

impl Pages {
    fn respond(&self, query: &RedirectQuery) -> Response<Full<Bytes>> {
        let (status, page) = if query.error.is_some() {
            (
                StatusCode::OK,
                "Authorization was not granted. You can close this tab.",
            )
        } else if query.state.as_deref() != Some(self.expected_state.as_str()) {
            (
                StatusCode::BAD_REQUEST,
                "Authorization could not be verified. You can close this tab.",
            )
        } else {
            (StatusCode::OK, self.done_html)
        };
        let mut response = Response::new(Full::<Bytes>::from(page));
        *response.status_mut() = status;
        response
    }
}

async fn serve_connection(
    conn: tokio::net::TcpStream,
    got: mpsc::Sender<RedirectQuery>,
    pages: Pages,
    mut shutdown: watch::Receiver<()>,
) {
    let conn = hyper_util::rt::TokioIo::new(conn);
    let service = service_fn(move |req: Request<body::Incoming>| {
        let got = got.clone();
        let query = RedirectQuery::parse(req.uri().query().unwrap_or(""));
        let response = if query.is_callback() {
            Some(pages.respond(&query))
        } else {
            None
        };
        async move {
            let Some(response) = response else {
                let mut not_found = Response::new(Full::<Bytes>::from("not found"));
                *not_found.status_mut() = StatusCode::NOT_FOUND;
                return Ok::<_, Infallible>(not_found);
            };
            // Verification of the state is left to the caller, which fails the flow on mismatch.
            let _ = got.send(query).await;
            Ok(response)
        }
    });

    let serve = hyper::server::conn::http1::Builder::new().serve_connection(conn, service);
    tokio::pin!(serve);
    let r = tokio::select! {
        r = serve.as_mut() => r,
        _ = shutdown.changed() => {
            serve.as_mut().graceful_shutdown();
            serve.await
        }
    };
    if let Err(e) = r {
        tracing::debug!(error = %e, "redirect server got bad request");
    }
}

impl PendingRedirect for LoopbackRedirect {
    fn redirect_url(&self) -> &RedirectUrl {
        &self.url
    }

    async fn receive(self) -> eyre::Result<RedirectQuery> {
        self.received
            .await
            .context("redirect future dropped prematurely")?
    }
}
