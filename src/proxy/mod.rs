//! Reverse proxy with a browser refresh channel.
//!
//! Fronts the supervised application: requests are forwarded to
//! `127.0.0.1:app_port` with a retrying client, HTML responses get the
//! embedded refresh listener spliced in, and `/eavesdrop_sse` serves the
//! event stream that tells connected browsers to reload.

mod hub;
mod inject;

pub use hub::{RefreshHandle, RefreshHub, Subscription};
pub use inject::inject_sse;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Version, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::config::ProxyConfig;
use crate::embed::{SSE_EVENT, SSE_PATH};
use crate::{debug, log};

/// Forward attempts before giving up with 502 Bad Gateway.
const FORWARD_RETRIES: u32 = 10;

/// Constant backoff between forward attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Drain window for graceful close.
const CLOSE_DELAY: Duration = Duration::from_secs(5);

/// Shared request-handler state.
struct ProxyState {
    hub: Arc<RefreshHub>,
    client: reqwest::Client,
    app_port: u16,
}

/// Running proxy server.
pub struct Proxy {
    hub: Arc<RefreshHub>,
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    serve_handle: JoinHandle<()>,
}

impl Proxy {
    /// Bind the proxy and spawn its accept loop.
    pub async fn bind(config: &ProxyConfig) -> anyhow::Result<Self> {
        let hub = Arc::new(RefreshHub::default());

        // Redirects are relayed to the browser, never followed here
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let state = Arc::new(ProxyState {
            hub: Arc::clone(&hub),
            client,
            app_port: config.app_port,
        });

        let app = Router::new()
            .route(SSE_PATH, get(subscribe_sse))
            .fallback(forward)
            .with_state(state);

        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.proxy_port))).await?;
        let addr = listener.local_addr()?;
        log!("proxy"; "listening on http://{addr} for http://127.0.0.1:{}", config.app_port);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serve_handle = tokio::spawn(async move {
            let server = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            if let Err(err) = server.await {
                log!("error"; "proxy server failed: {err}");
            }
        });

        Ok(Self {
            hub,
            addr,
            shutdown_tx,
            serve_handle,
        })
    }

    /// The bound address (useful when the config asked for port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Non-owning refresh endpoint handed to reactors.
    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle::new(&self.hub)
    }

    /// Shut the server down, draining connections for a bounded time.
    ///
    /// Open SSE streams never finish on their own, so the drain routinely
    /// times out and the serve task is aborted.
    pub async fn close(self) {
        let Self {
            shutdown_tx,
            mut serve_handle,
            ..
        } = self;

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(CLOSE_DELAY, &mut serve_handle).await.is_err() {
            debug!("proxy"; "drain timed out, forcing close");
            serve_handle.abort();
        }
    }
}

/// `GET /eavesdrop_sse` — the refresh event stream.
async fn subscribe_sse(State(state): State<Arc<ProxyState>>) -> Response {
    let events = Subscription::register(&state.hub)
        .map(|_| Ok::<_, std::convert::Infallible>(Bytes::from_static(SSE_EVENT)));

    let mut response = Response::new(Body::from_stream(events));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Fallback route — forward everything else to the application.
async fn forward(
    State(state): State<Arc<ProxyState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let (parts, body) = req.into_parts();

    // Buffer the body once so retries can replay it
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            log!("error"; "proxy error: {err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://127.0.0.1:{}{path_and_query}", state.app_port);

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let via = format!("{} {host}", proto(parts.version));

    let mut headers = parts.headers.clone();
    headers.remove(header::HOST);
    if let Ok(value) = HeaderValue::from_str(&peer.to_string()) {
        headers.insert("x-forwarded-for", value);
    }
    if let Ok(value) = HeaderValue::from_str(&via) {
        headers.insert(header::VIA, value);
    }

    let upstream = match send_with_retry(&state.client, parts.method, &url, &headers, body).await {
        Ok(upstream) => upstream,
        Err(err) => {
            log!("error"; "proxy error: {err}");
            return (StatusCode::BAD_GATEWAY, err.to_string()).into_response();
        }
    };

    relay_response(upstream, &via).await
}

/// Forward the request with constant-backoff retries.
async fn send_with_retry(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> reqwest::Result<reqwest::Response> {
    let mut attempt = 0;
    loop {
        let result = client
            .request(method.clone(), url)
            .headers(headers.clone())
            .body(body.clone())
            .send()
            .await;

        match result {
            Ok(upstream) => return Ok(upstream),
            Err(err) => {
                attempt += 1;
                if attempt == FORWARD_RETRIES {
                    return Err(err);
                }
                debug!("proxy"; "forward attempt {attempt} failed: {err}");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }
    }
}

/// Relay the upstream response, injecting the refresh script into HTML.
async fn relay_response(upstream: reqwest::Response, via: &str) -> Response {
    let status = upstream.status();
    let is_html = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.contains("text/html"));
    let content_length = upstream.headers().get(header::CONTENT_LENGTH).cloned();

    // Content-Length is recomputed after injection, so never copied
    let mut headers = HeaderMap::new();
    for (key, value) in upstream.headers() {
        if *key == header::CONTENT_LENGTH || *key == header::TRANSFER_ENCODING {
            continue;
        }
        headers.append(key.clone(), value.clone());
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    if let Ok(value) = HeaderValue::from_str(via) {
        headers.insert(header::VIA, value);
    }

    let body = if is_html {
        match upstream.bytes().await {
            Ok(bytes) => Body::from(inject_sse(&bytes)),
            Err(err) => {
                log!("error"; "proxy error: {err}");
                return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
            }
        }
    } else {
        // Stream through unchanged, keeping the upstream length
        if let Some(length) = content_length {
            headers.insert(header::CONTENT_LENGTH, length);
        }
        Body::from_stream(upstream.bytes_stream())
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn proto(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP",
    }
}
