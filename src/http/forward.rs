//! Upstream forwarding.
//!
//! # Responsibilities
//! - Open a single-use session to the pool or wallet node
//! - Replay the inbound request against it verbatim
//! - Relay the upstream body back byte for byte with an explicit length
//!
//! # Design Decisions
//! - A session is consumed by value; one forward per session, no reuse
//! - The whole upstream body is collected before answering, matching the
//!   explicit content-length contract downstream miners rely on
//! - Transport failures are logged with the original URI and swallowed;
//!   the caller gets a bare status and the serving loop keeps running

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode, Uri};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::config::UpstreamsConfig;
use crate::http::response;
use crate::observability::metrics;

/// Largest upstream body the gateway will relay.
const MAX_RELAY_BODY: usize = 8 * 1024 * 1024;

/// The two nodes this gateway can relay to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamTarget {
    Pool,
    Wallet,
}

impl UpstreamTarget {
    pub fn label(&self) -> &'static str {
        match self {
            UpstreamTarget::Pool => "pool",
            UpstreamTarget::Wallet => "wallet",
        }
    }
}

/// One endpoint the gateway knows how to reach.
#[derive(Debug, Clone)]
struct Endpoint {
    base: Url,
    authority: String,
    timeout: Duration,
}

/// Session factory for the configured upstreams.
#[derive(Debug, Clone, Default)]
pub struct Upstreams {
    pool: Option<Endpoint>,
    wallet: Option<Endpoint>,
}

impl Upstreams {
    /// Resolve configured endpoints. URLs were already validated; a parse
    /// failure here still surfaces as an error instead of a panic.
    pub fn from_config(config: &UpstreamsConfig) -> Result<Self, url::ParseError> {
        let mut upstreams = Self::default();
        if let Some(pool) = &config.pool {
            upstreams.pool = Some(Endpoint::parse(&pool.url, pool.timeout_secs)?);
        }
        if let Some(wallet) = &config.wallet {
            upstreams.wallet = Some(Endpoint::parse(&wallet.url, wallet.timeout_secs)?);
        }
        Ok(upstreams)
    }

    /// Open a fresh single-use session, or `None` when the target is not
    /// configured.
    pub fn create_session(&self, target: UpstreamTarget) -> Option<UpstreamSession> {
        let endpoint = match target {
            UpstreamTarget::Pool => self.pool.as_ref(),
            UpstreamTarget::Wallet => self.wallet.as_ref(),
        }?;
        Some(UpstreamSession {
            target,
            endpoint: endpoint.clone(),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        })
    }
}

impl Endpoint {
    fn parse(url: &str, timeout_secs: u64) -> Result<Self, url::ParseError> {
        let base = Url::parse(url)?;
        let host = base.host_str().ok_or(url::ParseError::EmptyHost)?;
        let authority = match base.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok(Self {
            base,
            authority,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// An established outbound connection handle, valid for exactly one
/// request/response cycle.
pub struct UpstreamSession {
    target: UpstreamTarget,
    endpoint: Endpoint,
    client: Client<HttpConnector, Body>,
}

impl UpstreamSession {
    pub fn target(&self) -> UpstreamTarget {
        self.target
    }
}

/// Replay the inbound request against the session's upstream and relay the
/// response body back to the original caller.
///
/// Consumes the session. Any failure along the way is logged together with
/// the request URI and answered with a bare 502.
pub async fn forward(session: UpstreamSession, request: Request<Body>) -> Response {
    let started = Instant::now();
    let target = session.target;
    let uri = request.uri().clone();

    tracing::info!(uri = %uri, target = target.label(), "Forwarding request");

    match relay(session, request).await {
        Ok(body) if !body.is_empty() => {
            tracing::debug!(
                uri = %uri,
                bytes = body.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Upstream answered"
            );
            metrics::record_forward(target.label(), "ok");
            response::sized_ok(body, None)
        }
        Ok(_) => {
            tracing::error!(uri = %uri, target = target.label(), "Upstream sent no body");
            metrics::record_forward(target.label(), "empty");
            response::empty(StatusCode::BAD_GATEWAY)
        }
        Err(failure) => {
            tracing::error!(
                uri = %uri,
                target = target.label(),
                error = %failure,
                "Could not forward request"
            );
            metrics::record_forward(target.label(), "error");
            response::empty(StatusCode::BAD_GATEWAY)
        }
    }
}

async fn relay(session: UpstreamSession, request: Request<Body>) -> Result<Vec<u8>, String> {
    let (parts, body) = request.into_parts();

    let body = axum::body::to_bytes(body, MAX_RELAY_BODY)
        .await
        .map_err(|e| format!("could not read request body: {}", e))?;

    let uri = rewrite_uri(&session.endpoint, &parts.uri)?;
    let mut outbound = Request::builder().method(parts.method.clone()).uri(uri);

    if let Some(headers) = outbound.headers_mut() {
        for (name, value) in parts.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        // The connection is ours, not the peer's.
        match HeaderValue::from_str(&session.endpoint.authority) {
            Ok(authority) => {
                headers.insert(header::HOST, authority);
            }
            Err(_) => {
                headers.remove(header::HOST);
            }
        }
    }

    let outbound = outbound
        .body(Body::from(body))
        .map_err(|e| format!("could not build upstream request: {}", e))?;

    let response = tokio::time::timeout(session.endpoint.timeout, session.client.request(outbound))
        .await
        .map_err(|_| {
            format!(
                "upstream timed out after {}s",
                session.endpoint.timeout.as_secs()
            )
        })?
        .map_err(|e| e.to_string())?;

    let data = tokio::time::timeout(
        session.endpoint.timeout,
        axum::body::to_bytes(Body::new(response.into_body()), MAX_RELAY_BODY),
    )
    .await
    .map_err(|_| "upstream body timed out".to_string())?
    .map_err(|e| format!("could not read upstream body: {}", e))?;

    Ok(data.to_vec())
}

fn rewrite_uri(endpoint: &Endpoint, inbound: &Uri) -> Result<Uri, String> {
    let path_and_query = inbound
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!(
        "{}://{}{}",
        endpoint.base.scheme(),
        endpoint.authority,
        path_and_query
    )
    .parse()
    .map_err(|e| format!("could not build upstream URI: {}", e))
}
