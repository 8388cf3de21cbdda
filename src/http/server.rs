//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Build the Axum router and middleware stack
//! - Classify every inbound request and hand it to its handler
//! - Serve plain or TLS listeners with graceful shutdown
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → dispatcher (pure classification)
//!     → { mining info | nonce router → (scoring | forward) |
//!         socket upgrade | root/asset | 400 | 404 }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::{GatewayConfig, TlsConfig};
use crate::http::assets::{self, TemplateVariables};
use crate::http::dispatcher::{self, HandlerKind};
use crate::http::forward::Upstreams;
use crate::http::response;
use crate::http::submission;
use crate::http::websocket::{self, ConnectionRegistry};
use crate::miner::{MinerState, SubmissionPipeline};
use crate::net::tls;
use crate::observability::metrics;
use crate::registry::{AccountRegistry, PlotCapacityRegistry};
use crate::wallet::WalletClient;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub miner: MinerState,
    pub pipeline: SubmissionPipeline,
    pub accounts: AccountRegistry,
    pub plots: PlotCapacityRegistry,
    pub connections: ConnectionRegistry,
    pub wallet: Arc<WalletClient>,
    pub upstreams: Upstreams,
    pub templates: Arc<TemplateVariables>,
    pub web_root: String,
    pub submission_timeout: Duration,
}

/// The gateway's HTTP server.
pub struct GatewayServer {
    router: Router,
    state: AppState,
    tls: Option<TlsConfig>,
}

impl GatewayServer {
    /// Wire up collaborators from configuration.
    pub fn new(
        config: &GatewayConfig,
        miner: MinerState,
        pipeline: SubmissionPipeline,
    ) -> Result<Self, url::ParseError> {
        let upstreams = Upstreams::from_config(&config.upstreams)?;
        let wallet = Arc::new(WalletClient::from_config(config.upstreams.wallet.as_ref())?);
        let plots = PlotCapacityRegistry::new();
        let templates = Arc::new(default_templates(miner.clone(), plots.clone()));

        let state = AppState {
            miner,
            pipeline,
            accounts: AccountRegistry::new(),
            plots,
            connections: ConnectionRegistry::default(),
            wallet,
            upstreams,
            templates,
            web_root: config.web.root.clone(),
            submission_timeout: Duration::from_secs(config.submission.timeout_secs),
        };

        let router = build_router(config, state.clone());

        Ok(Self {
            router,
            state,
            tls: config.listener.tls.clone(),
        })
    }

    /// Shared state handle, for the binary's background tasks and tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server on the given listener until shutdown.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = self.tls.is_some(), "Gateway listening");

        match &self.tls {
            Some(config) => {
                let rustls = tls::load_tls_config(
                    Path::new(&config.cert_path),
                    Path::new(&config.key_path),
                )
                .await?;
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .serve(self.router.into_make_service())
                    .await
            }
            None => {
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
            }
        }
    }
}

/// Build the Axum router with all middleware layers.
fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    Router::new()
        .route("/", any(dispatch))
        .route("/{*path}", any(dispatch))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )))
        .layer(TraceLayer::new_for_http())
}

/// Placeholders available to the index template.
fn default_templates(miner: MinerState, plots: PlotCapacityRegistry) -> TemplateVariables {
    let mut templates = TemplateVariables::new();
    templates.set("VERSION", || env!("CARGO_PKG_VERSION").to_string());
    let state = miner.clone();
    templates.set("HEIGHT", move || state.height().to_string());
    let state = miner.clone();
    templates.set("BASE_TARGET", move || {
        state.current().base_target.to_string()
    });
    let state = miner.clone();
    templates.set("GENSIG", move || {
        state.current().generation_signature.clone()
    });
    templates.set("TARGET_DEADLINE", move || {
        miner.current().target_deadline.to_string()
    });
    templates.set("CAPACITY", move || plots.total().to_string());
    templates
}

/// Main entry point for every inbound request.
async fn dispatch(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    let started = Instant::now();
    ensure_request_id(&mut request);

    let kind = dispatcher::classify(request.method(), request.uri(), request.headers());
    let method = request.method().clone();

    tracing::debug!(
        method = %method,
        uri = %request.uri(),
        handler = kind.label(),
        "Dispatching request"
    );

    let response = match kind {
        HandlerKind::MiningInfo => mining_info(&state),
        HandlerKind::SubmitNonce => submission::handle(state.clone(), request).await,
        HandlerKind::Forward(target) => match state.upstreams.create_session(target) {
            Some(session) => crate::http::forward::forward(session, request).await,
            None => {
                tracing::debug!(target = target.label(), "No upstream configured");
                response::empty(StatusCode::BAD_GATEWAY)
            }
        },
        HandlerKind::Upgrade => websocket::upgrade(state.clone(), request).await,
        HandlerKind::Root => assets::root(&state).await,
        HandlerKind::Asset => {
            let decoded = dispatcher::percent_decode(request.uri().path()).unwrap_or_default();
            assets::asset(&state, &decoded).await
        }
        HandlerKind::BadRequest => response::bad_request(),
        HandlerKind::NotFound => response::empty(StatusCode::NOT_FOUND),
    };

    metrics::record_request(
        method.as_str(),
        response.status().as_u16(),
        kind.label(),
        started,
    );
    response
}

/// Current block snapshot, with an explicit content length.
fn mining_info(state: &AppState) -> Response {
    let json = state.miner.current().to_json();
    response::sized_ok(json.into_bytes(), Some("application/json"))
}

fn ensure_request_id(request: &mut Request<Body>) {
    if request.headers().contains_key(&X_REQUEST_ID) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
        request.headers_mut().insert(X_REQUEST_ID, value);
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Could not install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
