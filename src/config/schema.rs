//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the mining gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Upstream node endpoints (pool and wallet).
    pub upstreams: UpstreamsConfig,

    /// Nonce submission settings.
    pub submission: SubmissionConfig,

    /// Web UI settings.
    pub web: WebConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Initial mining state served before the first block update.
    pub mining: MiningConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8124").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8124".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream endpoints the gateway relays to.
///
/// Either side may be absent. A missing pool means capacity announcements
/// are dropped with a log line; a missing wallet disables wallet lookups
/// and wallet-bound relaying.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// Pool node that receives forwarded submissions.
    pub pool: Option<UpstreamConfig>,

    /// Wallet node used for relayed requests and account lookups.
    pub wallet: Option<UpstreamConfig>,
}

/// A single upstream endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL of the upstream (e.g., "http://pool.example:8124").
    pub url: String,

    /// Round-trip timeout in seconds for one forwarded request.
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_timeout() -> u64 {
    10
}

/// Nonce submission settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Maximum time to wait for the scoring pipeline before a submission
    /// is answered with a synthesized failure body.
    pub timeout_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Web UI settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// Directory served for the root page and static assets.
    pub root: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            root: "public".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Initial mining state.
///
/// Served from `getMiningInfo` until the block watcher or the miner core
/// swaps in fresher values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Base target of the current block.
    pub base_target: u64,

    /// Generation signature of the current block (hex).
    pub generation_signature: String,

    /// Block height to start from.
    pub height: u64,

    /// Deadline ceiling announced to downstream miners, in seconds.
    pub target_deadline: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            // Genesis base target; replaced on the first block update.
            base_target: 18_325_193_796,
            generation_signature: String::new(),
            height: 0,
            target_deadline: 86_400,
        }
    }
}
