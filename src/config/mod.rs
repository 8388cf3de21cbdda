//! Configuration subsystem.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    GatewayConfig, ListenerConfig, MiningConfig, ObservabilityConfig, SubmissionConfig,
    TimeoutConfig, TlsConfig, UpstreamConfig, UpstreamsConfig, WebConfig,
};
pub use validation::{validate_config, ValidationError};
