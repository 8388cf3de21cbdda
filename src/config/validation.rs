//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks semantics before a
//! config is accepted into the system. All errors are collected and
//! returned together rather than failing on the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, UpstreamConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener bind address '{0}' is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("{target} upstream URL '{url}' is invalid: {reason}")]
    InvalidUpstreamUrl {
        target: &'static str,
        url: String,
        reason: String,
    },

    #[error("{target} upstream URL '{url}' uses unsupported scheme '{scheme}' (only http is forwarded)")]
    UnsupportedUpstreamScheme {
        target: &'static str,
        url: String,
        scheme: String,
    },

    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("web root must not be empty")]
    EmptyWebRoot,

    #[error("metrics address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("submission timeout ({submission_secs}s) must be below the request timeout ({request_secs}s)")]
    SubmissionTimeoutTooLarge {
        submission_secs: u64,
        request_secs: u64,
    },
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(pool) = &config.upstreams.pool {
        check_upstream("pool", pool, &mut errors);
    }
    if let Some(wallet) = &config.upstreams.wallet {
        check_upstream("wallet", wallet, &mut errors);
    }

    if config.submission.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("submission"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request"));
    } else if config.submission.timeout_secs >= config.timeouts.request_secs {
        // A scoring wait longer than the request timeout would always be
        // cut off by the timeout layer instead of answering the miner.
        errors.push(ValidationError::SubmissionTimeoutTooLarge {
            submission_secs: config.submission.timeout_secs,
            request_secs: config.timeouts.request_secs,
        });
    }

    if config.web.root.trim().is_empty() {
        errors.push(ValidationError::EmptyWebRoot);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(target: &'static str, upstream: &UpstreamConfig, errors: &mut Vec<ValidationError>) {
    match Url::parse(&upstream.url) {
        Ok(url) => {
            if url.scheme() != "http" {
                errors.push(ValidationError::UnsupportedUpstreamScheme {
                    target,
                    url: upstream.url.clone(),
                    scheme: url.scheme().to_string(),
                });
            }
        }
        Err(e) => errors.push(ValidationError::InvalidUpstreamUrl {
            target,
            url: upstream.url.clone(),
            reason: e.to_string(),
        }),
    }
    if upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::UpstreamConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nonsense".into();
        config.web.root = "".into();
        config.submission.timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_rejects_https_upstream() {
        let mut config = GatewayConfig::default();
        config.upstreams.pool = Some(UpstreamConfig {
            url: "https://pool.example".into(),
            timeout_secs: 10,
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::UnsupportedUpstreamScheme { target: "pool", .. }
        ));
    }

    #[test]
    fn test_submission_timeout_must_fit_request_timeout() {
        let mut config = GatewayConfig::default();
        config.submission.timeout_secs = 60;
        config.timeouts.request_secs = 60;

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::SubmissionTimeoutTooLarge { .. }
        ));
    }
}
