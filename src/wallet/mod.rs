//! Outbound wallet queries.
//!
//! The wallet is an optional collaborator: every lookup degrades to "not
//! known" when it is unconfigured or unreachable, and nothing in the
//! request path ever waits on it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::websocket::ConnectionRegistry;
use crate::miner::MinerState;
use crate::registry::{Account, AccountRegistry};

/// Errors from wallet lookups.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet is not configured")]
    Disabled,

    #[error("wallet request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed wallet response: {0}")]
    Malformed(String),
}

/// Client for the wallet node's HTTP API.
#[derive(Debug, Clone)]
pub struct WalletClient {
    endpoint: Option<Url>,
    client: reqwest::Client,
}

impl WalletClient {
    /// Build a client from configuration. `None` yields an inactive client
    /// whose lookups all fail with [`WalletError::Disabled`].
    pub fn from_config(config: Option<&UpstreamConfig>) -> Result<Self, url::ParseError> {
        let endpoint = match config {
            Some(upstream) => Some(Url::parse(&upstream.url)?),
            None => None,
        };
        let timeout = config.map(|c| c.timeout_secs).unwrap_or(10);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .unwrap_or_default();
        Ok(Self { endpoint, client })
    }

    /// True when a wallet endpoint is configured.
    pub fn is_active(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Account id of the block winner, if the wallet knows the block.
    pub async fn get_winner_of_block(&self, height: u64) -> Result<Option<u64>, WalletError> {
        let response = self
            .request(&[
                ("requestType", "getBlock"),
                ("height", &height.to_string()),
            ])
            .await?;
        Ok(u64_field(&response, "generator"))
    }

    /// Registered name of an account, if any.
    pub async fn get_account_name(&self, account: u64) -> Result<Option<String>, WalletError> {
        let response = self
            .request(&[
                ("requestType", "getAccount"),
                ("account", &account.to_string()),
            ])
            .await?;
        Ok(response
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string))
    }

    /// Reward recipient configured for an account.
    pub async fn get_reward_recipient(&self, account: u64) -> Result<Option<u64>, WalletError> {
        let response = self
            .request(&[
                ("requestType", "getRewardRecipient"),
                ("account", &account.to_string()),
            ])
            .await?;
        Ok(u64_field(&response, "rewardRecipient"))
    }

    /// Height of the newest block the wallet has.
    pub async fn get_last_block(&self) -> Result<Option<u64>, WalletError> {
        let response = self.request(&[("requestType", "getBlock")]).await?;
        Ok(u64_field(&response, "height"))
    }

    async fn request(&self, query: &[(&str, &str)]) -> Result<Value, WalletError> {
        let endpoint = self.endpoint.as_ref().ok_or(WalletError::Disabled)?;
        let url = endpoint
            .join("burst")
            .map_err(|e| WalletError::Malformed(e.to_string()))?;

        let response = self.client.get(url).query(query).send().await?;
        let body: Value = response.json().await?;

        if let Some(description) = body.get("errorDescription").and_then(Value::as_str) {
            return Err(WalletError::Malformed(description.to_string()));
        }
        Ok(body)
    }
}

/// Read a u64 that the wallet may encode as a number or a decimal string.
fn u64_field(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Poll the wallet for new blocks, advancing the mining state, pushing the
/// fresh snapshot to connected sockets and caching the winner's name.
pub fn spawn_block_watcher(
    wallet: Arc<WalletClient>,
    state: MinerState,
    accounts: AccountRegistry,
    connections: ConnectionRegistry,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !wallet.is_active() {
            tracing::info!("No wallet configured, block watcher idle");
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            match wallet.get_last_block().await {
                Ok(Some(height)) if height > state.height() => {
                    let previous = state.height();
                    state.advance_to_height(height);
                    tracing::info!(height, "New block");
                    connections.publish(state.current().to_json());
                    announce_winner(&wallet, &accounts, previous).await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Block poll failed");
                }
            }
        }
    })
}

/// Log who won the block that just closed and remember the name.
async fn announce_winner(wallet: &WalletClient, accounts: &AccountRegistry, height: u64) {
    let winner = match wallet.get_winner_of_block(height).await {
        Ok(Some(winner)) => winner,
        Ok(None) => return,
        Err(e) => {
            tracing::debug!(height, error = %e, "Winner lookup failed");
            return;
        }
    };

    let account = match wallet.get_account_name(winner).await {
        Ok(Some(name)) => Account::with_name(winner, name),
        _ => Account::new(winner),
    };
    tracing::info!(height, winner = %account.display_name(), "Block winner");
    accounts.insert(account);
}
