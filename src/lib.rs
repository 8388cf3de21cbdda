//! HTTP(S) front door of a proof-of-capacity mining client.
//!
//! The gateway answers a small set of local endpoints (current mining
//! info, the web UI), reacts to nonce submissions from downstream miners,
//! and transparently relays everything else to an upstream pool or wallet
//! node. Incomplete submissions are repurposed as capacity announcements
//! before they are forwarded.

pub mod config;
pub mod http;
pub mod miner;
pub mod net;
pub mod observability;
pub mod registry;
pub mod wallet;

pub use config::GatewayConfig;
pub use http::{AppState, GatewayServer};
pub use miner::{MinerState, MiningInfo, SubmissionPipeline};
