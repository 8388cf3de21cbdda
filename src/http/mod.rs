//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request id, metrics)
//!     → dispatcher.rs (pure classification into a handler kind)
//!     → submission.rs / forward.rs / websocket.rs / assets.rs
//!     → response.rs (uniform response construction)
//! ```

pub mod assets;
pub mod dispatcher;
pub mod forward;
pub mod response;
pub mod server;
pub mod submission;
pub mod websocket;

pub use dispatcher::HandlerKind;
pub use forward::{UpstreamSession, UpstreamTarget, Upstreams};
pub use server::{AppState, GatewayServer};
pub use websocket::ConnectionRegistry;
