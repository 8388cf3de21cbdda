//! Shared registries read and written concurrently by request workers.
//!
//! Both registries synchronize internally; callers treat them as atomic
//! read/write services and never lock around them.

pub mod accounts;
pub mod plots;

pub use accounts::{Account, AccountRegistry};
pub use plots::PlotCapacityRegistry;
