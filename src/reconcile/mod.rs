//! Reconciliation
//!
//! The desired-state reconciler and the operation poller it hands every
//! mutating call's operation to.

pub mod poller;
pub mod reconciler;

pub use poller::*;
pub use reconciler::*;
