//! Polling refresh scheduler.
//!
//! `RefreshScheduler` drives the `DataFetcher` on a timer, allows manual
//! refreshes, and reports every cycle to a `RefreshListener`. At most one
//! cycle is in flight at any time.

pub mod listener;
pub mod scheduler;
pub mod state;

pub use listener::{ChannelListener, RefreshEvent, RefreshListener};
pub use scheduler::{RefreshScheduler, MIN_POLL_INTERVAL};
pub use state::{RefreshPhase, RefreshState};
