//! HTTP client module for the parking and config feeds.
//!
//! This module provides the `FeedSource` seam and its production
//! implementation `FeedClient`. The fetcher only ever sees parsed JSON
//! values; validation happens one layer up.

pub mod client;
pub mod error;

pub use client::{FeedClient, FeedSource};
pub use error::ApiError;
