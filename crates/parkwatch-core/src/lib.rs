//! Core library for parkwatch.
//!
//! Keeps a validated, cache-backed view of a town's public parking feed and
//! its deployment config, refreshed on a schedule:
//!
//! - `api`: `FeedSource` seam and the reqwest-backed `FeedClient`
//! - `validation`: reject-all structural checks for both feeds
//! - `cache`: `CachedEntry` snapshots in a `KeyValueStore`
//! - `fetcher`: online/offline/retry/fallback policy (`DataFetcher`)
//! - `refresh`: polling `RefreshScheduler` and its listener interface
//! - `config`: user settings with environment overrides

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod fetcher;
pub mod models;
pub mod refresh;
pub mod validation;

pub use api::{ApiError, FeedClient, FeedSource};
pub use cache::{CacheManager, CacheStatus, CachedEntry, FileStore, KeyValueStore, MemoryStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Settings;
pub use connectivity::{ConnectivityFlag, ConnectivityProbe};
pub use fetcher::{DataFetcher, FetchError, FetcherSettings};
pub use models::{AppConfig, ParkingLocation, ParkingType};
pub use refresh::{
    ChannelListener, RefreshEvent, RefreshListener, RefreshPhase, RefreshScheduler, RefreshState,
};
pub use validation::ValidationError;
