#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parkwatch_core::{
    ApiError, CacheManager, ConnectivityFlag, DataFetcher, FeedSource, FetcherSettings,
    MemoryStore, RefreshEvent, SystemClock,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Semaphore};

pub const LOCATIONS_URL: &str = "https://feed.test/parking-data.json";
pub const CONFIG_URL: &str = "https://feed.test/app-config.json";

/// Feed double serving one fixed snapshot per URL.
pub struct MockFeed {
    calls: AtomicUsize,
    fail: AtomicBool,
    gated: AtomicBool,
    gate: Semaphore,
    panics_left: AtomicUsize,
}

impl MockFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
            panics_left: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Hold every request until `release` is called.
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn panic_on_next(&self, n: usize) {
        self.panics_left.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn fetch_json(&self, url: &str) -> Result<Value, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.gated.load(Ordering::SeqCst) {
            let _permit = self.gate.acquire().await.expect("gate closed");
        }

        let panics = self.panics_left.load(Ordering::SeqCst);
        if panics > 0 {
            self.panics_left.store(panics - 1, Ordering::SeqCst);
            panic!("simulated fetcher bug");
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::ServerError("503 Service Unavailable".to_string()));
        }

        if url == CONFIG_URL {
            Ok(config_payload())
        } else {
            Ok(locations_payload())
        }
    }
}

pub fn locations_payload() -> Value {
    json!({
        "locations": [
            {
                "id": "state-st",
                "name": "State Street",
                "address": "State St between Main and Elm",
                "coordinates": { "lat": 44.2601, "lng": -72.5754 },
                "capacity": { "total": 24, "available": 7 },
                "rules": { "timeLimit": "2 hours", "cost": "Free", "hours": "8am-6pm" },
                "type": "street",
                "lastUpdated": "2024-05-01T11:58:00Z"
            },
            {
                "id": "city-hall-lot",
                "name": "City Hall Lot",
                "address": "39 Main St",
                "coordinates": { "lat": 44.2605, "lng": -72.5760 },
                "capacity": { "total": 80, "available": 12, "reserved": 6 },
                "type": "lot",
                "lastUpdated": "2024-05-01T11:58:00Z"
            }
        ],
        "lastUpdated": "2024-05-01T11:58:00Z",
        "version": "1.0.0"
    })
}

pub fn config_payload() -> Value {
    json!({
        "config": {
            "branding": { "name": "Montpelier Parking", "primaryColor": "#1f4e79", "secondaryColor": "#f2c14e" },
            "map": { "center": { "lat": 44.2601, "lng": -72.5754 }, "zoom": 16 },
            "dataSource": { "refreshInterval": 120000 }
        },
        "version": "1.0.0"
    })
}

/// Fetcher over `feed` that always goes to the network while online.
pub fn fetcher(feed: Arc<MockFeed>, online: ConnectivityFlag) -> Arc<DataFetcher> {
    let mut settings = FetcherSettings::new(LOCATIONS_URL, CONFIG_URL);
    settings.cache_expiry = Duration::ZERO;
    Arc::new(DataFetcher::new(
        feed,
        CacheManager::new(Arc::new(MemoryStore::new())),
        Arc::new(online),
        Arc::new(SystemClock),
        settings,
    ))
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<RefreshEvent>) -> Vec<RefreshEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let spawned tasks run without moving the paused clock much.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
