//! Device connectivity signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Answers "is the device online right now".
///
/// Only used to choose between the cache-only path and a network attempt;
/// a `true` answer is no guarantee a request will succeed.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// A shared, toggleable online flag.
///
/// Clones observe the same flag, so the composing application can keep one
/// handle and flip it while the fetcher holds another.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
    online: Arc<AtomicBool>,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityProbe for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
