use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{AppConfig, ParkingLocation};

use super::RefreshState;

/// Receives the outcome of each refresh cycle.
///
/// Called synchronously from the cycle: data and config first, then the
/// state change. On a failed cycle `on_error` replaces the data callbacks.
pub trait RefreshListener: Send + Sync {
    fn on_data_update(&self, _locations: &[ParkingLocation]) {}

    fn on_config_update(&self, _config: Option<&AppConfig>) {}

    fn on_state_change(&self, _state: &RefreshState) {}

    fn on_error(&self, _message: &str) {}
}

/// Events forwarded by `ChannelListener`, in callback order.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Data(Vec<ParkingLocation>),
    Config(Option<AppConfig>),
    State(RefreshState),
    Error(String),
}

/// Forwards every callback into an unbounded channel.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<RefreshEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RefreshEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: RefreshEvent) {
        if self.tx.send(event).is_err() {
            debug!("Refresh event dropped - receiver closed");
        }
    }
}

impl RefreshListener for ChannelListener {
    fn on_data_update(&self, locations: &[ParkingLocation]) {
        self.send(RefreshEvent::Data(locations.to_vec()));
    }

    fn on_config_update(&self, config: Option<&AppConfig>) {
        self.send(RefreshEvent::Config(config.cloned()));
    }

    fn on_state_change(&self, state: &RefreshState) {
        self.send(RefreshEvent::State(state.clone()));
    }

    fn on_error(&self, message: &str) {
        self.send(RefreshEvent::Error(message.to_string()));
    }
}
