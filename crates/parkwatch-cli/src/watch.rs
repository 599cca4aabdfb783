//! The `watch` command: poll until Ctrl-C, printing every update.

use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use parkwatch_core::{
    AppConfig, ChannelListener, DataFetcher, ParkingLocation, RefreshEvent, RefreshListener,
    RefreshScheduler, RefreshState,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::format;

/// Run the scheduler until Ctrl-C. Each line on stdin requests a refresh.
pub async fn watch(fetcher: Arc<DataFetcher>, interval: Duration) {
    let scheduler = Arc::new(RefreshScheduler::new(fetcher, interval));
    let (listener, events) = ChannelListener::new();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C, stopping");
        }
    };

    run(scheduler, Arc::new(listener), events, spawn_stdin_reader(), shutdown).await;
}

/// Drive `scheduler` until `shutdown` resolves.
///
/// Manual refreshes run on their own task so a slow, retrying fetch never
/// keeps the loop from seeing `shutdown`.
async fn run(
    scheduler: Arc<RefreshScheduler>,
    listener: Arc<dyn RefreshListener>,
    mut events: mpsc::UnboundedReceiver<RefreshEvent>,
    mut requests: mpsc::UnboundedReceiver<()>,
    shutdown: impl Future<Output = ()>,
) {
    // Polled from the start so a signal arriving mid-cycle is never dropped
    tokio::pin!(shutdown);

    tokio::select! {
        _ = scheduler.start(listener) => {}
        _ = &mut shutdown => {
            scheduler.stop();
            return;
        }
    }

    let mut requests_open = true;
    loop {
        tokio::select! {
            Some(event) = events.recv() => handle_event(&scheduler, event),
            request = requests.recv(), if requests_open => match request {
                Some(()) => spawn_manual_refresh(&scheduler),
                None => requests_open = false,
            },
            _ = &mut shutdown => break,
        }
    }

    scheduler.stop();
}

/// Forward each stdin line as a refresh request.
///
/// Reads on a plain thread: a blocking read parked in the runtime's pool
/// would hold up shutdown until the next line arrives.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if let Err(e) = line {
                warn!(error = %e, "Failed to read stdin, manual refresh disabled");
                break;
            }
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

fn spawn_manual_refresh(scheduler: &Arc<RefreshScheduler>) {
    let scheduler = Arc::clone(scheduler);
    tokio::spawn(async move {
        if !scheduler.refresh().await {
            println!("Refresh already in progress");
        }
    });
}

fn handle_event(scheduler: &RefreshScheduler, event: RefreshEvent) {
    match event {
        RefreshEvent::Data(locations) => print_locations(&locations),
        RefreshEvent::Config(config) => apply_config(scheduler, config.as_ref()),
        RefreshEvent::State(state) => print_state(scheduler, &state),
        RefreshEvent::Error(message) => eprintln!("Refresh failed: {}", message),
    }
}

fn print_locations(locations: &[ParkingLocation]) {
    if locations.is_empty() {
        println!("No parking data available yet");
        return;
    }
    let free: u32 = locations.iter().map(|l| l.capacity.available).sum();
    println!();
    for location in locations {
        println!("{}", format::format_location_row(location));
    }
    println!("{} spaces free across {} locations", free, locations.len());
}

/// The config feed owns the polling cadence once it has been seen.
fn apply_config(scheduler: &RefreshScheduler, config: Option<&AppConfig>) {
    let Some(config) = config else {
        return;
    };
    let interval = config.data_source.refresh_interval();
    if interval != scheduler.refresh_interval() {
        info!(
            town = %config.branding.name,
            interval_ms = config.data_source.refresh_interval,
            "Adopting refresh interval from config feed"
        );
        scheduler.set_refresh_interval(interval);
    }
}

fn print_state(scheduler: &RefreshScheduler, state: &RefreshState) {
    if state.is_refreshing {
        return;
    }
    let updated = state
        .last_refresh
        .map(format::format_local_time)
        .unwrap_or_else(|| "never".to_string());
    let next = if state.next_refresh.is_some() {
        format::format_countdown(scheduler.time_until_next_refresh())
    } else {
        "not scheduled".to_string()
    };
    println!("Updated {} - next refresh in {}", updated, next);
}
