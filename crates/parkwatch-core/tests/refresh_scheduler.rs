mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{drain, fetcher, settle, MockFeed};
use parkwatch_core::refresh::MIN_POLL_INTERVAL;
use parkwatch_core::{ChannelListener, ConnectivityFlag, RefreshEvent, RefreshPhase, RefreshScheduler};

const HOUR: Duration = Duration::from_secs(3600);
const MINUTE: Duration = Duration::from_secs(60);

fn scheduler(feed: &Arc<MockFeed>, interval: Duration) -> RefreshScheduler {
    RefreshScheduler::new(fetcher(feed.clone(), ConnectivityFlag::default()), interval)
}

#[tokio::test(start_paused = true)]
async fn start_runs_cycle_and_publishes_in_order() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, MINUTE);
    let (listener, mut rx) = ChannelListener::new();

    scheduler.start(Arc::new(listener)).await;
    assert_eq!(feed.calls(), 2);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 4, "{:?}", events);
    assert!(matches!(&events[0], RefreshEvent::State(s) if s.is_refreshing && s.error.is_none()));
    assert!(matches!(&events[1], RefreshEvent::Data(locations) if locations.len() == 2));
    assert!(matches!(
        &events[2],
        RefreshEvent::Config(Some(config)) if config.branding.name == "Montpelier Parking"
    ));
    match &events[3] {
        RefreshEvent::State(state) => {
            assert!(!state.is_refreshing);
            assert!(state.last_refresh.is_some());
            assert!(state.next_refresh.is_some());
            assert_eq!(state.phase(), RefreshPhase::SettledOk);
        }
        other => panic!("expected final state, got {:?}", other),
    }

    assert!(scheduler.is_data_fresh());
    let remaining = scheduler.time_until_next_refresh();
    assert!(remaining <= MINUTE && remaining > MINUTE - Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn timer_repeats_at_interval() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, MINUTE);
    let (listener, _rx) = ChannelListener::new();

    scheduler.start(Arc::new(listener)).await;
    tokio::time::sleep(MINUTE + Duration::from_millis(10)).await;
    assert_eq!(feed.calls(), 4);
    tokio::time::sleep(MINUTE).await;
    assert_eq!(feed.calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn refresh_while_in_flight_is_noop() {
    let feed = MockFeed::new();
    let scheduler = Arc::new(scheduler(&feed, HOUR));

    feed.hold();
    let first = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.refresh().await }
    });
    settle().await;

    assert!(scheduler.state().is_refreshing);
    assert_eq!(feed.calls(), 2);

    assert!(!scheduler.refresh().await);
    assert_eq!(feed.calls(), 2);

    feed.release();
    assert!(first.await.unwrap());
    assert_eq!(feed.calls(), 2);
    assert!(!scheduler.state().is_refreshing);
}

#[tokio::test(start_paused = true)]
async fn shorter_interval_takes_effect_immediately() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, HOUR);
    let (listener, _rx) = ChannelListener::new();

    scheduler.start(Arc::new(listener)).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(feed.calls(), 2);

    scheduler.set_refresh_interval(Duration::from_millis(500));
    assert!(scheduler.time_until_next_refresh() <= Duration::from_millis(500));

    tokio::time::sleep(Duration::from_millis(550)).await;
    assert_eq!(feed.calls(), 4);
    assert_eq!(scheduler.refresh_interval(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn interval_change_without_timer_does_not_arm() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, HOUR);

    scheduler.set_refresh_interval(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(feed.calls(), 0);
    assert_eq!(scheduler.time_until_next_refresh(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn second_start_does_not_double_arm() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, MINUTE);
    let (first, _rx1) = ChannelListener::new();
    let (second, _rx2) = ChannelListener::new();

    scheduler.start(Arc::new(first)).await;
    scheduler.start(Arc::new(second)).await;
    assert_eq!(feed.calls(), 2);

    tokio::time::sleep(MINUTE + Duration::from_millis(10)).await;
    assert_eq!(feed.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_future_cycles() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, MINUTE);
    let (listener, mut rx) = ChannelListener::new();

    scheduler.start(Arc::new(listener)).await;
    drain(&mut rx);
    scheduler.stop();

    assert!(!scheduler.is_running());
    assert_eq!(scheduler.state().next_refresh, None);
    assert_eq!(scheduler.time_until_next_refresh(), Duration::ZERO);
    assert!(matches!(drain(&mut rx).as_slice(), [RefreshEvent::State(s)] if s.next_refresh.is_none()));

    tokio::time::sleep(MINUTE * 3).await;
    assert_eq!(feed.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_lets_in_flight_cycle_finish() {
    let feed = MockFeed::new();
    let scheduler = Arc::new(scheduler(&feed, MINUTE));
    let (listener, _rx) = ChannelListener::new();

    feed.hold();
    let started = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.start(Arc::new(listener)).await }
    });
    settle().await;
    scheduler.stop();

    feed.release();
    started.await.unwrap();

    let state = scheduler.state();
    assert!(state.last_refresh.is_some());
    assert_eq!(state.next_refresh, None);

    tokio::time::sleep(MINUTE * 2).await;
    assert_eq!(feed.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_reports_error_and_keeps_polling() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, MINUTE);
    let (listener, mut rx) = ChannelListener::new();

    feed.panic_on_next(1);
    scheduler.start(Arc::new(listener)).await;

    let events = drain(&mut rx);
    assert!(matches!(events.as_slice(), [
        RefreshEvent::State(_),
        RefreshEvent::Error(_),
        RefreshEvent::State(s),
    ] if s.error.is_some() && s.next_refresh.is_some()));
    assert_eq!(scheduler.state().phase(), RefreshPhase::SettledError);
    assert!(!scheduler.is_data_fresh());

    tokio::time::sleep(MINUTE + Duration::from_millis(10)).await;
    let state = scheduler.state();
    assert_eq!(state.error, None);
    assert!(state.last_refresh.is_some());
}

#[tokio::test(start_paused = true)]
async fn network_outage_falls_back_to_cache_without_error() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, HOUR);
    let (listener, mut rx) = ChannelListener::new();

    scheduler.start(Arc::new(listener)).await;
    drain(&mut rx);

    feed.set_failing(true);
    assert!(scheduler.refresh().await);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, RefreshEvent::Data(locations) if locations.len() == 2)));
    assert_eq!(scheduler.state().error, None);
    // Two resources, three attempts each, on top of the first cycle
    assert_eq!(feed.calls(), 2 + 6);
}

#[tokio::test(start_paused = true)]
async fn offline_without_cache_publishes_empty_data() {
    let feed = MockFeed::new();
    let scheduler = RefreshScheduler::new(fetcher(feed.clone(), ConnectivityFlag::new(false)), MINUTE);
    let (listener, mut rx) = ChannelListener::new();

    scheduler.start(Arc::new(listener)).await;

    let events = drain(&mut rx);
    assert!(matches!(&events[1], RefreshEvent::Data(locations) if locations.is_empty()));
    assert!(matches!(&events[2], RefreshEvent::Config(None)));
    assert_eq!(scheduler.state().phase(), RefreshPhase::SettledOk);
    assert_eq!(feed.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn data_freshness_follows_interval() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, MINUTE);
    assert!(!scheduler.is_data_fresh());

    assert!(scheduler.refresh().await);
    assert!(scheduler.is_data_fresh());
    assert_eq!(scheduler.state().next_refresh, None);

    tokio::time::sleep(MINUTE + Duration::from_secs(1)).await;
    assert!(!scheduler.is_data_fresh());
    assert_eq!(feed.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_raised_to_minimum() {
    let feed = MockFeed::new();
    let scheduler = scheduler(&feed, Duration::ZERO);
    assert_eq!(scheduler.refresh_interval(), MIN_POLL_INTERVAL);

    let (listener, _rx) = ChannelListener::new();
    scheduler.start(Arc::new(listener)).await;
    assert_eq!(feed.calls(), 2);

    tokio::time::sleep(MIN_POLL_INTERVAL / 2).await;
    assert_eq!(feed.calls(), 2);

    tokio::time::sleep(Duration::from_secs(2)).await;
    // Initial cycle plus at most one per half second
    assert!(feed.calls() <= 2 * 6, "calls: {}", feed.calls());

    scheduler.set_refresh_interval(Duration::ZERO);
    assert_eq!(scheduler.refresh_interval(), MIN_POLL_INTERVAL);
    assert!(scheduler.time_until_next_refresh() > Duration::ZERO);
}
