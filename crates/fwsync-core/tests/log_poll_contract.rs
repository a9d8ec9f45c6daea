//! Architectural Contract Test: Log Polling
//!
//! Verifies the single-flight behavior of the DNS log poller.
//!
//! Constraints verified:
//! - A poll never starts while the previous one is still running
//! - Missed ticks are skipped rather than queued
//! - Log answers reach the observer through the real client parsing
//! - A failing poll does not stop the loop
//!
//! If this test fails, someone has:
//! - Spawned polls instead of awaiting them
//! - Switched the interval to burst catch-up

mod common;

use common::*;
use fwsync_core::config::EngineConfig;
use fwsync_core::traits::FirewallSync;
use fwsync_core::{AddressCache, DomainMatcher, LogPoller, RouterOsClient, SyncPipeline};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn slow_polls_never_overlap() {
    let device = Arc::new(
        SimulatedRouter::new("watchlist").with_log_delay(Duration::from_millis(80)),
    );
    let client: Arc<dyn FirewallSync> = Arc::new(RouterOsClient::new(device.clone(), "watchlist"));
    let observer = Arc::new(RecordingObserver::new());

    let poller = LogPoller::with_interval(
        client,
        observer,
        Duration::from_millis(10),
        Duration::from_secs(2),
    );

    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(400)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(device.max_in_flight(), 1, "polls must not overlap");
    // Roughly one poll per 80ms, never one per 10ms tick
    assert!(device.log_calls() >= 2);
    assert!(device.log_calls() <= 7, "missed ticks must be skipped, got {}", device.log_calls());
}

#[tokio::test]
async fn log_answers_reach_observer() {
    let device = Arc::new(SimulatedRouter::new("watchlist"));
    device.set_log(&format!(
        "{}{}{}",
        a_answer("example.com", "93.184.216.34"),
        a_answer("example.com", "93.184.216.35"),
        a_answer("other.test", "198.51.100.4"),
    ));

    let client: Arc<dyn FirewallSync> = Arc::new(RouterOsClient::new(device, "watchlist"));
    let observer = Arc::new(RecordingObserver::new());
    let poller = LogPoller::new(client, observer.clone());

    let dispatched = poller.poll_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(dispatched, 2);
    let mut seen = observer.seen();
    seen.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(seen[0].0, "example.com");
    assert_eq!(seen[0].1, ips(&["93.184.216.34", "93.184.216.35"]));
    assert_eq!(seen[1].0, "other.test");
}

#[tokio::test]
async fn polled_answers_flow_into_address_list() {
    let device = Arc::new(SimulatedRouter::new("watchlist"));
    device.set_log(&format!(
        "{}{}",
        a_answer("api.example.com", "203.0.113.10"),
        a_answer("unwatched.test", "203.0.113.99"),
    ));

    let client = Arc::new(RouterOsClient::new(device.clone(), "watchlist"));
    let matcher = Arc::new(DomainMatcher::from_lines(["example.com"]));
    let (pipeline, _events) = SyncPipeline::new(
        matcher,
        AddressCache::new(),
        client.clone(),
        &EngineConfig::default(),
    );

    let poller = LogPoller::new(client, Arc::new(pipeline));
    let cancel = CancellationToken::new();

    poller.poll_once(&cancel).await.unwrap();
    poller.poll_once(&cancel).await.unwrap();

    // The second poll sees the same log but the address is already cached
    assert_eq!(device.addresses(), vec!["203.0.113.10"]);
    assert_eq!(device.add_attempts(), 1);
}

#[tokio::test]
async fn unparseable_log_yields_no_observations() {
    let device = Arc::new(SimulatedRouter::new("watchlist"));
    device.set_log("12:00:00 dns,packet <garbage\n12:00:00 system,info rebooted\n");

    let client: Arc<dyn FirewallSync> = Arc::new(RouterOsClient::new(device, "watchlist"));
    let observer = Arc::new(RecordingObserver::new());
    let poller = LogPoller::new(client, observer.clone());

    assert_eq!(poller.poll_once(&CancellationToken::new()).await.unwrap(), 0);
    assert_eq!(observer.count(), 0);
}
