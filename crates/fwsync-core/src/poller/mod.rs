// # Log Poller
//
// Periodically reads the device's DNS packet log and feeds every
// domain → addresses pair into an `Observer`.
//
// ## Single flight
//
// Polls run inline in the tick loop, so a tick can never start while the
// previous poll is still talking to the device. Ticks missed during a slow
// poll are skipped, not queued.
//
// ## Coverage
//
// Each window reaches back at least to the start of the previous poll, so
// skipped ticks never leave unread log lines. Overlapping windows repeat
// observations; the address cache makes that harmless.
//
// ## Shutdown
//
// The loop stops on cancellation. A poll already in flight finishes its
// current remote call; no further observations are dispatched after the
// token fires.

use crate::error::Result;
use crate::traits::{FirewallSync, Observer};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Periodic DNS log poller
pub struct LogPoller {
    /// Device client issuing the log query
    sync: Arc<dyn FirewallSync>,

    /// Receiver of the observations
    observer: Arc<dyn Observer>,

    /// Time between polls
    interval: Duration,

    /// How far back each poll looks
    lookback: Duration,
}

impl LogPoller {
    /// Create a poller with the default interval and a lookback of two intervals
    pub fn new(sync: Arc<dyn FirewallSync>, observer: Arc<dyn Observer>) -> Self {
        Self::with_interval(sync, observer, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_INTERVAL * 2)
    }

    /// Create a poller with a custom interval and lookback window
    pub fn with_interval(
        sync: Arc<dyn FirewallSync>,
        observer: Arc<dyn Observer>,
        interval: Duration,
        lookback: Duration,
    ) -> Self {
        Self {
            sync,
            observer,
            interval,
            lookback,
        }
    }

    /// Run until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(
            "Starting DNS log polling (interval={:?}, lookback={:?})",
            self.interval, self.lookback
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);
        let mut previous_start: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Log poller stopped");
                    break;
                }

                Some(_) = ticks.next() => {
                    let window = previous_start
                        .map_or(self.lookback, |start| self.lookback.max(start.elapsed()));
                    previous_start = Some(Instant::now());

                    if let Err(e) = self.poll_within(window, &cancel).await {
                        warn!("Failed to get domain IPs from logs: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Run a single poll and dispatch its observations
    ///
    /// Returns the number of observations dispatched.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> Result<usize> {
        self.poll_within(self.lookback, cancel).await
    }

    async fn poll_within(&self, window: Duration, cancel: &CancellationToken) -> Result<usize> {
        let found = self.sync.poll_log_addresses(window).await?;

        let mut dispatched = 0;
        for (domain, addresses) in found {
            if cancel.is_cancelled() {
                debug!("Cancelled mid-poll, dropping remaining observations");
                break;
            }

            let addrs: Vec<IpAddr> = addresses
                .iter()
                .filter_map(|a| a.parse().ok())
                .collect();
            if addrs.is_empty() {
                continue;
            }

            self.observer.on_observation(&domain, &addrs).await;
            dispatched += 1;
        }

        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SyncOutcome;
    use async_trait::async_trait;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    #[derive(Default)]
    struct LogDevice {
        entries: HashMap<String, BTreeSet<String>>,
        delay: Duration,
        windows: Mutex<Vec<Duration>>,
    }

    impl LogDevice {
        fn with_entries(entries: HashMap<String, BTreeSet<String>>) -> Arc<Self> {
            Arc::new(Self {
                entries,
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl FirewallSync for LogDevice {
        async fn list_addresses(&self, _list_name: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn add_addresses(&self, _domain: &str, addresses: &[String]) -> SyncOutcome {
            SyncOutcome::complete(addresses.to_vec())
        }

        async fn poll_log_addresses(
            &self,
            lookback: Duration,
        ) -> Result<HashMap<String, BTreeSet<String>>> {
            self.windows.lock().unwrap().push(lookback);
            tokio::time::sleep(self.delay).await;
            Ok(self.entries.clone())
        }

        fn address_list(&self) -> &str {
            "watchlist"
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<(String, Vec<IpAddr>)>>,
    }

    #[async_trait]
    impl Observer for RecordingObserver {
        async fn on_observation(&self, domain: &str, addresses: &[IpAddr]) {
            self.seen
                .lock()
                .unwrap()
                .push((domain.to_string(), addresses.to_vec()));
        }
    }

    #[tokio::test]
    async fn test_poll_once_dispatches_per_domain() {
        let mut entries = HashMap::new();
        entries.insert(
            "example.com".to_string(),
            BTreeSet::from(["192.0.2.1".to_string(), "192.0.2.2".to_string()]),
        );
        entries.insert("junk.test".to_string(), BTreeSet::from(["nope".to_string()]));

        let observer = Arc::new(RecordingObserver::default());
        let poller = LogPoller::new(LogDevice::with_entries(entries), observer.clone());

        let dispatched = poller.poll_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(dispatched, 1);
        let seen = observer.seen.lock().unwrap().clone();
        assert_eq!(seen[0].0, "example.com");
        assert_eq!(seen[0].1.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_poll_dispatches_nothing() {
        let mut entries = HashMap::new();
        entries.insert("example.com".to_string(), BTreeSet::from(["192.0.2.1".to_string()]));

        let observer = Arc::new(RecordingObserver::default());
        let poller = LogPoller::new(LogDevice::with_entries(entries), observer.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(poller.poll_once(&cancel).await.unwrap(), 0);
        assert!(observer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_lookback_spans_two_intervals() {
        let poller = LogPoller::new(
            LogDevice::with_entries(HashMap::new()),
            Arc::new(RecordingObserver::default()),
        );
        assert_eq!(poller.lookback, DEFAULT_POLL_INTERVAL * 2);
    }

    #[tokio::test]
    async fn test_window_covers_time_since_previous_poll() {
        let device = Arc::new(LogDevice {
            delay: Duration::from_millis(80),
            ..Default::default()
        });
        let poller = LogPoller::with_interval(
            device.clone(),
            Arc::new(RecordingObserver::default()),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            stopper.cancel();
        });
        poller.run(cancel).await.unwrap();

        let windows = device.windows.lock().unwrap().clone();
        assert!(windows.len() >= 2, "got {} polls", windows.len());
        assert_eq!(windows[0], Duration::from_millis(10));
        for window in &windows[1..] {
            assert!(*window >= Duration::from_millis(80), "window {:?} leaves a gap", window);
        }
    }
}
