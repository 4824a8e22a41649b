use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// One endpoint (or group of endpoints) polled on a fixed interval.
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;
    type Error: Display + Send;

    async fn fetch(&self) -> Result<Self::Item, Self::Error>;
}

#[derive(Default)]
struct FeedState {
    subscribers: usize,
    task: Option<JoinHandle<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared poller for one data domain. The first subscription starts a single
/// background task, every subscriber receives each snapshot, and dropping the
/// last subscription aborts the task.
pub struct PollingFeed<S: FeedSource> {
    name: String,
    source: Arc<S>,
    interval: Duration,
    delay_first_poll: bool,
    sender: broadcast::Sender<S::Item>,
    latest: Arc<Mutex<Option<S::Item>>>,
    state: Arc<Mutex<FeedState>>,
}

impl<S: FeedSource> PollingFeed<S> {
    pub fn new(name: impl Into<String>, source: Arc<S>, interval: Duration) -> Self {
        let (sender, _) = broadcast::channel(16);

        Self {
            name: name.into(),
            source,
            interval,
            delay_first_poll: false,
            sender,
            latest: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(FeedState::default())),
        }
    }

    /// Waits one interval before the first poll, for owners that already
    /// fetched the current snapshot themselves.
    pub fn delay_first_poll(mut self) -> Self {
        self.delay_first_poll = true;
        self
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Must be called inside a tokio runtime.
    pub fn subscribe(&self) -> FeedSubscription<S::Item> {
        let receiver = self.sender.subscribe();
        let mut state = lock(&self.state);
        state.subscribers += 1;

        if state.task.is_none() {
            info!("Starting {} poller every {:?}", self.name, self.interval);
            state.task = Some(self.spawn_task());
        }

        FeedSubscription {
            name: self.name.clone(),
            receiver,
            state: self.state.clone(),
        }
    }

    fn spawn_task(&self) -> JoinHandle<()> {
        let name = self.name.clone();
        let source = self.source.clone();
        let sender = self.sender.clone();
        let latest = self.latest.clone();
        let interval = self.interval;
        let mut start = tokio::time::Instant::now();
        if self.delay_first_poll {
            start += interval;
        }

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match source.fetch().await {
                    Ok(item) => publish(&sender, &latest, item),
                    Err(e) => warn!("{} poll failed: {}", name, e),
                }
            }
        })
    }

    /// Fetches immediately and pushes the result to every subscriber.
    pub async fn refresh(&self) -> Result<S::Item, S::Error> {
        let item = self.source.fetch().await?;
        publish(&self.sender, &self.latest, item.clone());
        Ok(item)
    }

    pub fn latest(&self) -> Option<S::Item> {
        lock(&self.latest).clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.state).task.is_some()
    }
}

impl<S: FeedSource> Drop for PollingFeed<S> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.state).task.take() {
            task.abort();
        }
    }
}

fn publish<T: Clone>(sender: &broadcast::Sender<T>, latest: &Mutex<Option<T>>, item: T) {
    *lock(latest) = Some(item.clone());
    // No receivers is fine; the snapshot stays in `latest`.
    let _ = sender.send(item);
}

pub struct FeedSubscription<T> {
    name: String,
    receiver: broadcast::Receiver<T>,
    state: Arc<Mutex<FeedState>>,
}

impl<T: Clone> FeedSubscription<T> {
    /// Next snapshot; `None` once the feed has been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(item) => return Some(item),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("{} subscriber skipped {} stale snapshots", self.name, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl<T> Drop for FeedSubscription<T> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.subscribers = state.subscribers.saturating_sub(1);

        if state.subscribers == 0 {
            if let Some(task) = state.task.take() {
                task.abort();
                info!("Stopped {} poller", self.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    struct Counter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedSource for Counter {
        type Item = usize;
        type Error = String;

        async fn fetch(&self) -> Result<usize, String> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct Failing;

    #[async_trait]
    impl FeedSource for Failing {
        type Item = usize;
        type Error = String;

        async fn fetch(&self) -> Result<usize, String> {
            Err("backend down".to_string())
        }
    }

    fn counter() -> Arc<Counter> {
        Arc::new(Counter {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_first_subscriber_starts_polling() {
        let feed = PollingFeed::new("test", counter(), Duration::from_millis(20));
        assert!(!feed.is_polling());

        let mut subscription = feed.subscribe();
        assert!(feed.is_polling());

        let first = timeout(Duration::from_secs(1), subscription.recv()).await.unwrap();
        let second = timeout(Duration::from_secs(1), subscription.recv()).await.unwrap();
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
        assert_eq!(feed.latest(), Some(2));
    }

    #[tokio::test]
    async fn test_subscribers_share_one_task() {
        let source = counter();
        let feed = PollingFeed::new("test", source.clone(), Duration::from_millis(20));

        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        let from_a = timeout(Duration::from_secs(1), a.recv()).await.unwrap();
        let from_b = timeout(Duration::from_secs(1), b.recv()).await.unwrap();
        assert_eq!(from_a, from_b);
    }

    #[tokio::test]
    async fn test_last_unsubscribe_stops_polling() {
        let source = counter();
        let feed = PollingFeed::new("test", source.clone(), Duration::from_millis(10));

        let a = feed.subscribe();
        let b = feed.subscribe();
        drop(a);
        assert!(feed.is_polling());
        drop(b);
        assert!(!feed.is_polling());
        assert_eq!(feed.subscriber_count(), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let calls = source.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_refresh_reaches_subscribers() {
        let feed = PollingFeed::new("test", counter(), Duration::from_secs(3600));
        let mut subscription = feed.subscribe();

        // Interval fires immediately once.
        let initial = timeout(Duration::from_secs(1), subscription.recv()).await.unwrap();
        assert_eq!(initial, Some(1));

        let refreshed = feed.refresh().await.unwrap();
        let received = timeout(Duration::from_secs(1), subscription.recv()).await.unwrap();
        assert_eq!(received, Some(refreshed));
    }

    #[tokio::test]
    async fn test_delayed_feed_skips_immediate_poll() {
        let source = counter();
        let feed = PollingFeed::new("test", source.clone(), Duration::from_millis(200))
            .delay_first_poll();
        let mut subscription = feed.subscribe();

        let early = timeout(Duration::from_millis(50), subscription.recv()).await;
        assert!(early.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        let first = timeout(Duration::from_secs(1), subscription.recv()).await.unwrap();
        assert_eq!(first, Some(1));
    }

    #[tokio::test]
    async fn test_failed_polls_publish_nothing() {
        let feed = PollingFeed::new("test", Arc::new(Failing), Duration::from_millis(10));
        let mut subscription = feed.subscribe();

        let outcome = timeout(Duration::from_millis(80), subscription.recv()).await;
        assert!(outcome.is_err(), "no snapshot expected while the source fails");
        assert!(feed.is_polling());
    }
}
