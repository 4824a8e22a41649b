use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::try_join;

use shared_api::ApiClient;
use shared_config::PortalConfig;
use shared_models::ApiError;
use shared_utils::{FeedSource, FeedSubscription, PollingFeed};

use crate::models::NotificationSnapshot;
use crate::services::notification::{NotificationService, RECENT_LIMIT};

pub struct NotificationSource {
    service: Arc<NotificationService>,
    limit: usize,
}

impl NotificationSource {
    pub fn new(service: Arc<NotificationService>, limit: usize) -> Self {
        Self { service, limit }
    }
}

#[async_trait]
impl FeedSource for NotificationSource {
    type Item = NotificationSnapshot;
    type Error = ApiError;

    async fn fetch(&self) -> Result<Self::Item, Self::Error> {
        let (unread_count, recent) = try_join!(
            self.service.unread_count(),
            self.service.list_recent(self.limit)
        )?;
        Ok(NotificationSnapshot {
            unread_count,
            recent,
        })
    }
}

/// Unread count and recent notifications for every view that shows them,
/// behind a single poller.
pub struct NotificationCenter {
    service: Arc<NotificationService>,
    feed: PollingFeed<NotificationSource>,
}

impl NotificationCenter {
    pub fn new(api: Arc<ApiClient>, config: &PortalConfig) -> Self {
        Self::with_interval(api, config.notification_poll_interval())
    }

    pub fn with_interval(api: Arc<ApiClient>, interval: Duration) -> Self {
        let service = Arc::new(NotificationService::new(api));
        let source = Arc::new(NotificationSource::new(service.clone(), RECENT_LIMIT));

        Self {
            service,
            feed: PollingFeed::new("notifications", source, interval),
        }
    }

    pub fn subscribe(&self) -> FeedSubscription<NotificationSnapshot> {
        self.feed.subscribe()
    }

    pub fn latest(&self) -> Option<NotificationSnapshot> {
        self.feed.latest()
    }

    pub fn is_polling(&self) -> bool {
        self.feed.is_polling()
    }

    pub async fn refresh(&self) -> Result<NotificationSnapshot, ApiError> {
        self.feed.refresh().await
    }

    /// Passes through, then pushes a fresh snapshot to every subscriber.
    pub async fn mark_read(&self, notification_id: &str) -> Result<NotificationSnapshot, ApiError> {
        self.service.mark_read(notification_id).await?;
        self.refresh().await
    }

    pub async fn mark_all_read(&self) -> Result<NotificationSnapshot, ApiError> {
        self.service.mark_all_read().await?;
        self.refresh().await
    }
}
