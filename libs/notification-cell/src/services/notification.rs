use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use shared_api::{ApiClient, Method};
use shared_models::ApiError;

use crate::models::Notification;

/// How many notifications the bell dropdown shows.
pub const RECENT_LIMIT: usize = 10;

#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationListPayload {
    Wrapped { notifications: Vec<Notification> },
    Bare(Vec<Notification>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UnreadCountPayload {
    Count { count: u64 },
    Named {
        #[serde(rename = "unreadCount")]
        unread_count: u64,
    },
    Bare(u64),
}

impl UnreadCountPayload {
    fn value(self) -> u64 {
        match self {
            UnreadCountPayload::Count { count } => count,
            UnreadCountPayload::Named { unread_count } => unread_count,
            UnreadCountPayload::Bare(count) => count,
        }
    }
}

pub struct NotificationService {
    api: Arc<ApiClient>,
}

impl NotificationService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Notification>, ApiError> {
        let payload: NotificationListPayload = self
            .api
            .request_with_query(Method::GET, "/notifications", &[("limit", limit)])
            .await?;
        let notifications = match payload {
            NotificationListPayload::Wrapped { notifications } => notifications,
            NotificationListPayload::Bare(notifications) => notifications,
        };
        debug!("Fetched {} notifications", notifications.len());
        Ok(notifications)
    }

    pub async fn unread_count(&self) -> Result<u64, ApiError> {
        let payload: UnreadCountPayload = self.api.get("/notifications/unread-count").await?;
        Ok(payload.value())
    }

    pub async fn mark_read(&self, notification_id: &str) -> Result<(), ApiError> {
        self.api
            .execute(
                Method::PATCH,
                &format!("/notifications/{}/read", notification_id),
                None,
            )
            .await?;
        info!("Marked notification {} read", notification_id);
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<(), ApiError> {
        self.api
            .execute(Method::PATCH, "/notifications/read-all", None)
            .await?;
        info!("Marked all notifications read");
        Ok(())
    }
}
