use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "body")]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, alias = "isRead")]
    pub read: bool,
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// What every notification subscriber receives on each poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    pub unread_count: u64,
    pub recent: Vec<Notification>,
}

impl NotificationSnapshot {
    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.recent.iter().filter(|n| !n.read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_aliases() {
        let notification: Notification = serde_json::from_value(json!({
            "_id": "n1",
            "title": "Appointment confirmed",
            "body": "See you Monday",
            "type": "appointment",
            "isRead": true
        }))
        .unwrap();

        assert_eq!(notification.id, "n1");
        assert_eq!(notification.message, "See you Monday");
        assert_eq!(notification.kind.as_deref(), Some("appointment"));
        assert!(notification.read);
        assert_eq!(notification.created_at, None);
    }
}
