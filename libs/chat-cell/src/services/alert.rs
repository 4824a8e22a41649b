use tracing::info;

use crate::models::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPermission {
    Granted,
    Denied,
    Default,
}

/// Desktop side of a new-message alert.
pub trait Alerter: Send + Sync {
    fn permission(&self) -> AlertPermission;
    fn notify(&self, title: &str, body: &str);
    fn play_tone(&self);
}

/// Raises a notification only with permission; the tone always plays.
pub fn alert_new_message(alerter: &dyn Alerter, message: &ChatMessage) {
    if alerter.permission() == AlertPermission::Granted {
        alerter.notify(&format!("New message from {}", message.sender), &message.text);
    }
    alerter.play_tone();
}

/// Writes alerts to the log. Used by the headless binary.
pub struct TracingAlerter {
    permission: AlertPermission,
}

impl TracingAlerter {
    pub fn new(permission: AlertPermission) -> Self {
        Self { permission }
    }
}

impl Default for TracingAlerter {
    fn default() -> Self {
        Self::new(AlertPermission::Granted)
    }
}

impl Alerter for TracingAlerter {
    fn permission(&self) -> AlertPermission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) {
        info!(title = %title, "{}", body);
    }

    fn play_tone(&self) {
        info!("*ding*");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        permission: Option<AlertPermission>,
        notes: Mutex<Vec<String>>,
        tones: Mutex<usize>,
    }

    impl Alerter for Recorder {
        fn permission(&self) -> AlertPermission {
            self.permission.unwrap_or(AlertPermission::Default)
        }

        fn notify(&self, title: &str, _body: &str) {
            self.notes.lock().unwrap().push(title.to_string());
        }

        fn play_tone(&self) {
            *self.tones.lock().unwrap() += 1;
        }
    }

    fn message() -> ChatMessage {
        ChatMessage {
            id: "m1".to_string(),
            sender: Sender::Clinic,
            text: "Hello".to_string(),
            sent_at: None,
            read: false,
        }
    }

    #[test]
    fn test_tone_without_permission() {
        let recorder = Recorder::default();
        alert_new_message(&recorder, &message());

        assert!(recorder.notes.lock().unwrap().is_empty());
        assert_eq!(*recorder.tones.lock().unwrap(), 1);
    }

    #[test]
    fn test_notification_with_permission() {
        let recorder = Recorder {
            permission: Some(AlertPermission::Granted),
            ..Recorder::default()
        };
        alert_new_message(&recorder, &message());

        assert_eq!(recorder.notes.lock().unwrap().as_slice(), ["New message from Clinic"]);
        assert_eq!(*recorder.tones.lock().unwrap(), 1);
    }
}
