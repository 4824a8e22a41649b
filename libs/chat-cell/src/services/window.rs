use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use appointment_cell::Appointment;
use shared_models::ApiError;
use shared_utils::{FeedSource, FeedSubscription, PollingFeed};

use crate::models::{ChatError, ChatMessage, Sender};
use crate::services::alert::{alert_new_message, Alerter};
use crate::services::chat::ChatService;

/// Polls one appointment's thread.
pub struct ThreadSource {
    chat: Arc<ChatService>,
    appointment_id: String,
}

impl ThreadSource {
    pub fn new(chat: Arc<ChatService>, appointment_id: impl Into<String>) -> Self {
        Self {
            chat,
            appointment_id: appointment_id.into(),
        }
    }
}

#[async_trait]
impl FeedSource for ThreadSource {
    type Item = Vec<ChatMessage>;
    type Error = ApiError;

    async fn fetch(&self) -> Result<Self::Item, Self::Error> {
        self.chat.get_thread(&self.appointment_id).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatUpdate {
    /// Counterpart messages that were not in the previous snapshot.
    pub new_messages: Vec<ChatMessage>,
}

/// An open chat on one appointment. Polls while alive; dropping the window
/// stops the poller.
pub struct ChatWindow {
    appointment_id: String,
    viewer: Sender,
    chat: Arc<ChatService>,
    alerter: Arc<dyn Alerter>,
    messages: Vec<ChatMessage>,
    subscription: FeedSubscription<Vec<ChatMessage>>,
    feed: PollingFeed<ThreadSource>,
}

impl std::fmt::Debug for ChatWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatWindow")
            .field("appointment_id", &self.appointment_id)
            .field("viewer", &self.viewer)
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

impl ChatWindow {
    /// Fails with `Unavailable` unless chat is enabled and the appointment
    /// is not completed.
    pub async fn open(
        chat: Arc<ChatService>,
        appointment: &Appointment,
        viewer: Sender,
        alerter: Arc<dyn Alerter>,
        poll_interval: Duration,
    ) -> Result<Self, ChatError> {
        if !appointment.chat_available() {
            return Err(ChatError::Unavailable {
                appointment_id: appointment.id.clone(),
            });
        }

        let messages = chat.get_thread(&appointment.id).await?;

        let source = Arc::new(ThreadSource::new(chat.clone(), appointment.id.clone()));
        let feed = PollingFeed::new(format!("chat {}", appointment.id), source, poll_interval)
            .delay_first_poll();
        let subscription = feed.subscribe();

        let mut window = Self {
            appointment_id: appointment.id.clone(),
            viewer,
            chat,
            alerter,
            messages,
            subscription,
            feed,
        };
        window.mark_counterpart_read().await;
        Ok(window)
    }

    pub fn appointment_id(&self) -> &str {
        &self.appointment_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn unread_count(&self) -> usize {
        count_unread(&self.messages, self.viewer)
    }

    pub fn is_polling(&self) -> bool {
        self.feed.is_polling()
    }

    /// Waits for the next poll, alerting once per new counterpart message.
    /// `None` once polling has stopped.
    pub async fn next_update(&mut self) -> Option<ChatUpdate> {
        let snapshot = self.subscription.recv().await?;
        let counterpart = self.viewer.counterpart();

        let new_messages: Vec<ChatMessage> = snapshot
            .iter()
            .filter(|m| m.is_from(counterpart))
            .filter(|m| !self.messages.iter().any(|known| known.id == m.id))
            .cloned()
            .collect();

        for message in &new_messages {
            alert_new_message(self.alerter.as_ref(), message);
        }

        self.messages = merge_snapshot(std::mem::take(&mut self.messages), snapshot);
        if !new_messages.is_empty() {
            debug!(
                "{} new messages on {}",
                new_messages.len(),
                self.appointment_id
            );
            self.mark_counterpart_read().await;
        }

        Some(ChatUpdate { new_messages })
    }

    /// Appends the stored message on success; nothing changes on failure.
    pub async fn send(&mut self, text: &str) -> Result<ChatMessage, ChatError> {
        let message = self.chat.send(&self.appointment_id, text).await?;
        self.messages.push(message.clone());
        Ok(message)
    }

    async fn mark_counterpart_read(&mut self) {
        if self.unread_count() == 0 {
            return;
        }

        match self.chat.mark_read(&self.appointment_id).await {
            Ok(()) => {
                let counterpart = self.viewer.counterpart();
                for message in self.messages.iter_mut().filter(|m| m.is_from(counterpart)) {
                    message.read = true;
                }
            }
            Err(e) => warn!("Failed to mark chat {} read: {}", self.appointment_id, e),
        }
    }
}

/// The polled snapshot wins for every message it contains. Local messages it
/// does not know yet, such as one just sent, are kept after it.
fn merge_snapshot(local: Vec<ChatMessage>, snapshot: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let unseen: Vec<ChatMessage> = local
        .into_iter()
        .filter(|m| !snapshot.iter().any(|s| s.id == m.id))
        .collect();

    let mut merged = snapshot;
    merged.extend(unseen);
    merged
}

/// Unread messages addressed to `viewer`.
pub fn count_unread(messages: &[ChatMessage], viewer: Sender) -> usize {
    let counterpart = viewer.counterpart();
    messages
        .iter()
        .filter(|m| m.is_from(counterpart) && !m.read)
        .count()
}
