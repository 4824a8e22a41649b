use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use shared_api::{ApiClient, Method};
use shared_models::ApiError;
use shared_utils::sanitize_optional;

use crate::models::{ChatError, ChatMessage, ChatMessageRecord, ChatThread};

#[derive(Deserialize)]
#[serde(untagged)]
enum ThreadPayload {
    Wrapped { chat: ChatThread },
    Thread(ChatThread),
    Bare(Vec<ChatMessageRecord>),
}

impl ThreadPayload {
    fn into_messages(self) -> Vec<ChatMessageRecord> {
        match self {
            ThreadPayload::Wrapped { chat } | ThreadPayload::Thread(chat) => chat.messages,
            ThreadPayload::Bare(messages) => messages,
        }
    }
}

// The send endpoint answers with the stored message, either bare or wrapped,
// or with the whole updated thread.
#[derive(Deserialize)]
#[serde(untagged)]
enum SentPayload {
    Wrapped { message: ChatMessageRecord },
    Bare(ChatMessageRecord),
    Thread(ThreadPayload),
}

pub struct ChatService {
    api: Arc<ApiClient>,
}

impl ChatService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn get_thread(&self, appointment_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let payload: ThreadPayload = self.api.get(&format!("/chat/{}", appointment_id)).await?;
        let messages: Vec<ChatMessage> = payload
            .into_messages()
            .into_iter()
            .map(ChatMessage::from)
            .collect();
        debug!("Fetched {} chat messages for {}", messages.len(), appointment_id);
        Ok(messages)
    }

    /// Sanitizes and posts `text`. Returns the message as stored.
    pub async fn send(&self, appointment_id: &str, text: &str) -> Result<ChatMessage, ChatError> {
        let text = sanitize_optional(text).ok_or(ChatError::EmptyMessage)?;

        let payload: SentPayload = self
            .api
            .post(
                &format!("/chat/{}/messages", appointment_id),
                json!({ "message": text }),
            )
            .await?;

        let record = match payload {
            SentPayload::Wrapped { message } | SentPayload::Bare(message) => message,
            SentPayload::Thread(thread) => thread.into_messages().pop().ok_or_else(|| {
                ApiError::Decode("send response carried no messages".to_string())
            })?,
        };

        info!("Sent chat message {} on {}", record.id, appointment_id);
        Ok(record.into())
    }

    pub async fn mark_read(&self, appointment_id: &str) -> Result<(), ApiError> {
        self.api
            .execute(Method::PATCH, &format!("/chat/{}/read", appointment_id), None)
            .await
    }
}
