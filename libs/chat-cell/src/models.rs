use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_models::{ApiError, Role};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    #[serde(alias = "User", alias = "patient", alias = "Patient")]
    User,
    #[serde(alias = "Clinic", alias = "staff", alias = "doctor", alias = "admin")]
    Clinic,
}

impl Sender {
    pub fn from_role(role: Role) -> Self {
        if role.is_staff() {
            Sender::Clinic
        } else {
            Sender::User
        }
    }

    pub fn counterpart(self) -> Self {
        match self {
            Sender::User => Sender::Clinic,
            Sender::Clinic => Sender::User,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "Patient"),
            Sender::Clinic => write!(f, "Clinic"),
        }
    }
}

/// A chat message as the backend stores it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub sender: Sender,
    #[serde(alias = "text", alias = "content")]
    pub message: String,
    #[serde(default, alias = "createdAt")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, alias = "isRead")]
    pub read: bool,
}

/// A chat message ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub read: bool,
}

impl ChatMessage {
    pub fn is_from(&self, sender: Sender) -> bool {
        self.sender == sender
    }

    pub fn time_label(&self) -> String {
        self.sent_at
            .map(|at| at.format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

impl From<ChatMessageRecord> for ChatMessage {
    fn from(record: ChatMessageRecord) -> Self {
        Self {
            id: record.id,
            sender: record.sender,
            text: record.message,
            sent_at: record.timestamp,
            read: record.read,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessageRecord>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("Chat is not available for appointment {appointment_id}")]
    Unavailable { appointment_id: String },

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Api(#[from] ApiError),
}
