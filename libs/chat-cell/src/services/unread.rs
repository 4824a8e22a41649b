use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use appointment_cell::{Appointment, AppointmentScope, AppointmentService};
use shared_models::ApiError;
use shared_utils::FeedSource;

use crate::models::Sender;
use crate::services::chat::ChatService;
use crate::services::window::count_unread;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadCounts {
    by_appointment: BTreeMap<String, usize>,
}

impl UnreadCounts {
    pub fn get(&self, appointment_id: &str) -> usize {
        self.by_appointment.get(appointment_id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.by_appointment.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.by_appointment.iter().map(|(id, count)| (id.as_str(), *count))
    }
}

/// Background scan of unread chat messages across appointments. Each tick
/// lists appointments and then fetches every chat-enabled thread
/// concurrently.
pub struct UnreadSource {
    chat: Arc<ChatService>,
    appointments: Arc<AppointmentService>,
    scope: AppointmentScope,
    viewer: Sender,
}

impl UnreadSource {
    pub fn new(
        chat: Arc<ChatService>,
        appointments: Arc<AppointmentService>,
        scope: AppointmentScope,
        viewer: Sender,
    ) -> Self {
        Self {
            chat,
            appointments,
            scope,
            viewer,
        }
    }

    /// Threads that fail to load are left out of the counts.
    pub async fn scan(&self, appointments: &[Appointment]) -> UnreadCounts {
        let enabled: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| a.chat_available())
            .collect();

        let threads = join_all(
            enabled
                .iter()
                .map(|appointment| self.chat.get_thread(&appointment.id)),
        )
        .await;

        let mut counts = UnreadCounts::default();
        for (appointment, thread) in enabled.into_iter().zip(threads) {
            match thread {
                Ok(messages) => {
                    let unread = count_unread(&messages, self.viewer);
                    if unread > 0 {
                        counts.by_appointment.insert(appointment.id.clone(), unread);
                    }
                }
                Err(e) => warn!("Unread scan skipped {}: {}", appointment.id, e),
            }
        }

        debug!("Unread scan found {} messages", counts.total());
        counts
    }
}

#[async_trait]
impl FeedSource for UnreadSource {
    type Item = UnreadCounts;
    type Error = ApiError;

    async fn fetch(&self) -> Result<Self::Item, Self::Error> {
        let appointments = self.appointments.list(self.scope).await?;
        Ok(self.scan(&appointments).await)
    }
}
