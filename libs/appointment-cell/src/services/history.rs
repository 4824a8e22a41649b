use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use shared_models::ApiError;

use crate::models::{Actor, Appointment, AppointmentStatus, AppointmentType};
use crate::services::appointment::{AppointmentScope, AppointmentService};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Book,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    Confirm,
    Reject,
    Complete,
    Cancel,
    Reschedule,
    OpenChat,
    JoinMeeting,
}

/// Buttons shown on an appointment card for the given actor.
pub fn available_actions(actor: Actor, appointment: &Appointment) -> Vec<AppointmentAction> {
    let mut actions = match (actor, appointment.status) {
        (Actor::Clinic, AppointmentStatus::Pending) => {
            vec![AppointmentAction::Confirm, AppointmentAction::Reject]
        }
        (Actor::Clinic, AppointmentStatus::Confirmed) => {
            vec![AppointmentAction::Complete, AppointmentAction::Cancel]
        }
        (Actor::Clinic, AppointmentStatus::Rescheduled) => {
            vec![AppointmentAction::Confirm, AppointmentAction::Cancel]
        }
        (Actor::Patient, AppointmentStatus::Pending) => {
            vec![AppointmentAction::Cancel, AppointmentAction::Reschedule]
        }
        (Actor::Patient, AppointmentStatus::Confirmed) => {
            vec![AppointmentAction::Cancel, AppointmentAction::Reschedule]
        }
        _ => Vec::new(),
    };

    if appointment.status == AppointmentStatus::Confirmed
        && appointment.is_online()
        && appointment.meeting_link().is_some()
    {
        actions.push(AppointmentAction::JoinMeeting);
    }

    if appointment.chat_available() {
        actions.push(AppointmentAction::OpenChat);
    }

    actions
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub status: Option<AppointmentStatus>,
    pub appointment_type: Option<AppointmentType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if self.status.is_some_and(|status| status != appointment.status) {
            return false;
        }
        if self
            .appointment_type
            .is_some_and(|kind| kind != appointment.appointment_type)
        {
            return false;
        }
        if self.from.is_some_and(|from| appointment.preferred_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| appointment.preferred_date > to) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                let requester_name = appointment.user.as_ref().and_then(|user| user.name());
                [
                    Some(appointment.id.as_str()),
                    appointment.reason.as_deref(),
                    appointment.notes.as_deref(),
                    appointment.patient_name.as_deref(),
                    requester_name,
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

/// Local copy of the appointment list backing the booking and history views.
#[derive(Debug, Clone, Default)]
pub struct AppointmentHistory {
    items: Vec<Appointment>,
    tab: Tab,
}

impl AppointmentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Appointment>) -> Self {
        let mut history = Self::default();
        history.replace_all(items);
        history
    }

    pub fn items(&self) -> &[Appointment] {
        &self.items
    }

    pub fn get(&self, appointment_id: &str) -> Option<&Appointment> {
        self.items.iter().find(|a| a.id == appointment_id)
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// The latest fetch wins outright.
    pub fn replace_all(&mut self, items: Vec<Appointment>) {
        self.items = items;
        self.sort();
    }

    /// Inserts or replaces by id.
    pub fn merge(&mut self, appointment: Appointment) {
        match self.items.iter_mut().find(|a| a.id == appointment.id) {
            Some(existing) => *existing = appointment,
            None => self.items.push(appointment),
        }
        self.sort();
    }

    fn sort(&mut self) {
        self.items.sort_by_key(|a| Reverse(a.scheduled_at()));
    }

    pub fn active_appointment(&self) -> Option<&Appointment> {
        self.items.iter().find(|a| a.is_active())
    }

    pub fn filtered(&self, filter: &HistoryFilter) -> Vec<&Appointment> {
        self.items.iter().filter(|a| filter.matches(a)).collect()
    }

    pub fn count_by_status(&self) -> BTreeMap<AppointmentStatus, usize> {
        let mut counts = BTreeMap::new();
        for appointment in &self.items {
            *counts.entry(appointment.status).or_insert(0) += 1;
        }
        counts
    }

    /// Refetches; on failure the current list is kept.
    pub async fn refresh(
        &mut self,
        service: &AppointmentService,
        scope: AppointmentScope,
    ) -> Result<(), ApiError> {
        let items = service.list(scope).await?;
        debug!("Refreshed appointment history with {} items", items.len());
        self.replace_all(items);
        Ok(())
    }
}
