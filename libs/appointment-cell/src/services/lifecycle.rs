// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};

use shared_utils::sanitize_optional;

use crate::models::{
    Actor, Appointment, AppointmentError, AppointmentStatus, Prescription, RescheduleRequest,
    StatusUpdate,
};
use crate::services::appointment::AppointmentService;
use crate::services::booking::{validate_date, validate_time};

/// All statuses reachable from `from` in one step.
pub fn valid_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    match from {
        AppointmentStatus::Pending => &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Declined,
        ],
        AppointmentStatus::Confirmed => &[
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rescheduled,
        ],
        AppointmentStatus::Rescheduled => &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ],
        // Terminal states
        AppointmentStatus::Completed
        | AppointmentStatus::Cancelled
        | AppointmentStatus::Declined => &[],
    }
}

pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    valid_transitions(from).contains(&to)
}

pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), AppointmentError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        warn!("Invalid status transition attempted: {} -> {}", from, to);
        Err(AppointmentError::InvalidStatusTransition { from, to })
    }
}

/// A status change requested from an appointment card.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Confirm,
    /// Clinic turns the request down; recorded as `Cancelled`.
    Reject { reason: Option<String> },
    Decline { reason: Option<String> },
    Complete {
        consultation_notes: Option<String>,
        prescriptions: Vec<Prescription>,
    },
    Cancel { reason: String },
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::Confirm => AppointmentStatus::Confirmed,
            Transition::Reject { .. } | Transition::Cancel { .. } => AppointmentStatus::Cancelled,
            Transition::Decline { .. } => AppointmentStatus::Declined,
            Transition::Complete { .. } => AppointmentStatus::Completed,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::Reject { .. } => "reject",
            Transition::Decline { .. } => "decline",
            Transition::Complete { .. } => "complete",
            Transition::Cancel { .. } => "cancel",
        }
    }

    fn permitted_for(&self, actor: Actor) -> bool {
        match actor {
            Actor::Clinic => true,
            Actor::Patient => matches!(self, Transition::Cancel { .. }),
        }
    }
}

/// Asked before confirming an online consultation, which creates a meeting
/// link and opens chat on the backend.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, appointment: &Appointment, message: &str) -> bool;
}

/// Answers yes to everything. For non-interactive runs.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&self, _appointment: &Appointment, _message: &str) -> bool {
        true
    }
}

pub struct AppointmentLifecycleService {
    appointments: Arc<AppointmentService>,
    prompt: Arc<dyn ConfirmationPrompt>,
}

impl AppointmentLifecycleService {
    pub fn new(appointments: Arc<AppointmentService>, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        Self {
            appointments,
            prompt,
        }
    }

    /// Checks the actor and the state machine locally, then issues a single
    /// request. Returns the appointment as the server now has it.
    pub async fn apply(
        &self,
        actor: Actor,
        appointment: &Appointment,
        transition: Transition,
    ) -> Result<Appointment, AppointmentError> {
        if !transition.permitted_for(actor) {
            return Err(AppointmentError::NotPermitted {
                actor,
                action: transition.action(),
            });
        }

        let target = transition.target();
        validate_transition(appointment.status, target)?;
        debug!(
            "Applying {} to appointment {} ({} -> {})",
            transition.action(),
            appointment.id,
            appointment.status,
            target
        );

        let updated = match (actor, transition) {
            (Actor::Patient, Transition::Cancel { reason }) => {
                let reason = sanitize_optional(&reason).ok_or(AppointmentError::ReasonRequired)?;
                self.appointments.cancel(&appointment.id, &reason).await?
            }
            (_, Transition::Confirm) => {
                let mut update = StatusUpdate::to(AppointmentStatus::Confirmed);
                if appointment.is_online() {
                    let message = format!(
                        "Confirm the online consultation on {} at {}? A meeting link will be created and chat enabled.",
                        appointment.preferred_date,
                        appointment.preferred_time.format("%H:%M")
                    );
                    if !self.prompt.confirm(appointment, &message).await {
                        info!("Confirmation of {} declined at prompt", appointment.id);
                        return Err(AppointmentError::ConfirmationDeclined);
                    }
                    update.create_meet_link = Some(true);
                }
                self.appointments.update_status(&appointment.id, &update).await?
            }
            (_, Transition::Reject { reason } | Transition::Decline { reason }) => {
                let update = StatusUpdate {
                    reason: reason.as_deref().and_then(sanitize_optional),
                    ..StatusUpdate::to(target)
                };
                self.appointments.update_status(&appointment.id, &update).await?
            }
            (_, Transition::Complete { consultation_notes, prescriptions }) => {
                let update = StatusUpdate {
                    consultation_notes: consultation_notes.as_deref().and_then(sanitize_optional),
                    prescriptions: (!prescriptions.is_empty()).then_some(prescriptions),
                    ..StatusUpdate::to(AppointmentStatus::Completed)
                };
                self.appointments.update_status(&appointment.id, &update).await?
            }
            (_, Transition::Cancel { reason }) => {
                let update = StatusUpdate {
                    reason: sanitize_optional(&reason),
                    ..StatusUpdate::to(AppointmentStatus::Cancelled)
                };
                self.appointments.update_status(&appointment.id, &update).await?
            }
        };

        info!("Appointment {} is now {}", updated.id, updated.status);
        Ok(updated)
    }

    /// Sends a reschedule request under the booking date and time rules. The
    /// local appointment is left as is; callers refetch to see the outcome.
    pub async fn request_reschedule(
        &self,
        actor: Actor,
        appointment: &Appointment,
        date: NaiveDate,
        time: NaiveTime,
        reason: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<(), AppointmentError> {
        if !appointment.is_active() {
            return Err(AppointmentError::InvalidStatusTransition {
                from: appointment.status,
                to: AppointmentStatus::Rescheduled,
            });
        }

        validate_date(date, now)?;
        validate_time(date, time, now)?;

        let request = RescheduleRequest {
            preferred_date: date,
            preferred_time: time,
            reason: reason.and_then(sanitize_optional),
        };

        self.appointments
            .request_reschedule(&appointment.id, &request)
            .await?;
        info!(
            "{} requested reschedule of {} to {} {}",
            actor,
            appointment.id,
            date,
            time.format("%H:%M")
        );
        Ok(())
    }

    pub async fn request_reschedule_now(
        &self,
        actor: Actor,
        appointment: &Appointment,
        date: NaiveDate,
        time: NaiveTime,
        reason: Option<&str>,
    ) -> Result<(), AppointmentError> {
        self.request_reschedule(actor, appointment, date, time, reason, Local::now().naive_local())
            .await
    }
}
