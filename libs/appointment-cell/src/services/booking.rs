use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::{debug, info, warn};

use shared_config::PortalConfig;
use shared_models::ApiError;
use shared_utils::{sanitize_optional, sanitize_text, SlidingWindow, SubmitGuard};

use crate::models::{
    ActiveAppointmentSummary, Appointment, AppointmentType, BookAppointmentRequest, BookingError,
};
use crate::services::appointment::AppointmentService;
use crate::services::history::{AppointmentHistory, Tab};
use crate::services::slots::{is_clinic_slot, is_weekday};

/// Rejects weekends and days before `now`.
pub fn validate_date(date: NaiveDate, now: NaiveDateTime) -> Result<(), BookingError> {
    if !is_weekday(date) {
        return Err(BookingError::WeekendDate(date));
    }
    if date < now.date() {
        return Err(BookingError::DateInPast(date));
    }
    Ok(())
}

/// The time must be a clinic slot, and strictly later than `now` when the
/// date is today.
pub fn validate_time(
    date: NaiveDate,
    time: NaiveTime,
    now: NaiveDateTime,
) -> Result<(), BookingError> {
    if !is_clinic_slot(time) {
        return Err(BookingError::InvalidSlot(time));
    }
    if date == now.date() && time <= now.time() {
        return Err(BookingError::TimeInPast(time));
    }
    Ok(())
}

/// What happened to the chosen time when the date changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateChange {
    Kept,
    TimeCleared(NaiveTime),
}

#[derive(Debug, Clone, Default)]
pub struct BookingForm {
    appointment_type: AppointmentType,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    pub reason: String,
    pub notes: String,
    is_online: Option<bool>,
}

impl BookingForm {
    pub fn new(appointment_type: AppointmentType) -> Self {
        Self {
            appointment_type,
            ..Self::default()
        }
    }

    pub fn appointment_type(&self) -> AppointmentType {
        self.appointment_type
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn set_type(&mut self, appointment_type: AppointmentType) {
        self.appointment_type = appointment_type;
    }

    /// Overrides the flag otherwise derived from the appointment type.
    pub fn set_online(&mut self, is_online: bool) {
        self.is_online = Some(is_online);
    }

    pub fn is_online(&self) -> bool {
        self.is_online
            .unwrap_or(self.appointment_type == AppointmentType::OnlineConsultation)
    }

    /// An invalid date leaves the form untouched. A valid one re-checks the
    /// chosen time against it and clears the time if it no longer fits.
    pub fn set_date(
        &mut self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<DateChange, BookingError> {
        validate_date(date, now)?;
        self.date = Some(date);

        match self.time {
            Some(time) if validate_time(date, time, now).is_err() => {
                debug!("Clearing {} after date changed to {}", time, date);
                self.time = None;
                Ok(DateChange::TimeCleared(time))
            }
            _ => Ok(DateChange::Kept),
        }
    }

    pub fn set_time(&mut self, time: NaiveTime, now: NaiveDateTime) -> Result<(), BookingError> {
        match self.date {
            Some(date) => validate_time(date, time, now)?,
            None if !is_clinic_slot(time) => return Err(BookingError::InvalidSlot(time)),
            None => {}
        }
        self.time = Some(time);
        Ok(())
    }

    /// Runs every field check against `now` and builds the sanitized request.
    pub fn validate(&self, now: NaiveDateTime) -> Result<BookAppointmentRequest, BookingError> {
        let date = self.date.ok_or(BookingError::MissingDate)?;
        let time = self.time.ok_or(BookingError::MissingTime)?;

        validate_date(date, now)?;
        validate_time(date, time, now)?;

        Ok(BookAppointmentRequest {
            appointment_type: self.appointment_type,
            preferred_date: date,
            preferred_time: time,
            reason: sanitize_text(&self.reason),
            notes: sanitize_optional(&self.notes),
            is_online: self.is_online(),
        })
    }

    pub fn validate_now(&self) -> Result<BookAppointmentRequest, BookingError> {
        self.validate(Local::now().naive_local())
    }
}

pub struct BookingService {
    appointments: Arc<AppointmentService>,
    limiter: Mutex<SlidingWindow>,
    guard: SubmitGuard,
}

impl BookingService {
    pub fn new(appointments: Arc<AppointmentService>, config: &PortalConfig) -> Self {
        let limiter =
            SlidingWindow::new(config.booking_rate_limit, config.booking_rate_window());
        Self::with_limiter(appointments, limiter)
    }

    pub fn with_limiter(appointments: Arc<AppointmentService>, limiter: SlidingWindow) -> Self {
        Self {
            appointments,
            limiter: Mutex::new(limiter),
            guard: SubmitGuard::new(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.guard.is_submitting()
    }

    /// Every attempt that gets past the in-flight guard spends a token, even
    /// if the form then fails validation. Local state only changes on success.
    pub async fn submit(
        &self,
        form: &BookingForm,
        history: &mut AppointmentHistory,
        now: NaiveDateTime,
    ) -> Result<Appointment, BookingError> {
        let _ticket = self
            .guard
            .try_begin()
            .ok_or(BookingError::AlreadySubmitting)?;

        self.limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_acquire()
            .map_err(|limited| BookingError::RateLimited {
                retry_after_secs: limited.retry_after_secs(),
            })?;

        let request = form.validate(now)?;

        if let Some(existing) = history.active_appointment() {
            debug!("Booking blocked locally by appointment {}", existing.id);
            return Err(BookingError::ActiveAppointmentExists {
                existing: Box::new(existing.summary()),
            });
        }

        let appointment = self
            .appointments
            .create(&request)
            .await
            .map_err(conflict_to_booking_error)?;

        info!(
            "Booked {} on {} at {}",
            appointment.appointment_type,
            appointment.preferred_date,
            appointment.preferred_time.format("%H:%M")
        );

        history.merge(appointment.clone());
        history.set_tab(Tab::History);
        Ok(appointment)
    }

    pub async fn submit_now(
        &self,
        form: &BookingForm,
        history: &mut AppointmentHistory,
    ) -> Result<Appointment, BookingError> {
        self.submit(form, history, Local::now().naive_local()).await
    }
}

/// A 409 naming the blocking appointment becomes `ActiveAppointmentExists`.
fn conflict_to_booking_error(err: ApiError) -> BookingError {
    if let ApiError::Conflict {
        details: Some(details),
        ..
    } = &err
    {
        if let Some(summary) = existing_appointment(details) {
            warn!("Booking rejected by server: active appointment exists");
            return BookingError::ActiveAppointmentExists {
                existing: Box::new(summary),
            };
        }
    }
    BookingError::Api(err)
}

fn existing_appointment(details: &Value) -> Option<ActiveAppointmentSummary> {
    ["existingAppointment", "appointment"]
        .into_iter()
        .filter_map(|key| details.get(key))
        .find_map(|raw| serde_json::from_value(raw.clone()).ok())
}
