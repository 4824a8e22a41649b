// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_models::{ApiError, Role};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "userId", alias = "patientId")]
    pub user: Option<Requester>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(alias = "date", with = "ymd")]
    pub preferred_date: NaiveDate,
    #[serde(alias = "time", with = "hhmm")]
    pub preferred_time: NaiveTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub meet_link: Option<String>,
    #[serde(default)]
    pub queue_number: Option<u32>,
    #[serde(default)]
    pub queue_status: Option<String>,
    #[serde(default)]
    pub consultation_details: Option<ConsultationDetails>,
    #[serde(default)]
    pub consultation_notes: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_online(&self) -> bool {
        self.appointment_type == AppointmentType::OnlineConsultation
    }

    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.preferred_date.and_time(self.preferred_time)
    }

    pub fn chat_enabled(&self) -> bool {
        self.consultation_details
            .as_ref()
            .map(|details| details.chat_enabled)
            .unwrap_or(false)
    }

    /// Chat is server-enabled per appointment and closes once completed.
    pub fn chat_available(&self) -> bool {
        self.chat_enabled() && self.status != AppointmentStatus::Completed
    }

    pub fn meeting_link(&self) -> Option<&str> {
        self.meet_link.as_deref().or_else(|| {
            self.consultation_details
                .as_ref()
                .and_then(|details| details.meet_link.as_deref())
        })
    }

    pub fn requester_id(&self) -> Option<&str> {
        self.user.as_ref().map(Requester::id)
    }

    pub fn summary(&self) -> ActiveAppointmentSummary {
        ActiveAppointmentSummary {
            id: Some(self.id.clone()),
            preferred_date: Some(self.preferred_date),
            preferred_time: Some(self.preferred_time.format("%H:%M").to_string()),
            status: Some(self.status),
            appointment_type: Some(self.appointment_type),
        }
    }
}

/// The backend sends either the bare user id or the populated user document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Requester {
    Id(String),
    Profile(RequesterProfile),
}

impl Requester {
    pub fn id(&self) -> &str {
        match self {
            Requester::Id(id) => id,
            Requester::Profile(profile) => &profile.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Requester::Id(_) => None,
            Requester::Profile(profile) => profile.name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequesterProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AppointmentStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "confirmed")]
    Confirmed,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "cancelled", alias = "Canceled")]
    Cancelled,
    #[serde(alias = "declined", alias = "Rejected")]
    Declined,
    #[serde(alias = "rescheduled")]
    Rescheduled,
}

impl AppointmentStatus {
    /// Statuses that count against the one-active-appointment rule.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::Declined
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "Pending"),
            AppointmentStatus::Confirmed => write!(f, "Confirmed"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Declined => write!(f, "Declined"),
            AppointmentStatus::Rescheduled => write!(f, "Rescheduled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentType {
    #[default]
    #[serde(rename = "Clinic Visit", alias = "clinic", alias = "Clinic")]
    ClinicVisit,

    #[serde(rename = "Online Consultation", alias = "online", alias = "Online")]
    OnlineConsultation,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::ClinicVisit => write!(f, "Clinic Visit"),
            AppointmentType::OnlineConsultation => write!(f, "Online Consultation"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationDetails {
    #[serde(default)]
    pub chat_enabled: bool,
    #[serde(default)]
    pub meet_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[serde(alias = "name", alias = "medicine")]
    pub medication: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Who is acting on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Clinic,
    Patient,
}

impl Actor {
    pub fn from_role(role: Role) -> Self {
        if role.is_staff() {
            Actor::Clinic
        } else {
            Actor::Patient
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Clinic => write!(f, "clinic"),
            Actor::Patient => write!(f, "patient"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub preferred_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub preferred_time: NaiveTime,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub preferred_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub preferred_time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_meet_link: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultation_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescriptions: Option<Vec<Prescription>>,
}

impl StatusUpdate {
    pub fn to(status: AppointmentStatus) -> Self {
        Self {
            status,
            create_meet_link: None,
            reason: None,
            consultation_notes: None,
            prescriptions: None,
        }
    }
}

/// Server-side filters for the clinic's appointment list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// What the backend tells us about an appointment blocking a new booking.
/// Every field is optional because the rejection payload is loosely shaped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAppointmentSummary {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "date", with = "ymd::option")]
    pub preferred_date: Option<NaiveDate>,
    #[serde(default, alias = "time")]
    pub preferred_time: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default, rename = "type")]
    pub appointment_type: Option<AppointmentType>,
}

impl fmt::Display for ActiveAppointmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .appointment_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "appointment".to_string());
        write!(f, "{}", kind)?;
        if let Some(date) = self.preferred_date {
            write!(f, " on {}", date)?;
        }
        if let Some(time) = &self.preferred_time {
            write!(f, " at {}", time)?;
        }
        if let Some(status) = self.status {
            write!(f, " ({})", status)?;
        }
        Ok(())
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Please select a preferred date")]
    MissingDate,

    #[error("Please select a preferred time")]
    MissingTime,

    #[error("Appointments are only available Monday to Friday ({0} is a weekend)")]
    WeekendDate(NaiveDate),

    #[error("{0} is in the past")]
    DateInPast(NaiveDate),

    #[error("{0} has already passed today, please pick a later time")]
    TimeInPast(NaiveTime),

    #[error("{0} is not one of the clinic's appointment slots")]
    InvalidSlot(NaiveTime),

    #[error("You already have an active {existing}")]
    ActiveAppointmentExists { existing: Box<ActiveAppointmentSummary> },

    #[error("Too many booking attempts, please wait {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("A booking is already being submitted")]
    AlreadySubmitting,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("The {actor} cannot {action} this appointment")]
    NotPermitted { actor: Actor, action: &'static str },

    #[error("A reason is required")]
    ReasonRequired,

    #[error("Action cancelled")]
    ConfirmationDeclined,

    #[error(transparent)]
    Schedule(#[from] BookingError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

// ==============================================================================
// SERDE HELPERS
// ==============================================================================

/// `HH:MM` on the wire; `HH:MM:SS` is accepted on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

/// Calendar dates. Accepts `YYYY-MM-DD` as well as a full ISO timestamp, in
/// which case the date as written is kept and the offset ignored.
pub mod ymd {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local().date()))
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|dt| dt.date())
            })
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw))),
                None => Ok(None),
            }
        }
    }
}
