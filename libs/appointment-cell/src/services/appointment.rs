use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use shared_api::{ApiClient, Method};
use shared_models::ApiError;

use crate::models::{
    Appointment, AppointmentQuery, BookAppointmentRequest, RescheduleRequest, StatusUpdate,
};

/// Whose appointments a list call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    Mine,
    Clinic,
}

// Some endpoints wrap their payload, others return it bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum AppointmentPayload {
    Wrapped { appointment: Appointment },
    Bare(Appointment),
}

impl AppointmentPayload {
    fn into_inner(self) -> Appointment {
        match self {
            AppointmentPayload::Wrapped { appointment } => appointment,
            AppointmentPayload::Bare(appointment) => appointment,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AppointmentListPayload {
    Wrapped { appointments: Vec<Appointment> },
    Bare(Vec<Appointment>),
}

impl AppointmentListPayload {
    fn into_inner(self) -> Vec<Appointment> {
        match self {
            AppointmentListPayload::Wrapped { appointments } => appointments,
            AppointmentListPayload::Bare(appointments) => appointments,
        }
    }
}

pub struct AppointmentService {
    api: Arc<ApiClient>,
}

impl AppointmentService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub async fn list_mine(&self) -> Result<Vec<Appointment>, ApiError> {
        let payload: AppointmentListPayload = self.api.get("/appointments/my").await?;
        let appointments = payload.into_inner();
        debug!("Fetched {} appointments for current user", appointments.len());
        Ok(appointments)
    }

    pub async fn list_clinic(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, ApiError> {
        let payload: AppointmentListPayload = self
            .api
            .request_with_query(Method::GET, "/appointments", query)
            .await?;
        let appointments = payload.into_inner();
        debug!("Fetched {} clinic appointments", appointments.len());
        Ok(appointments)
    }

    pub async fn list(&self, scope: AppointmentScope) -> Result<Vec<Appointment>, ApiError> {
        match scope {
            AppointmentScope::Mine => self.list_mine().await,
            AppointmentScope::Clinic => self.list_clinic(&AppointmentQuery::default()).await,
        }
    }

    pub async fn get(&self, appointment_id: &str) -> Result<Appointment, ApiError> {
        let payload: AppointmentPayload = self
            .api
            .get(&format!("/appointments/{}", appointment_id))
            .await?;
        Ok(payload.into_inner())
    }

    #[instrument(skip(self, request), fields(date = %request.preferred_date))]
    pub async fn create(&self, request: &BookAppointmentRequest) -> Result<Appointment, ApiError> {
        let payload: AppointmentPayload = self
            .api
            .post("/appointments", serde_json::to_value(request)?)
            .await?;
        let appointment = payload.into_inner();
        info!("Created appointment {} ({})", appointment.id, appointment.status);
        Ok(appointment)
    }

    pub async fn update_status(
        &self,
        appointment_id: &str,
        update: &StatusUpdate,
    ) -> Result<Appointment, ApiError> {
        let payload: AppointmentPayload = self
            .api
            .patch(
                &format!("/appointments/{}/status", appointment_id),
                serde_json::to_value(update)?,
            )
            .await?;
        Ok(payload.into_inner())
    }

    pub async fn cancel(&self, appointment_id: &str, reason: &str) -> Result<Appointment, ApiError> {
        let payload: AppointmentPayload = self
            .api
            .patch(
                &format!("/appointments/{}/cancel", appointment_id),
                json!({ "reason": reason }),
            )
            .await?;
        Ok(payload.into_inner())
    }

    /// The backend records the request; the appointment itself is untouched
    /// until the clinic acts on it.
    pub async fn request_reschedule(
        &self,
        appointment_id: &str,
        request: &RescheduleRequest,
    ) -> Result<(), ApiError> {
        self.api
            .execute(
                Method::POST,
                &format!("/appointments/{}/reschedule", appointment_id),
                Some(serde_json::to_value(request)?),
            )
            .await
    }
}
