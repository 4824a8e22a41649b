use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use shared_api::{ApiClient, Method};
use shared_models::ApiError;
use shared_utils::{sanitize_optional, SubmitGuard};

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

#[derive(Deserialize)]
#[serde(untagged)]
enum PatientListPayload {
    Wrapped { patients: Vec<Patient> },
    Bare(Vec<Patient>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatientPayload {
    Wrapped { patient: Patient },
    Bare(Patient),
}

impl PatientPayload {
    fn into_inner(self) -> Patient {
        match self {
            PatientPayload::Wrapped { patient } | PatientPayload::Bare(patient) => patient,
        }
    }
}

fn clean(field: Option<String>) -> Option<String> {
    field.as_deref().and_then(sanitize_optional)
}

fn check_email(email: Option<&str>) -> Result<(), PatientError> {
    match email {
        Some(email) if !email.contains('@') => Err(PatientError::ValidationError(format!(
            "{} is not a valid email address",
            email
        ))),
        _ => Ok(()),
    }
}

fn check_date_of_birth(dob: Option<NaiveDate>, today: NaiveDate) -> Result<(), PatientError> {
    match dob {
        Some(dob) if dob > today => Err(PatientError::InvalidDateOfBirth),
        _ => Ok(()),
    }
}

pub struct PatientService {
    api: Arc<ApiClient>,
    create_guard: SubmitGuard,
}

impl PatientService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            create_guard: SubmitGuard::new(),
        }
    }

    pub async fn list(&self, include_archived: bool) -> Result<Vec<Patient>, ApiError> {
        let payload: PatientListPayload = self
            .api
            .request_with_query(
                Method::GET,
                "/patients",
                &[("includeArchived", include_archived)],
            )
            .await?;
        let patients = match payload {
            PatientListPayload::Wrapped { patients } | PatientListPayload::Bare(patients) => {
                patients
            }
        };
        debug!("Fetched {} patients", patients.len());
        Ok(patients)
    }

    pub async fn get(&self, patient_id: &str) -> Result<Patient, ApiError> {
        let payload: PatientPayload = self.api.get(&format!("/patients/{}", patient_id)).await?;
        Ok(payload.into_inner())
    }

    /// A second call while one is in flight fails with `AlreadySubmitting`.
    pub async fn create(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let _ticket = self
            .create_guard
            .try_begin()
            .ok_or(PatientError::AlreadySubmitting)?;

        let name = sanitize_optional(&request.name)
            .ok_or_else(|| PatientError::ValidationError("name is required".to_string()))?;
        let request = CreatePatientRequest {
            name,
            email: clean(request.email),
            phone: clean(request.phone),
            sex: clean(request.sex),
            address: clean(request.address),
            date_of_birth: request.date_of_birth,
        };
        check_email(request.email.as_deref())?;
        check_date_of_birth(request.date_of_birth, Local::now().date_naive())?;

        let payload: PatientPayload = self
            .api
            .post("/patients", serde_json::to_value(&request).map_err(ApiError::from)?)
            .await?;
        let patient = payload.into_inner();
        info!("Created patient record {}", patient.id);
        Ok(patient)
    }

    pub fn is_creating(&self) -> bool {
        self.create_guard.is_submitting()
    }

    pub async fn update(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let name = match request.name {
            Some(name) => Some(sanitize_optional(&name).ok_or_else(|| {
                PatientError::ValidationError("name cannot be empty".to_string())
            })?),
            None => None,
        };
        let request = UpdatePatientRequest {
            name,
            email: clean(request.email),
            phone: clean(request.phone),
            sex: clean(request.sex),
            address: clean(request.address),
            date_of_birth: request.date_of_birth,
        };
        check_email(request.email.as_deref())?;
        check_date_of_birth(request.date_of_birth, Local::now().date_naive())?;

        let payload: PatientPayload = self
            .api
            .put(
                &format!("/patients/{}", patient_id),
                serde_json::to_value(&request).map_err(ApiError::from)?,
            )
            .await?;
        debug!("Updated patient {}", patient_id);
        Ok(payload.into_inner())
    }

    pub async fn archive(&self, patient_id: &str) -> Result<Patient, ApiError> {
        self.set_archived(patient_id, "archive").await
    }

    pub async fn restore(&self, patient_id: &str) -> Result<Patient, ApiError> {
        self.set_archived(patient_id, "restore").await
    }

    async fn set_archived(&self, patient_id: &str, action: &str) -> Result<Patient, ApiError> {
        let payload: PatientPayload = self
            .api
            .patch(&format!("/patients/{}/{}", patient_id, action), json!({}))
            .await?;
        let patient = payload.into_inner();
        info!("Patient {} {}d", patient_id, action);
        Ok(patient)
    }
}

/// Case-insensitive match on name and email; phone numbers match ignoring
/// spacing and punctuation.
pub fn search_patients<'a>(patients: &'a [Patient], term: &str) -> Vec<&'a Patient> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return patients.iter().collect();
    }
    let digits: String = term.chars().filter(char::is_ascii_digit).collect();

    patients
        .iter()
        .filter(|patient| {
            patient.name.to_lowercase().contains(&term)
                || patient
                    .email
                    .as_deref()
                    .is_some_and(|email| email.to_lowercase().contains(&term))
                || (!digits.is_empty()
                    && patient.phone.as_deref().is_some_and(|phone| {
                        phone
                            .chars()
                            .filter(char::is_ascii_digit)
                            .collect::<String>()
                            .contains(&digits)
                    }))
        })
        .collect()
}
