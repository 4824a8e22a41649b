use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::try_join;
use serde::Serialize;
use tracing::debug;

use appointment_cell::{Appointment, AppointmentQuery, AppointmentService, AppointmentStatus};
use inventory_cell::{InventoryItem, InventoryService, EXPIRY_WARNING_DAYS};
use patient_cell::{Patient, PatientService};
use shared_api::ApiClient;
use shared_models::ApiError;

/// Counts behind the staff dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_patients: usize,
    pub active_patients: usize,
    pub inventory_items: usize,
    pub low_stock_items: usize,
    pub expired_items: usize,
    pub expiring_soon_items: usize,
    pub pending_appointments: usize,
    pub confirmed_appointments: usize,
    pub todays_appointments: usize,
}

pub fn summarize(
    patients: &[Patient],
    inventory: &[InventoryItem],
    appointments: &[Appointment],
    today: NaiveDate,
) -> DashboardSummary {
    let count_status = |status: AppointmentStatus| {
        appointments.iter().filter(|a| a.status == status).count()
    };

    DashboardSummary {
        total_patients: patients.len(),
        active_patients: patients.iter().filter(|p| p.is_active()).count(),
        inventory_items: inventory.len(),
        low_stock_items: inventory.iter().filter(|i| i.is_low_stock()).count(),
        expired_items: inventory.iter().filter(|i| i.is_expired(today)).count(),
        expiring_soon_items: inventory
            .iter()
            .filter(|i| i.expires_within(today, EXPIRY_WARNING_DAYS))
            .count(),
        pending_appointments: count_status(AppointmentStatus::Pending),
        confirmed_appointments: count_status(AppointmentStatus::Confirmed),
        // Turned-down and cancelled bookings do not occupy a slot today.
        todays_appointments: appointments
            .iter()
            .filter(|a| a.preferred_date == today)
            .filter(|a| {
                !matches!(
                    a.status,
                    AppointmentStatus::Cancelled | AppointmentStatus::Declined
                )
            })
            .count(),
    }
}

pub struct DashboardService {
    patients: PatientService,
    inventory: InventoryService,
    appointments: AppointmentService,
}

impl DashboardService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            patients: PatientService::new(api.clone()),
            inventory: InventoryService::new(api.clone()),
            appointments: AppointmentService::new(api),
        }
    }

    /// Fetches the three lists concurrently; any failure fails the load.
    pub async fn load(&self, today: NaiveDate) -> Result<DashboardSummary, ApiError> {
        let query = AppointmentQuery::default();
        let (patients, inventory, appointments) = try_join!(
            self.patients.list(true),
            self.inventory.list(),
            self.appointments.list_clinic(&query)
        )?;

        let summary = summarize(&patients, &inventory, &appointments, today);
        debug!("Dashboard summary: {:?}", summary);
        Ok(summary)
    }

    pub async fn load_now(&self) -> Result<DashboardSummary, ApiError> {
        self.load(Local::now().date_naive()).await
    }
}
