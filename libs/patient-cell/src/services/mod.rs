pub mod patient;

pub use patient::{search_patients, PatientService};
