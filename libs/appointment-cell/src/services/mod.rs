pub mod appointment;
pub mod booking;
pub mod history;
pub mod lifecycle;
pub mod slots;

pub use appointment::{AppointmentScope, AppointmentService};
pub use booking::{validate_date, validate_time, BookingForm, BookingService, DateChange};
pub use history::{available_actions, AppointmentAction, AppointmentHistory, HistoryFilter, Tab};
pub use lifecycle::{
    can_transition, valid_transitions, validate_transition, AppointmentLifecycleService,
    AutoConfirm, ConfirmationPrompt, Transition,
};
pub use slots::{available_slots, clinic_slots, is_clinic_slot, is_weekday, next_weekday};
