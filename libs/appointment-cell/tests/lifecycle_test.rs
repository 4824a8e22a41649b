use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    available_actions, Actor, Appointment, AppointmentAction, AppointmentError, AppointmentHistory,
    AppointmentLifecycleService, AppointmentService, AppointmentStatus, AppointmentType,
    AutoConfirm, BookingError, BookingForm, BookingService, ConfirmationPrompt, Prescription,
    Transition,
};
use shared_utils::test_utils::{MockApiResponses, TestUser};
use shared_utils::SlidingWindow;

struct DenyPrompt;

#[async_trait]
impl ConfirmationPrompt for DenyPrompt {
    async fn confirm(&self, _appointment: &Appointment, _message: &str) -> bool {
        false
    }
}

fn lifecycle(base_url: &str, prompt: Arc<dyn ConfirmationPrompt>) -> AppointmentLifecycleService {
    let api = TestUser::clinic("staff@clinic.test").client(base_url);
    AppointmentLifecycleService::new(Arc::new(AppointmentService::new(api)), prompt)
}

fn clinic_visit(id: &str, status: &str) -> Value {
    MockApiResponses::appointment(id, status, "Clinic Visit", "2026-10-21", "10:00")
}

fn parse(value: Value) -> Appointment {
    serde_json::from_value(value).unwrap()
}

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2026-10-19 08:00", "%Y-%m-%d %H:%M").unwrap()
}

#[tokio::test]
async fn test_booked_visit_runs_through_to_completion() {
    let mock_server = MockServer::start().await;
    // 2026-10-19 is a Monday; the visit is for the following Monday.
    let booked_json = MockApiResponses::appointment("b1", "Pending", "Clinic Visit", "2026-10-26", "10:00");

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .and(body_partial_json(json!({
            "type": "Clinic Visit",
            "preferredDate": "2026-10-26",
            "preferredTime": "10:00"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "appointment": booked_json })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/b1/status"))
        .and(body_json(json!({ "status": "Confirmed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::appointment(
            "b1", "Confirmed", "Clinic Visit", "2026-10-26", "10:00",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/b1/status"))
        .and(body_partial_json(json!({ "status": "Completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::appointment(
            "b1", "Completed", "Clinic Visit", "2026-10-26", "10:00",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patient_api = TestUser::patient("jane@example.com").client(&mock_server.uri());
    let booking = BookingService::with_limiter(
        Arc::new(AppointmentService::new(patient_api)),
        SlidingWindow::new(10, Duration::from_secs(60)),
    );
    let clinic = lifecycle(&mock_server.uri(), Arc::new(AutoConfirm));

    let mut form = BookingForm::new(AppointmentType::ClinicVisit);
    form.set_date(NaiveDate::from_ymd_opt(2026, 10, 26).unwrap(), now()).unwrap();
    form.set_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap(), now()).unwrap();
    form.reason = "Follow-up".to_string();
    let mut history = AppointmentHistory::new();

    let booked = booking.submit(&form, &mut history, now()).await.unwrap();
    assert_eq!(booked.status, AppointmentStatus::Pending);

    let confirmed = clinic.apply(Actor::Clinic, &booked, Transition::Confirm).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let completed = clinic
        .apply(
            Actor::Clinic,
            &confirmed,
            Transition::Complete { consultation_notes: None, prescriptions: Vec::new() },
        )
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    history.merge(completed.clone());
    assert!(history.active_appointment().is_none());

    let err = clinic
        .apply(Actor::Clinic, &completed, Transition::Cancel { reason: "Too late".to_string() })
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppointmentError::InvalidStatusTransition { from: AppointmentStatus::Completed, .. }
    );
}

#[tokio::test]
async fn test_confirm_complete_then_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/a1/status"))
        .and(body_json(json!({ "status": "Confirmed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(clinic_visit("a1", "Confirmed")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/a1/status"))
        .and(body_partial_json(json!({
            "status": "Completed",
            "consultationNotes": "Rest and fluids",
            "prescriptions": [{ "medication": "Paracetamol", "dosage": "500mg" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appointment": clinic_visit("a1", "Completed")
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = lifecycle(&mock_server.uri(), Arc::new(AutoConfirm));
    let pending = parse(clinic_visit("a1", "Pending"));

    let confirmed = service
        .apply(Actor::Clinic, &pending, Transition::Confirm)
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let completed = service
        .apply(
            Actor::Clinic,
            &confirmed,
            Transition::Complete {
                consultation_notes: Some("Rest and fluids".to_string()),
                prescriptions: vec![Prescription {
                    medication: "Paracetamol".to_string(),
                    dosage: Some("500mg".to_string()),
                    frequency: None,
                    duration: None,
                    instructions: None,
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    for transition in [
        Transition::Confirm,
        Transition::Cancel { reason: "Changed my mind".to_string() },
        Transition::Decline { reason: None },
    ] {
        let err = service
            .apply(Actor::Clinic, &completed, transition)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            AppointmentError::InvalidStatusTransition { from: AppointmentStatus::Completed, .. }
        );
    }
    assert!(available_actions(Actor::Clinic, &completed).is_empty());
}

#[tokio::test]
async fn test_declined_prompt_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/o1/status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = lifecycle(&mock_server.uri(), Arc::new(DenyPrompt));
    let online = parse(MockApiResponses::online_appointment("o1", "Pending", false));

    let err = service
        .apply(Actor::Clinic, &online, Transition::Confirm)
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::ConfirmationDeclined);
}

#[tokio::test]
async fn test_online_confirmation_requests_meet_link() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/o1/status"))
        .and(body_json(json!({ "status": "Confirmed", "createMeetLink": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockApiResponses::online_appointment("o1", "Confirmed", true)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = lifecycle(&mock_server.uri(), Arc::new(AutoConfirm));
    let online = parse(MockApiResponses::online_appointment("o1", "Pending", false));

    let confirmed = service
        .apply(Actor::Clinic, &online, Transition::Confirm)
        .await
        .unwrap();

    assert!(confirmed.chat_available());
    let actions = available_actions(Actor::Patient, &confirmed);
    assert!(actions.contains(&AppointmentAction::JoinMeeting));
    assert!(actions.contains(&AppointmentAction::OpenChat));
}

#[tokio::test]
async fn test_patient_cancel_requires_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/appointments/a2/cancel"))
        .and(body_json(json!({ "reason": "Feeling better" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(clinic_visit("a2", "Cancelled")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = lifecycle(&mock_server.uri(), Arc::new(AutoConfirm));
    let pending = parse(clinic_visit("a2", "Pending"));

    let err = service
        .apply(Actor::Patient, &pending, Transition::Cancel { reason: "  ".to_string() })
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::ReasonRequired);

    let cancelled = service
        .apply(
            Actor::Patient,
            &pending,
            Transition::Cancel { reason: "Feeling better".to_string() },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_patient_cannot_confirm() {
    let mock_server = MockServer::start().await;
    let service = lifecycle(&mock_server.uri(), Arc::new(AutoConfirm));
    let pending = parse(clinic_visit("a3", "Pending"));

    let err = service
        .apply(Actor::Patient, &pending, Transition::Confirm)
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::NotPermitted { actor: Actor::Patient, action: "confirm" });
}

#[tokio::test]
async fn test_reschedule_request_follows_booking_rules() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/a4/reschedule"))
        .and(body_json(json!({
            "preferredDate": "2026-10-27",
            "preferredTime": "13:00",
            "reason": "Work trip"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Reschedule requested" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = lifecycle(&mock_server.uri(), Arc::new(AutoConfirm));
    let confirmed = parse(clinic_visit("a4", "Confirmed"));
    let one_pm = NaiveTime::from_hms_opt(13, 0, 0).unwrap();

    let err = service
        .request_reschedule(
            Actor::Patient,
            &confirmed,
            NaiveDate::from_ymd_opt(2026, 10, 25).unwrap(),
            one_pm,
            None,
            now(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::Schedule(BookingError::WeekendDate(_)));

    service
        .request_reschedule(
            Actor::Patient,
            &confirmed,
            NaiveDate::from_ymd_opt(2026, 10, 27).unwrap(),
            one_pm,
            Some("Work trip"),
            now(),
        )
        .await
        .unwrap();

    // The request does not change the local copy.
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_reschedule_rejected_for_finished_appointment() {
    let mock_server = MockServer::start().await;
    let service = lifecycle(&mock_server.uri(), Arc::new(AutoConfirm));
    let cancelled = parse(clinic_visit("a5", "Cancelled"));

    let err = service
        .request_reschedule(
            Actor::Patient,
            &cancelled,
            NaiveDate::from_ymd_opt(2026, 10, 27).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            None,
            now(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::InvalidStatusTransition { .. });
}
