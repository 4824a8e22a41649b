use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dashboard_cell::{DashboardService, DashboardSummary};
use shared_models::ApiError;
use shared_utils::test_utils::{MockApiResponses, TestUser};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

async fn mount_lists(mock_server: &MockServer) {
    let mut archived = MockApiResponses::patient("p3", "Old Record");
    archived["archived"] = json!(true);
    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::patient("p1", "Mary Byrne"),
            MockApiResponses::patient("p2", "John Walsh"),
            archived
        ])))
        .mount(mock_server)
        .await;

    let mut expired = MockApiResponses::inventory_item("i2", "Saline", 40);
    expired["expiryDate"] = json!("2026-09-30");
    let mut expiring = MockApiResponses::inventory_item("i3", "Insulin", 15);
    expiring["expiryDate"] = json!("2026-11-01");
    Mock::given(method("GET"))
        .and(path("/inventory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::inventory_item("i1", "Gauze", 3),
            expired,
            expiring
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_summary_cards() {
    let mock_server = MockServer::start().await;
    mount_lists(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::appointment("a1", "Pending", "Clinic Visit", "2026-10-19", "14:00"),
            MockApiResponses::appointment("a2", "Confirmed", "Clinic Visit", "2026-10-19", "15:00"),
            MockApiResponses::appointment("a3", "Cancelled", "Clinic Visit", "2026-10-19", "16:00"),
            MockApiResponses::appointment("a4", "Pending", "Online Consultation", "2026-10-21", "09:00")
        ])))
        .mount(&mock_server)
        .await;

    let service = DashboardService::new(
        TestUser::clinic("staff@clinic.test").client(&mock_server.uri()),
    );
    let summary = service.load(today()).await.unwrap();

    assert_eq!(
        summary,
        DashboardSummary {
            total_patients: 3,
            active_patients: 2,
            inventory_items: 3,
            low_stock_items: 1,
            expired_items: 1,
            expiring_soon_items: 1,
            pending_appointments: 2,
            confirmed_appointments: 1,
            todays_appointments: 2,
        }
    );
}

#[tokio::test]
async fn test_any_failed_list_fails_the_load() {
    let mock_server = MockServer::start().await;
    mount_lists(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let service = DashboardService::new(
        TestUser::clinic("staff@clinic.test").client(&mock_server.uri()),
    );
    let err = service.load(today()).await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 503, .. }));
}
