use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::{AuthError, AuthService, LoginRequest};
use shared_api::ApiClient;
use shared_models::{ApiError, Role};
use shared_session::{KeyValueStore, MemoryStore, SessionContext, ROLE_KEY, TOKEN_KEY};
use shared_utils::test_utils::{MockApiResponses, TestConfig, TestUser};

fn signed_out_service(base_url: &str) -> (AuthService, Arc<MemoryStore>, Arc<SessionContext>) {
    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(SessionContext::signed_out(store.clone()));
    let config = TestConfig::with_base_url(base_url).to_portal_config();
    let api = Arc::new(ApiClient::new(&config, session.clone()));
    (AuthService::new(api), store, session)
}

#[tokio::test]
async fn test_login_persists_session() {
    let mock_server = MockServer::start().await;
    let user = TestUser::clinic("staff@clinic.test");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "staff@clinic.test", "password": "hunter22" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::login_response(&user)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (service, store, session) = signed_out_service(&mock_server.uri());

    let result = service
        .login(LoginRequest {
            email: "  Staff@Clinic.test ".to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.role, Role::Clinic);
    assert_eq!(session.role(), Some(Role::Clinic));
    assert_eq!(store.get(ROLE_KEY).unwrap(), Some("clinic".to_string()));
    assert_eq!(store.get(TOKEN_KEY).unwrap(), Some(result.token));
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (service, _, _) = signed_out_service(&mock_server.uri());

    let err = service
        .login(LoginRequest {
            email: "".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::MissingCredentials);
}

#[tokio::test]
async fn test_login_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(MockApiResponses::error_response("Invalid email or password")),
        )
        .mount(&mock_server)
        .await;

    let (service, _, session) = signed_out_service(&mock_server.uri());

    let err = service
        .login(LoginRequest {
            email: "jane@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::Api(ApiError::BadRequest { .. }));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_login_wrong_password_is_not_a_session_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid email or password"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (service, store, session) = signed_out_service(&mock_server.uri());
    let mut changes = session.subscribe();

    let err = service
        .login(LoginRequest {
            email: "jane@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::InvalidCredentials);
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(!changes.has_changed().unwrap());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let user = TestUser::patient("jane@example.com");
    let api = user.client(&mock_server.uri());
    let session = api.session().clone();
    let service = AuthService::new(api);

    assert!(session.is_authenticated());
    service.logout().await;
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_profile() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("jane@example.com");

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": user.id,
            "name": "Jane Doe",
            "email": "jane@example.com",
            "role": "user"
        })))
        .mount(&mock_server)
        .await;

    let service = AuthService::new(user.client(&mock_server.uri()));
    let profile = service.profile().await.unwrap();

    assert_eq!(profile.id, user.id);
    assert_eq!(profile.display_name(), "Jane Doe");
}
