use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_api::ApiClient;
use shared_config::PortalConfig;
use shared_models::{Role, Session, UserProfile};
use shared_session::{MemoryStore, SessionContext};

pub struct TestConfig {
    pub api_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
        }
    }

    pub fn to_portal_config(&self) -> PortalConfig {
        PortalConfig {
            api_base_url: self.api_base_url.clone(),
            ..PortalConfig::default()
        }
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient("test@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            name: "Test User".to_string(),
            role,
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::User)
    }

    pub fn clinic(email: &str) -> Self {
        Self::new(email, Role::Clinic)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            email: self.email.clone(),
            role: Some(self.role),
            phone: None,
        }
    }

    pub fn to_session(&self) -> Session {
        Session {
            token: JwtTestUtils::create_test_token(self, Some(24)),
            user: self.to_profile(),
            role: self.role,
        }
    }

    /// A session context already signed in as this user, backed by memory.
    pub fn signed_in(&self) -> Arc<SessionContext> {
        let context = SessionContext::signed_out(Arc::new(MemoryStore::new()));
        context
            .begin(self.to_session())
            .expect("memory store never fails");
        Arc::new(context)
    }

    pub fn client(&self, base_url: &str) -> Arc<ApiClient> {
        let config = TestConfig::with_base_url(base_url).to_portal_config();
        Arc::new(ApiClient::new(&config, self.signed_in()))
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    /// Unsigned token shaped like the backend's: the client never verifies
    /// signatures, it only reads `exp`.
    pub fn create_test_token(user: &TestUser, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "id": user.id,
            "role": user.role.as_str(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string()),
            URL_SAFE_NO_PAD.encode("test-signature")
        )
    }

    pub fn create_expired_token(user: &TestUser) -> String {
        Self::create_test_token(user, Some(-1))
    }
}

pub struct MockApiResponses;

impl MockApiResponses {
    pub fn login_response(user: &TestUser) -> Value {
        json!({
            "token": JwtTestUtils::create_test_token(user, Some(24)),
            "user": {
                "_id": user.id,
                "name": user.name,
                "email": user.email,
                "role": user.role.as_str()
            }
        })
    }

    pub fn appointment(id: &str, status: &str, kind: &str, date: &str, time: &str) -> Value {
        json!({
            "_id": id,
            "user": "user-1",
            "patientName": "Jane Doe",
            "preferredDate": date,
            "preferredTime": time,
            "type": kind,
            "reason": "Check-up",
            "notes": "",
            "status": status,
            "createdAt": "2026-10-01T08:00:00Z"
        })
    }

    pub fn online_appointment(id: &str, status: &str, chat_enabled: bool) -> Value {
        let mut appointment =
            Self::appointment(id, status, "Online Consultation", "2026-10-26", "10:00");
        appointment["consultationDetails"] = json!({
            "chatEnabled": chat_enabled,
            "meetLink": "https://meet.google.com/abc-defg-hij"
        });
        appointment
    }

    pub fn chat_message(id: &str, sender: &str, text: &str, read: bool) -> Value {
        json!({
            "_id": id,
            "sender": sender,
            "message": text,
            "timestamp": "2026-10-19T09:00:00Z",
            "read": read
        })
    }

    pub fn chat_thread(appointment_id: &str, messages: Vec<Value>) -> Value {
        json!({
            "appointmentId": appointment_id,
            "messages": messages
        })
    }

    pub fn notification(id: &str, read: bool) -> Value {
        json!({
            "_id": id,
            "title": "Appointment confirmed",
            "message": "Your appointment on 2026-10-26 at 10:00 was confirmed",
            "type": "appointment",
            "read": read,
            "createdAt": "2026-10-19T09:00:00Z"
        })
    }

    pub fn inventory_item(id: &str, name: &str, quantity: u32) -> Value {
        json!({
            "_id": id,
            "name": name,
            "category": "Medicine",
            "quantity": quantity,
            "unit": "tablets",
            "expiryDate": "2027-06-30",
            "lowStockThreshold": 10
        })
    }

    pub fn patient(id: &str, name: &str) -> Value {
        json!({
            "_id": id,
            "name": name,
            "email": format!("{}@example.com", id),
            "phone": "0871234567",
            "dateOfBirth": "1990-04-12",
            "sex": "Female",
            "address": "12 Main Street",
            "visits": [],
            "archived": false
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({ "message": message })
    }
}
