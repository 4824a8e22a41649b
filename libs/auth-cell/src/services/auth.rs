use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use shared_api::{ApiClient, Method};
use shared_models::{ApiError, LoginResponse, Session, UserProfile};
use shared_session::SessionContext;

use crate::models::{AuthError, LoginRequest};

pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn session(&self) -> &Arc<SessionContext> {
        self.api.session()
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<Session, AuthError> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        debug!("Logging in");

        let response: LoginResponse = self
            .api
            .post(
                "/auth/login",
                json!({ "email": email, "password": request.password }),
            )
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(_) | ApiError::SessionExpired(_) => {
                    warn!("Login rejected: {}", e.message());
                    AuthError::InvalidCredentials
                }
                other => AuthError::Api(other),
            })?;

        let role = response.user.role.ok_or(AuthError::MissingRole)?;
        let session = Session {
            token: response.token,
            user: response.user,
            role,
        };

        self.session().begin(session.clone())?;
        info!("Logged in as {} ({})", session.user.email, session.role);

        Ok(session)
    }

    /// Tells the backend, then clears local state whether or not it answered.
    pub async fn logout(&self) {
        if self.session().is_authenticated() {
            if let Err(e) = self.api.execute(Method::POST, "/auth/logout", None).await {
                warn!("Logout request failed, clearing local session anyway: {}", e);
            }
        }
        self.session().logout();
    }

    pub async fn profile(&self) -> Result<UserProfile, AuthError> {
        let profile: UserProfile = self.api.get("/auth/me").await?;
        debug!("Fetched profile for {}", profile.email);
        Ok(profile)
    }
}
