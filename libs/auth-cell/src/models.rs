use serde::Serialize;
use thiserror::Error;

use shared_models::ApiError;
use shared_session::SessionError;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Login response did not include a role")]
    MissingRole,

    #[error("Failed to persist session: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
