use serde_json::Value;
use thiserror::Error;

/// Failure of a call against the clinic backend, after the response body has
/// been reduced to a message.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// 401 on a request that carried no credentials, such as a failed login.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        details: Option<Value>,
    },

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds the error for a non-success response. `body` is the decoded JSON
    /// body when the server sent one.
    pub fn from_status(status: u16, raw_text: &str, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| {
                if raw_text.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    raw_text.trim().to_string()
                }
            });

        match status {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            400 | 422 => ApiError::BadRequest { message, details: body },
            409 => ApiError::Conflict { message, details: body },
            _ => ApiError::Status { status, message },
        }
    }

    /// Structured payload carried by the server's rejection, if any.
    pub fn details(&self) -> Option<&Value> {
        match self {
            ApiError::BadRequest { details, .. } | ApiError::Conflict { details, .. } => {
                details.as_ref()
            }
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::NotAuthenticated => "Not authenticated".to_string(),
            ApiError::SessionExpired(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Network(msg)
            | ApiError::Decode(msg) => msg.clone(),
            ApiError::BadRequest { message, .. }
            | ApiError::Conflict { message, .. }
            | ApiError::Status { message, .. } => message.clone(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    pub fn is_session_error(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_) | ApiError::NotAuthenticated)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

fn extract_message(body: &Value) -> Option<String> {
    for key in ["message", "error", "msg"] {
        match body.get(key) {
            Some(Value::String(text)) if !text.is_empty() => return Some(text.clone()),
            Some(Value::Object(inner)) => {
                if let Some(Value::String(text)) = inner.get("message") {
                    return Some(text.clone());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conflict_keeps_payload() {
        let body = json!({
            "message": "You already have an active appointment",
            "existingAppointment": { "_id": "abc" }
        });
        let err = ApiError::from_status(409, &body.to_string(), Some(body.clone()));

        assert!(err.is_conflict());
        assert_eq!(err.message(), "You already have an active appointment");
        assert_eq!(err.details(), Some(&body));
    }

    #[test]
    fn test_nested_error_message() {
        let body = json!({ "error": { "message": "Item not found", "code": "E404" } });
        let err = ApiError::from_status(404, "", Some(body));
        assert_eq!(err.to_string(), "Not Found: Item not found");
    }

    #[test]
    fn test_plain_text_body() {
        let err = ApiError::from_status(500, "upstream exploded", None);
        assert_eq!(err.to_string(), "API error (500): upstream exploded");

        let empty = ApiError::from_status(502, "  ", None);
        assert_eq!(empty.message(), "HTTP 502");
    }

    #[test]
    fn test_unauthorized_needs_session_context() {
        let err = ApiError::from_status(401, "Invalid email or password", None);
        assert!(matches!(err, ApiError::Unauthorized(ref msg) if msg == "Invalid email or password"));
        assert!(!err.is_session_error());
    }
}
