use std::sync::Arc;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::PortalConfig;
use shared_models::ApiError;
use shared_session::SessionContext;

/// Backend messages that mean the stored session is no longer usable, even
/// when they arrive with a status other than 401.
const SESSION_FAILURE_MESSAGES: &[&str] = &[
    "invalid token",
    "token expired",
    "jwt expired",
    "jwt malformed",
    "no token",
    "not authorized, token failed",
    "user not found",
];

pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiClient {
    pub fn new(config: &PortalConfig, session: Arc<SessionContext>) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with options ({}), using defaults", e);
            Client::new()
        });

        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = self.session.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value, sending without it"),
            }
        }

        headers
    }

    fn build(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        self.client.request(method, &url).headers(self.get_headers())
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut req = self.build(method, path);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let text = self.dispatch(req).await?;
        decode(&text)
    }

    pub async fn request_with_query<T, Q>(&self, method: Method, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let req = self.build(method, path).query(query);
        let text = self.dispatch(req).await?;
        decode(&text)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// For calls whose response body carries nothing the caller needs.
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), ApiError> {
        let mut req = self.build(method, path);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        self.dispatch(req).await.map(|_| ())
    }

    async fn dispatch(&self, req: RequestBuilder) -> Result<String, ApiError> {
        let request = req.build().map_err(|e| ApiError::Network(e.to_string()))?;
        let sent_token = request.headers().contains_key(AUTHORIZATION);

        let response = self.client.execute(request).await.map_err(|e| {
            error!("Request failed: {}", e);
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if status.is_success() {
            return Ok(text);
        }

        error!("API error ({}): {}", status, text);

        let body = serde_json::from_str::<Value>(&text).ok();
        let err = ApiError::from_status(status.as_u16(), &text, body);

        // Without a bearer token there is no session to expire; a 401 here is
        // a credential rejection and is returned as is.
        if sent_token && (status.as_u16() == 401 || is_session_failure(&err.message())) {
            let reason = err.message();
            self.session.invalidate(&reason);
            return Err(ApiError::SessionExpired(reason));
        }

        Err(err)
    }
}

fn is_session_failure(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    SESSION_FAILURE_MESSAGES
        .iter()
        .any(|needle| lowered.contains(needle))
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    if text.trim().is_empty() {
        return serde_json::from_value(Value::Null).map_err(ApiError::from);
    }

    serde_json::from_str(text).map_err(|e| {
        error!("Failed to decode response: {}", e);
        ApiError::Decode(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_failure_messages() {
        assert!(is_session_failure("Not authorized, token failed"));
        assert!(is_session_failure("jwt expired"));
        assert!(is_session_failure("User not found"));
        assert!(!is_session_failure("Appointment not found"));
    }

    #[test]
    fn test_decode_empty_body_as_unit() {
        assert!(decode::<()>("").is_ok());
        assert!(decode::<Vec<String>>("").is_err());
    }
}
