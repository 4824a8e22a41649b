use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub api_base_url: String,
    pub session_file: String,
    pub notification_poll_seconds: u64,
    pub chat_poll_seconds: u64,
    pub unread_poll_seconds: u64,
    pub booking_rate_limit: u32,
    pub booking_rate_window_seconds: u64,
    pub request_timeout_seconds: Option<u64>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            session_file: ".clinic-session.json".to_string(),
            notification_poll_seconds: 30,
            chat_poll_seconds: 3,
            unread_poll_seconds: 10,
            booking_rate_limit: 10,
            booking_rate_window_seconds: 60,
            request_timeout_seconds: None,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            api_base_url: env::var("CLINIC_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("CLINIC_API_URL not set, using default");
                    defaults.api_base_url.clone()
                }),
            session_file: env::var("CLINIC_SESSION_FILE")
                .unwrap_or_else(|_| defaults.session_file.clone()),
            notification_poll_seconds: number_from_env(
                "NOTIFICATION_POLL_SECONDS",
                defaults.notification_poll_seconds,
            ),
            chat_poll_seconds: number_from_env("CHAT_POLL_SECONDS", defaults.chat_poll_seconds),
            unread_poll_seconds: number_from_env("UNREAD_POLL_SECONDS", defaults.unread_poll_seconds),
            booking_rate_limit: number_from_env("BOOKING_RATE_LIMIT", defaults.booking_rate_limit),
            booking_rate_window_seconds: number_from_env(
                "BOOKING_RATE_WINDOW_SECONDS",
                defaults.booking_rate_window_seconds,
            ),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|raw| match raw.parse::<u64>() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        warn!("REQUEST_TIMEOUT_SECONDS is not a number ({}), ignoring", raw);
                        None
                    }
                }),
        };

        if !config.is_configured() {
            warn!("Portal not fully configured - missing API base URL");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_seconds.max(1))
    }

    pub fn chat_poll_interval(&self) -> Duration {
        Duration::from_secs(self.chat_poll_seconds.max(1))
    }

    pub fn unread_poll_interval(&self) -> Duration {
        Duration::from_secs(self.unread_poll_seconds.max(1))
    }

    pub fn booking_rate_window(&self) -> Duration {
        Duration::from_secs(self.booking_rate_window_seconds.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

fn number_from_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} is not a valid number ({}), using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
