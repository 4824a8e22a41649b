use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use shared_models::{Role, Session, UserProfile};

use crate::store::KeyValueStore;
use crate::token;
use crate::SessionError;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const ROLE_KEY: &str = "userRole";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    SignedOut,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Owns every read and write of the persisted session keys. Services receive
/// it as `Arc<SessionContext>`; nothing else touches the store.
pub struct SessionContext {
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    /// A context with no session, regardless of what the store holds.
    pub fn signed_out(store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::SignedOut);
        Self { store, state }
    }

    /// Rebuilds the session persisted by a previous run. Anything partial,
    /// undecodable or expired is wiped.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let context = Self::signed_out(store);

        match context.load_persisted() {
            Ok(Some(session)) => {
                info!("Restored session for {} ({})", session.user.email, session.role);
                context.state.send_replace(SessionState::Authenticated(session));
            }
            Ok(None) => {
                debug!("No persisted session");
            }
            Err(e) => {
                warn!("Discarding persisted session: {}", e);
                if let Err(clear_err) = context.clear_store() {
                    warn!("Failed to clear session store: {}", clear_err);
                }
            }
        }

        context
    }

    fn load_persisted(&self) -> Result<Option<Session>, SessionError> {
        let token = self.store.get(TOKEN_KEY)?;
        let user = self.store.get(USER_KEY)?;
        let role = self.store.get(ROLE_KEY)?;

        let (token, user, role) = match (token, user, role) {
            (None, None, None) => return Ok(None),
            (Some(token), Some(user), Some(role)) => (token, user, role),
            _ => return Err(SessionError::Incomplete),
        };

        if token.trim().is_empty() {
            return Err(SessionError::Incomplete);
        }

        if token::is_expired(&token, Utc::now().timestamp()) {
            return Err(SessionError::Expired);
        }

        let user: UserProfile = serde_json::from_str(&user)
            .map_err(|e| SessionError::Corrupt(format!("user profile: {}", e)))?;
        let role: Role = role
            .parse()
            .map_err(|e: String| SessionError::Corrupt(e))?;

        Ok(Some(Session { token, user, role }))
    }

    /// Persists a freshly issued session and publishes it.
    pub fn begin(&self, session: Session) -> Result<(), SessionError> {
        let user = serde_json::to_string(&session.user)
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        self.store.set(TOKEN_KEY, &session.token)?;
        self.store.set(USER_KEY, &user)?;
        self.store.set(ROLE_KEY, session.role.as_str())?;

        info!("Session started for {} ({})", session.user.email, session.role);
        self.state.send_replace(SessionState::Authenticated(session));
        Ok(())
    }

    /// Clears the persisted keys and publishes `SignedOut`. Safe to call when
    /// already signed out.
    pub fn invalidate(&self, reason: &str) {
        warn!("Invalidating session: {}", reason);
        if let Err(e) = self.clear_store() {
            warn!("Failed to clear session store: {}", e);
        }
        self.state.send_replace(SessionState::SignedOut);
    }

    pub fn logout(&self) {
        info!("Logging out");
        if let Err(e) = self.clear_store() {
            warn!("Failed to clear session store: {}", e);
        }
        self.state.send_replace(SessionState::SignedOut);
    }

    fn clear_store(&self) -> Result<(), SessionError> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        self.store.remove(ROLE_KEY)?;
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        match &*self.state.borrow() {
            SessionState::Authenticated(session) => Some(session.clone()),
            SessionState::SignedOut => None,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|session| session.token)
    }

    pub fn role(&self) -> Option<Role> {
        self.current().map(|session| session.role)
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.current().map(|session| session.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Notified on every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
