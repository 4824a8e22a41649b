pub mod context;
pub mod store;
pub mod token;

pub use context::{SessionContext, SessionState, ROLE_KEY, TOKEN_KEY, USER_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session store lock poisoned")]
    Poisoned,

    #[error("Persisted session is incomplete")]
    Incomplete,

    #[error("Persisted session is corrupt: {0}")]
    Corrupt(String),

    #[error("Session token has expired")]
    Expired,
}
