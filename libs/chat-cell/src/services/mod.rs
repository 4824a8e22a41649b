pub mod alert;
pub mod chat;
pub mod unread;
pub mod window;

pub use alert::{AlertPermission, Alerter, TracingAlerter};
pub use chat::ChatService;
pub use unread::{UnreadCounts, UnreadSource};
pub use window::{count_unread, ChatUpdate, ChatWindow, ThreadSource};
