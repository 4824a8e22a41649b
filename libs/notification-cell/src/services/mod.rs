pub mod center;
pub mod notification;

pub use center::{NotificationCenter, NotificationSource};
pub use notification::{NotificationService, RECENT_LIMIT};
