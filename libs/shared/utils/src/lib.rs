pub mod polling;
pub mod rate_limit;
pub mod sanitize;
pub mod submit;
pub mod test_utils;

pub use polling::{FeedSource, FeedSubscription, PollingFeed};
pub use rate_limit::{RateLimited, SlidingWindow, TokenBucket};
pub use sanitize::{sanitize_optional, sanitize_text, MAX_TEXT_LENGTH};
pub use submit::{SubmitGuard, SubmitTicket};
