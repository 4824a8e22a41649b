pub mod client;

pub use client::ApiClient;
pub use reqwest::Method;
