pub mod auth;
pub mod client;
pub mod payload;
pub mod rate_limit;
pub mod session;

pub use auth::{OAuthClient, TokenSet};
pub use client::CincClient;
pub use payload::LeadEvent;
pub use rate_limit::RateLimiter;
pub use session::{Authenticator, SessionStore};

use crate::utils::error::Result;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub fn build_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("ri-cinc/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
