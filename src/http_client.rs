use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("kickoff_oracle/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared client for the sports-data API.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| client_with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
}

/// Dedicated client whose request timeout matches a source's deadline.
pub fn client_with_timeout(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build http client")
}
