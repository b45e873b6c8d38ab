//! Shared OpenAI client construction.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client with the given request timeout.
///
/// The timeout comes from `[chat] request_timeout_secs` so that long
/// artifact generations can be given more headroom than quick replies.
pub fn create_client(timeout_secs: u64) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}
