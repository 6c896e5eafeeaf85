//! Client for OpenAI-compatible APIs.

use async_openai::{Client, config::OpenAIConfig};

use crate::prelude::*;

/// Create an OpenAI-compatible client from the environment.
///
/// Returns `None` when `OPENAI_API_KEY` is unset or blank, so that callers can
/// degrade gracefully instead of failing at startup.
pub fn create_llm_client() -> Option<Client<OpenAIConfig>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())?;
    let mut client_config = OpenAIConfig::new().with_api_key(api_key);
    if let Ok(api_base) = std::env::var("OPENAI_API_BASE") {
        debug!(%api_base, "Using custom OpenAI API base");
        client_config = client_config.with_api_base(api_base);
    }
    Some(Client::with_config(client_config))
}
