//! Environment-driven configuration.
//!
//! Loaded once at startup, after `dotenvy` has pulled in `.env`.

use crate::llm::{DEFAULT_CHAT_MODEL, OPENAI_API_BASE};
use crate::pipeline::ChatSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Key for the chat-completion API; chapters fail cleanly without it
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub chat_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let openai_api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let chat_model =
            lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
        let chat_base_url =
            lookup("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_API_BASE.to_string());

        Self {
            openai_api_key,
            chat_model,
            chat_base_url,
        }
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            api_key: self.openai_api_key.clone(),
            model: self.chat_model.clone(),
            base_url: self.chat_base_url.clone(),
        }
    }
}
