//! Relay configuration parsed from environment variables.
//!
//! Everything here has a default; the only required setting is the provider
//! credential, which lives in [`crate::llm::config::LlmConfig`].

use crate::llm::config::env_parse;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub port: u16,
    /// Expose raw upstream error details to clients.
    pub dev_mode: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, dev_mode: false, max_tokens: DEFAULT_MAX_TOKENS, temperature: DEFAULT_TEMPERATURE }
    }
}

impl RelayConfig {
    /// - `PORT`: listen port, default 3000
    /// - `APP_ENV`: `development` enables raw error details
    /// - `LLM_MAX_TOKENS`: default 200
    /// - `LLM_TEMPERATURE`: default 0.8
    #[must_use]
    pub fn from_env() -> Self {
        let dev_mode = std::env::var("APP_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("development"));
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            dev_mode,
            max_tokens: env_parse("LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            temperature: env_parse("LLM_TEMPERATURE", DEFAULT_TEMPERATURE),
        }
    }
}
