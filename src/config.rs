//! Client configuration.
//!
//! Configuration is resolved once, up front, and handed to whatever builds the
//! provider. Nothing below the provider constructor reads the environment.

use crate::{Error, ErrorContext, Result};
use keyring::Entry;
use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const KEYRING_SERVICE: &str = "ai-tool-chat";
const KEYRING_USER: &str = "openai";

/// Settings needed to talk to a chat-completion endpoint.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub system_prompt: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Resolve configuration from the process environment.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first;
    /// variables already set take precedence over it.
    ///
    /// - API key: keyring entry `ai-tool-chat`/`openai`, then `OPENAI_API_KEY`
    /// - `AI_TOOL_CHAT_MODEL` (default `gpt-4o`)
    /// - `OPENAI_BASE_URL` (default `https://api.openai.com/v1`)
    /// - `AI_HTTP_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
        }

        Self::from_lookup(|name| env::var(name).ok(), keyring_api_key())
    }

    /// Build a configuration from a variable lookup.
    ///
    /// `keyring_key` wins over `OPENAI_API_KEY`. Blank values count as unset.
    pub fn from_lookup(
        get: impl Fn(&str) -> Option<String>,
        keyring_key: Option<String>,
    ) -> Result<Self> {
        let var = |name: &str| {
            get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = keyring_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| var("OPENAI_API_KEY"))
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "no API key found",
                    ErrorContext::new()
                        .with_field_path("OPENAI_API_KEY")
                        .with_details("set OPENAI_API_KEY or store a key in the OS keyring")
                        .with_source("config"),
                )
            })?;

        let mut config = Self::new(api_key);
        if let Some(model) = var("AI_TOOL_CHAT_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url)?;
        }
        if let Some(raw) = var("AI_HTTP_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| {
                Error::configuration_with_context(
                    "timeout must be a whole number of seconds",
                    ErrorContext::new()
                        .with_field_path("AI_HTTP_TIMEOUT_SECS")
                        .with_details(raw.clone())
                        .with_source("config"),
                )
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the endpoint base URL. Must be an absolute http(s) URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let raw = base_url.into();
        let parsed = url::Url::parse(&raw).map_err(|e| {
            Error::configuration_with_context(
                "invalid base URL",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(format!("{raw}: {e}"))
                    .with_source("config"),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "base URL must use http or https",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(raw)
                    .with_source("config"),
            ));
        }
        self.base_url = raw.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

fn keyring_api_key() -> Option<String> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER).ok()?;
    entry.get_password().ok()
}
