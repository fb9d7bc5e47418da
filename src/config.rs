//! Process configuration for the completion endpoint.
//!
//! Configuration is read once at startup from the environment and is
//! immutable afterwards. Missing base URL or credential is fatal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-5.3-codex";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const ENV_BASE_URL: &str = "CODEX_API_BASE_URL";
const ENV_API_KEY: &str = "CODEX_API_KEY";
const ENV_MODEL: &str = "CODEX_MODEL";
const ENV_TIMEOUT: &str = "CODEX_TIMEOUT";
const ENV_MAX_TOKENS: &str = "CODEX_MAX_TOKENS";
const ENV_REASONING_EFFORT: &str = "CODEX_REASONING_EFFORT";

/// Errors raised while loading configuration. All of them prevent serving.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// How much internal deliberation the remote model applies before answering.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    None,
    Minimal,
    Low,
    Medium,
    High,
    Xhigh,
}

impl ReasoningEffort {
    pub const ALL: [ReasoningEffort; 6] = [
        ReasoningEffort::None,
        ReasoningEffort::Minimal,
        ReasoningEffort::Low,
        ReasoningEffort::Medium,
        ReasoningEffort::High,
        ReasoningEffort::Xhigh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::None => "none",
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
            ReasoningEffort::Xhigh => "xhigh",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a reasoning-effort level.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown reasoning effort: {0}")]
pub struct UnknownEffort(pub String);

impl FromStr for ReasoningEffort {
    type Err = UnknownEffort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|effort| effort.as_str() == wanted)
            .ok_or_else(|| UnknownEffort(s.to_string()))
    }
}

/// Immutable client configuration, one instance per process.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the completion API, without trailing slash.
    pub base_url: String,

    pub api_key: SecretString,

    /// Model identifier sent with every request.
    pub model: String,

    /// Deadline for a single call, covering connect, send and body read.
    pub timeout: Duration,

    /// Default `max_output_tokens` when a call does not override it.
    pub max_tokens: u32,

    /// Default reasoning effort when neither the call nor the tool sets one.
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl ClientConfig {
    /// Create a configuration with default model, timeout and token budget.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<SecretString>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_tokens: DEFAULT_MAX_TOKENS,
            reasoning_effort: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get(ENV_BASE_URL).ok_or(ConfigError::MissingVar(ENV_BASE_URL))?;
        let api_key = get(ENV_API_KEY).ok_or(ConfigError::MissingVar(ENV_API_KEY))?;

        let mut config = Self::new(base_url, api_key);

        if let Some(model) = get(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = get(ENV_TIMEOUT) {
            let millis = parse_var::<u64>(ENV_TIMEOUT, &raw)?;
            config.timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = get(ENV_MAX_TOKENS) {
            config.max_tokens = parse_var::<u32>(ENV_MAX_TOKENS, &raw)?;
        }
        if let Some(raw) = get(ENV_REASONING_EFFORT) {
            config.reasoning_effort = Some(parse_var::<ReasoningEffort>(ENV_REASONING_EFFORT, &raw)?);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
    })
}
