//! Typed agent settings read from the environment.
//!
//! Call [`load_and_apply`](crate::load_and_apply) first so `.env` and XDG values
//! are visible, then [`AgentSettings::from_env`].

use std::time::Duration;

use thiserror::Error;

pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const SEARCH_MAX_RESULTS: &str = "SEARCH_MAX_RESULTS";
pub const MODEL_TIMEOUT_SECS: &str = "MODEL_TIMEOUT_SECS";
pub const TOOL_TIMEOUT_SECS: &str = "TOOL_TIMEOUT_SECS";
pub const MAX_MODEL_CALLS: &str = "MAX_MODEL_CALLS";

pub const DEFAULT_OPENAI_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "microsoft_phi-4-mini-instruct";
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 2;
/// Most results one search may return.
pub const SEARCH_MAX_RESULTS_CEILING: usize = 20;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_MODEL_CALLS: usize = 25;

/// Invalid or missing configuration. Reported at startup, before any turn runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key}={value:?} is not a valid http(s) URL: {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key}={value:?} must be a positive integer")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key}={value} is out of range (1..={max})")]
    OutOfRange {
        key: &'static str,
        value: usize,
        max: usize,
    },
}

/// Everything the CLI needs to build the model client, the search tool and the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub tavily_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Local endpoints usually need none.
    pub openai_api_key: Option<String>,
    pub search_max_results: usize,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    pub max_model_calls: usize,
}

/// Value of `key` with surrounding whitespace removed; blank counts as unset.
fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    match non_blank(lookup, key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<T>() {
            Ok(n) if n >= T::from(1) => Ok(n),
            _ => Err(ConfigError::InvalidNumber { key, value: raw }),
        },
    }
}

fn search_max_results(lookup: &impl Fn(&str) -> Option<String>) -> Result<usize, ConfigError> {
    let n = positive(lookup, SEARCH_MAX_RESULTS, DEFAULT_SEARCH_MAX_RESULTS)?;
    if n > SEARCH_MAX_RESULTS_CEILING {
        return Err(ConfigError::OutOfRange {
            key: SEARCH_MAX_RESULTS,
            value: n,
            max: SEARCH_MAX_RESULTS_CEILING,
        });
    }
    Ok(n)
}

fn http_url(value: String) -> Result<String, ConfigError> {
    let checked = match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(format!("unsupported scheme {}", parsed.scheme())),
        Err(e) => Err(e.to_string()),
    };
    match checked {
        Ok(()) => Ok(value),
        Err(reason) => Err(ConfigError::InvalidUrl {
            key: OPENAI_BASE_URL,
            value,
            reason,
        }),
    }
}

impl AgentSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup` (key → value); used by `from_env` and tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let tavily_api_key =
            non_blank(&lookup, TAVILY_API_KEY).ok_or(ConfigError::Missing(TAVILY_API_KEY))?;
        let openai_base_url = http_url(
            non_blank(&lookup, OPENAI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        )?;
        let openai_model = non_blank(&lookup, OPENAI_MODEL)
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        Ok(Self {
            tavily_api_key,
            openai_base_url,
            openai_model,
            openai_api_key: non_blank(&lookup, OPENAI_API_KEY),
            search_max_results: search_max_results(&lookup)?,
            model_timeout: Duration::from_secs(positive(
                &lookup,
                MODEL_TIMEOUT_SECS,
                DEFAULT_MODEL_TIMEOUT_SECS,
            )?),
            tool_timeout: Duration::from_secs(positive(
                &lookup,
                TOOL_TIMEOUT_SECS,
                DEFAULT_TOOL_TIMEOUT_SECS,
            )?),
            max_model_calls: positive(&lookup, MAX_MODEL_CALLS, DEFAULT_MAX_MODEL_CALLS)?,
        })
    }
}
