use std::time::Duration;

use base64::Engine;
use tracing::level_filters::LevelFilter;

use crate::error::{BotError, Result};

pub const DEFAULT_WELCOME_CHANNEL: &str = "👋-welcome";
pub const DEFAULT_SELF_ROLES_CHANNEL: &str = "😋-self-roles";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ANSWER_WINDOW_SECS: u64 = 300;
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 20;

/// Runtime configuration, read from the environment after `.env` is loaded
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub generation_timeout: Duration,
    pub welcome_channel: String,
    pub self_roles_channel: String,
    pub answer_window: Duration,
    pub role_catalog_path: Option<String>,
    pub log_level: LevelFilter,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN")
            .or_else(|| get("TOKEN"))
            .ok_or_else(|| BotError::MissingCredential {
                name: "DISCORD_TOKEN".to_string(),
            })?;
        application_id_from_token(&discord_token)?;

        let gemini_api_key = get("GEMINI_API_KEY").ok_or_else(|| BotError::MissingCredential {
            name: "GEMINI_API_KEY".to_string(),
        })?;

        let log_level = match get("LOG_LEVEL") {
            Some(level) => parse_level(&level)?,
            None => LevelFilter::INFO,
        };

        Ok(Self {
            discord_token,
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            generation_timeout: Duration::from_secs(parse_secs(
                "GENERATION_TIMEOUT_SECS",
                get("GENERATION_TIMEOUT_SECS"),
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )?),
            welcome_channel: get("WELCOME_CHANNEL")
                .unwrap_or_else(|| DEFAULT_WELCOME_CHANNEL.to_string()),
            self_roles_channel: get("SELF_ROLES_CHANNEL")
                .unwrap_or_else(|| DEFAULT_SELF_ROLES_CHANNEL.to_string()),
            answer_window: Duration::from_secs(parse_secs(
                "ANSWER_WINDOW_SECS",
                get("ANSWER_WINDOW_SECS"),
                DEFAULT_ANSWER_WINDOW_SECS,
            )?),
            role_catalog_path: get("ROLE_CATALOG_PATH"),
            log_level,
        })
    }

    /// Application id encoded in the first segment of the bot token
    pub fn application_id(&self) -> Option<String> {
        application_id_from_token(&self.discord_token).ok()
    }
}

fn parse_secs(name: &str, value: Option<String>, default: u64) -> Result<u64> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(BotError::ConfigValidation {
            message: format!("{} must be a positive number of seconds, got '{}'", name, value),
        }),
        Ok(secs) => Ok(secs),
    }
}

fn parse_level(value: &str) -> Result<LevelFilter> {
    value
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| BotError::ConfigValidation {
            message: format!("LOG_LEVEL '{}' is not a valid level", value),
        })
}

/// Decode the application id from a bot token.
///
/// Tokens are three dot-separated segments; the first is the base64 encoded
/// numeric application id. Anything else is rejected before we try to log in.
pub fn application_id_from_token(token: &str) -> Result<String> {
    let invalid = |message: &str| BotError::InvalidCredential {
        name: "DISCORD_TOKEN".to_string(),
        message: message.to_string(),
    };

    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(invalid("expected three dot-separated segments"));
    }

    // Discord uses URL-safe base64 without padding, but older tokens use the standard alphabet
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(segments[0])
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(segments[0]))
        .map_err(|_| invalid("first segment is not base64"))?;

    let id = String::from_utf8(decoded).map_err(|_| invalid("first segment is not UTF-8"))?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("first segment does not encode an application id"));
    }

    Ok(id)
}
