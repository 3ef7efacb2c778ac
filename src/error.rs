use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    #[error("Missing environment variable: {name}")]
    MissingCredential { name: String },

    #[error("Invalid credential in {name}: {message}")]
    InvalidCredential { name: String, message: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Channel not found: {name}")]
    ChannelNotFound { name: String },

    #[error("Roles not found: {}", names.join(", "))]
    RolesNotFound { names: Vec<String> },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Reasons a generated question was rejected. Never shown to users; the
/// question provider logs them and falls back to the static table.
#[derive(Error, Debug)]
pub enum QuestionError {
    #[error("text generation request failed: {0}")]
    Transport(String),

    #[error("text generation returned an empty response")]
    EmptyResponse,

    #[error("generated question is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("generated question failed validation: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for QuestionError {
    fn from(err: reqwest::Error) -> Self {
        QuestionError::Transport(err.to_string())
    }
}
