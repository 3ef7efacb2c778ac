pub mod api;
pub mod http;

pub use api::{Announcement, AnswerButton, GuildApi, QuestionPrompt};
pub use http::SerenityGuildApi;
