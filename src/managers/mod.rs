pub mod greeting_manager;
pub mod question_provider;
pub mod selection_manager;
pub mod verification_manager;

pub use greeting_manager::{create_shared_greeting_manager, SharedGreetingManager};
pub use question_provider::{GeminiClient, QuestionProvider};
pub use selection_manager::{create_shared_selection_manager, ReactionEvent, SharedSelectionManager};
pub use verification_manager::{
    create_shared_verification_manager, AnswerKey, SharedVerificationManager, VerificationOutcome,
    VerificationRequest,
};
