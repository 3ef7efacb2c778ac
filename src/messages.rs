// src/messages.rs

pub fn success_message(role_name: &str) -> String {
    format!(
        "✅ Verification successful! You've been given the {} role.",
        role_name
    )
}

pub fn rejection_message() -> String {
    "❌ Incorrect answer. Please try again later.".to_string()
}

pub fn timeout_message() -> String {
    "Verification timed out. Please try again.".to_string()
}

pub fn role_missing_message(role_name: &str) -> String {
    format!(
        "⚠️ You answered correctly, but the {} role is not set up on this server.\n\
        Please contact a moderator.",
        role_name
    )
}

pub fn error_message() -> String {
    "Sorry, there was an error processing your role verification. Please try again later."
        .to_string()
}

pub fn question_title(role_name: &str) -> String {
    format!("Verification for {}", role_name)
}
