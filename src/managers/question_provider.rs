//! Verification questions for self-assignable roles.
//!
//! Questions come from a text-generation model asked for structured JSON.
//! Whatever goes wrong upstream (transport, timeout, malformed or invalid
//! output) the provider answers with a static question for the role, so callers
//! always receive a usable `QuestionData`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BotError, QuestionError};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// A multiple-choice question. `correct_answer` is always one of `options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionData {
    pub question: String,
    pub options: [String; 4],
    pub correct_answer: String,
}

impl QuestionData {
    fn from_static(question: &str, options: [&str; 4], correct_answer: &str) -> Self {
        Self {
            question: question.to_string(),
            options: options.map(str::to_string),
            correct_answer: correct_answer.to_string(),
        }
    }

    /// Whether the option at `index` is the correct answer. Out of range is wrong.
    pub fn is_correct(&self, index: usize) -> bool {
        self.options
            .get(index)
            .is_some_and(|option| *option == self.correct_answer)
    }
}

/// Raw shape requested from the model
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
}

/// Black-box text generation: a prompt plus a JSON schema in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String, QuestionError>;
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nakama/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String, QuestionError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });

        let response = self
            .http
            .post(format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(QuestionError::Transport(format!(
                "Gemini API error: {} - {}",
                status, error_text
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.text().ok_or(QuestionError::EmptyResponse)
    }
}

/// Produces a question for every role, falling back to a static table
pub struct QuestionProvider {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl QuestionProvider {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Never fails: generation problems are logged and replaced by the fallback
    pub async fn generate_question(&self, role_name: &str, category: &str) -> QuestionData {
        match self.try_generate(role_name, category).await {
            Ok(question) => {
                debug!("Generated question for '{}': {}", role_name, question.question);
                question
            }
            Err(e) => {
                warn!(
                    "Question generation failed for '{}', using fallback: {}",
                    role_name, e
                );
                fallback_question(role_name)
            }
        }
    }

    pub async fn try_generate(
        &self,
        role_name: &str,
        category: &str,
    ) -> Result<QuestionData, QuestionError> {
        let prompt = build_prompt(role_name, category);
        let raw = tokio::time::timeout(
            self.timeout,
            self.generator.generate(&prompt, &question_schema()),
        )
        .await
        .map_err(|_| {
            QuestionError::Transport(format!("timed out after {:?}", self.timeout))
        })??;

        parse_question(&raw)
    }
}

pub fn build_prompt(role_name: &str, category: &str) -> String {
    format!(
        "You are a role verification system. Generate a verification question for a Discord role named \"{}\" in the category \"{}\".\n\n\
        Return a JSON object with this exact structure, no markdown formatting, no code blocks, just the raw JSON:\n\
        {{\n\
        \x20   \"question\": \"A relevant question to verify if the user belongs to this role\",\n\
        \x20   \"options\": [\"4 different options, one of which is correct\"],\n\
        \x20   \"correctAnswer\": \"The correct option from the options array\"\n\
        }}\n\n\
        Guidelines:\n\
        - For a developer role, ask about programming concepts\n\
        - For a gaming role, ask about gaming platforms or popular games\n\
        - For a movie role, ask about film genres or directors\n\
        - For an alumni role, ask about specific university details\n\n\
        Important: Return ONLY the raw JSON object, no markdown, no code blocks, no additional text.",
        role_name, category
    )
}

/// Response schema sent with every generation request
pub fn question_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": { "type": "STRING" },
            "options": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "minItems": 4,
                "maxItems": 4
            },
            "correctAnswer": { "type": "STRING" }
        },
        "required": ["question", "options", "correctAnswer"]
    })
}

/// Strip markdown code fences and any prose around the JSON object
pub fn extract_json(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(inner) = text.strip_prefix("```") {
        // Skip the info string ("json") on the opening fence
        let inner = match inner.find('\n') {
            Some(newline) => &inner[newline + 1..],
            None => inner.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        let inner = inner.trim_end();
        text = match inner.rfind("```") {
            Some(close) => inner[..close].trim(),
            None => inner.trim(),
        };
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Parse and validate model output
pub fn parse_question(raw: &str) -> Result<QuestionData, QuestionError> {
    let json = extract_json(raw);
    if json.is_empty() {
        return Err(QuestionError::EmptyResponse);
    }

    let generated: GeneratedQuestion = serde_json::from_str(json)?;

    let question = generated.question.trim().to_string();
    if question.is_empty() {
        return Err(QuestionError::Invalid("question is empty".to_string()));
    }

    let options: Vec<String> = generated
        .options
        .iter()
        .map(|o| o.trim().to_string())
        .collect();
    let count = options.len();
    let options: [String; 4] = options.try_into().map_err(|_| {
        QuestionError::Invalid(format!("expected 4 options, got {}", count))
    })?;
    if options.iter().any(|o| o.is_empty()) {
        return Err(QuestionError::Invalid("options contain an empty entry".to_string()));
    }

    let correct_answer = generated.correct_answer.trim().to_string();
    if !options.contains(&correct_answer) {
        return Err(QuestionError::Invalid(format!(
            "correct answer '{}' is not one of the options",
            correct_answer
        )));
    }

    Ok(QuestionData {
        question,
        options,
        correct_answer,
    })
}

/// Static question for a role, keyed by exact role name
pub fn fallback_question(role_name: &str) -> QuestionData {
    match role_name {
        "🧠 Logic Lords" => QuestionData::from_static(
            "What is the time complexity of binary search?",
            ["O(1)", "O(log n)", "O(n)", "O(n²)"],
            "O(log n)",
        ),
        "👾 Game On" => QuestionData::from_static(
            "Which gaming platform do you primarily use?",
            ["PC", "PlayStation", "Xbox", "Nintendo"],
            "PC",
        ),
        "📽️ Cinephile" => QuestionData::from_static(
            "What is your favorite movie genre?",
            ["Action", "Comedy", "Drama", "Sci-Fi"],
            "Drama",
        ),
        "💼 Parul Alumni" => QuestionData::from_static(
            "What is the fare of chhagda from waghodia chowkdi to parul university?",
            ["Rs. 20", "Rs. 25", "Rs. 30", "Rs. 35"],
            "Rs. 30",
        ),
        _ => QuestionData::from_static(
            "Are you sure you want this role?",
            ["Yes", "No", "Maybe", "Not sure"],
            "Yes",
        ),
    }
}
