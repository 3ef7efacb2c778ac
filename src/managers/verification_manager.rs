use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RoleConfig;
use crate::error::Result;
use crate::guild::{AnswerButton, GuildApi, QuestionPrompt};
use crate::managers::question_provider::{QuestionData, QuestionProvider};
use crate::messages;

/// Prefix of every answer button custom id
const ANSWER_PREFIX: &str = "verify";

/// Progress of a single verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Idle,
    QuestionRequested,
    AwaitingAnswer,
    Granted,
    Denied,
    TimedOut,
}

impl VerificationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Granted | Self::Denied | Self::TimedOut)
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::QuestionRequested => "question-requested",
            Self::AwaitingAnswer => "awaiting-answer",
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// How a verification attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Granted,
    Denied,
    TimedOut,
    /// Correct answer, but the role does not exist in the guild
    RoleMissing,
    /// Something failed along the way; the user got the generic error DM
    Failed,
}

/// A reaction that matched a catalog entry
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub role: RoleConfig,
}

/// The question a user is currently answering
#[derive(Debug, Clone)]
pub struct PendingVerification {
    pub user_id: UserId,
    pub role: RoleConfig,
    pub question: QuestionData,
    pub created_at: DateTime<Utc>,
}

/// One-shot answer slot. Removing it from the map is what accepts an answer,
/// so a question can only ever be answered once.
struct PendingAnswer {
    verification: PendingVerification,
    sender: oneshot::Sender<usize>,
}

/// What happened to a button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerDisposition {
    Accepted,
    /// Unknown or already answered question, or pressed by someone else
    Ignored,
}

/// Identity of an answer button: `verify:{token}:{option index}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerKey {
    pub token: Uuid,
    pub option_index: usize,
}

impl AnswerKey {
    pub fn custom_id(&self) -> String {
        format!("{}:{}:{}", ANSWER_PREFIX, self.token, self.option_index)
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.splitn(3, ':');
        if parts.next()? != ANSWER_PREFIX {
            return None;
        }
        let token = Uuid::parse_str(parts.next()?).ok()?;
        let option_index = parts.next()?.parse().ok()?;
        Some(Self {
            token,
            option_index,
        })
    }
}

/// Drives reaction → question DM → answer → role grant
pub struct VerificationManager {
    api: Arc<dyn GuildApi>,
    questions: QuestionProvider,
    pending: DashMap<Uuid, PendingAnswer>,
    answer_window: Duration,
}

impl VerificationManager {
    pub fn new(api: Arc<dyn GuildApi>, questions: QuestionProvider, answer_window: Duration) -> Self {
        Self {
            api,
            questions,
            pending: DashMap::new(),
            answer_window,
        }
    }

    /// Number of questions waiting for an answer
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Run one verification attempt to completion. Errors never escape: they
    /// are logged and the user is told something went wrong.
    pub async fn verify(&self, request: VerificationRequest) -> VerificationOutcome {
        match self.run(&request).await {
            Ok(outcome) => {
                info!(
                    "Verification of {} for '{}' finished: {:?}",
                    request.user_id, request.role.role_name, outcome
                );
                outcome
            }
            Err(e) => {
                error!(
                    "Error in role verification for {} ('{}'): {}",
                    request.user_id, request.role.role_name, e
                );
                self.notify_failure(request.user_id).await;
                VerificationOutcome::Failed
            }
        }
    }

    /// Route a button press to its question. Only the first press by the
    /// question's recipient is delivered.
    pub fn submit_answer(&self, key: AnswerKey, user_id: UserId) -> AnswerDisposition {
        let Some((_, slot)) = self
            .pending
            .remove_if(&key.token, |_, slot| slot.verification.user_id == user_id)
        else {
            debug!("Ignoring answer {} from {}", key.custom_id(), user_id);
            return AnswerDisposition::Ignored;
        };

        let pending = &slot.verification;
        debug!(
            "{} answered '{}' for '{}' after {}s",
            user_id,
            pending
                .question
                .options
                .get(key.option_index)
                .map(String::as_str)
                .unwrap_or("?"),
            pending.role.role_name,
            (Utc::now() - pending.created_at).num_seconds()
        );

        match slot.sender.send(key.option_index) {
            Ok(()) => AnswerDisposition::Accepted,
            Err(_) => AnswerDisposition::Ignored,
        }
    }

    async fn run(&self, request: &VerificationRequest) -> Result<VerificationOutcome> {
        let mut state = VerificationState::Idle;
        let role = &request.role;

        transition(&mut state, VerificationState::QuestionRequested, request);
        let question = self
            .questions
            .generate_question(&role.role_name, &role.category)
            .await;

        let dm_channel = self.api.open_dm(request.user_id).await?;

        let token = Uuid::new_v4();
        let (sender, mut receiver) = oneshot::channel();
        self.pending.insert(
            token,
            PendingAnswer {
                verification: PendingVerification {
                    user_id: request.user_id,
                    role: role.clone(),
                    question: question.clone(),
                    created_at: Utc::now(),
                },
                sender,
            },
        );

        let prompt = question_prompt(token, role, &question);
        if let Err(e) = self.api.send_question(dm_channel, &prompt).await {
            self.pending.remove(&token);
            return Err(e);
        }
        transition(&mut state, VerificationState::AwaitingAnswer, request);

        let answer = match tokio::time::timeout(self.answer_window, &mut receiver).await {
            Ok(Ok(index)) => Some(index),
            Ok(Err(_)) => None,
            Err(_) => {
                // A press may have claimed the slot just as the window closed
                match self.pending.remove(&token) {
                    Some(_) => None,
                    None => receiver.await.ok(),
                }
            }
        };

        let Some(index) = answer else {
            transition(&mut state, VerificationState::TimedOut, request);
            self.api
                .send_text(dm_channel, &messages::timeout_message())
                .await?;
            return Ok(VerificationOutcome::TimedOut);
        };

        if !question.is_correct(index) {
            transition(&mut state, VerificationState::Denied, request);
            self.api
                .send_text(dm_channel, &messages::rejection_message())
                .await?;
            return Ok(VerificationOutcome::Denied);
        }

        let Some(role_id) = self.api.find_role(request.guild_id, &role.role_name).await? else {
            error!(
                "Role '{}' not found in guild {}; cannot grant it to {}",
                role.role_name, request.guild_id, request.user_id
            );
            self.api
                .send_text(dm_channel, &messages::role_missing_message(&role.role_name))
                .await?;
            return Ok(VerificationOutcome::RoleMissing);
        };

        self.api
            .add_member_role(request.guild_id, request.user_id, role_id)
            .await?;
        transition(&mut state, VerificationState::Granted, request);
        info!("Assigned role '{}' to user {}", role.role_name, request.user_id);

        // The role is already granted; a failed confirmation does not undo that
        if let Err(e) = self
            .api
            .send_text(dm_channel, &messages::success_message(&role.role_name))
            .await
        {
            warn!(
                "Granted '{}' to {} but could not confirm by DM: {}",
                role.role_name, request.user_id, e
            );
        }
        Ok(VerificationOutcome::Granted)
    }

    async fn notify_failure(&self, user_id: UserId) {
        let sent = match self.api.open_dm(user_id).await {
            Ok(dm_channel) => self.api.send_text(dm_channel, &messages::error_message()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            warn!("Could not tell {} that verification failed: {}", user_id, e);
        }
    }
}

fn transition(state: &mut VerificationState, next: VerificationState, request: &VerificationRequest) {
    debug!(
        "Verification {} '{}': {} -> {}",
        request.user_id, request.role.role_name, state, next
    );
    debug_assert!(!state.is_terminal(), "transition out of terminal state {}", state);
    *state = next;
}

fn question_prompt(token: Uuid, role: &RoleConfig, question: &QuestionData) -> QuestionPrompt {
    QuestionPrompt {
        title: messages::question_title(&role.role_name),
        question: question.question.clone(),
        buttons: question
            .options
            .iter()
            .enumerate()
            .map(|(option_index, label)| AnswerButton {
                custom_id: AnswerKey {
                    token,
                    option_index,
                }
                .custom_id(),
                label: label.clone(),
            })
            .collect(),
    }
}

/// Shared verification manager type
pub type SharedVerificationManager = Arc<VerificationManager>;

pub fn create_shared_verification_manager(
    api: Arc<dyn GuildApi>,
    questions: QuestionProvider,
    answer_window: Duration,
) -> SharedVerificationManager {
    Arc::new(VerificationManager::new(api, questions, answer_window))
}
