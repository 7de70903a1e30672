//! Live participants of a session, keyed by connection.
//!
//! Every participant gets its own actor task running a
//! [`ParticipantMachine`]. The registry only routes commands to those actors
//! and forgets them once they finish or their connection closes.

use std::{sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    config::QuizTiming,
    dao::question_bank::QuestionBank,
    dto::{
        validation::validate_identity,
        ws::{AnswerPayload, ParticipantOutboundMessage},
    },
    error::ServiceError,
    state::{
        deadline::DeadlineScheduler,
        leaderboard::Leaderboard,
        participant::{
            DisconnectSignal, ParticipantCommand, ParticipantContext, ParticipantMachine,
        },
        quiz::QuestionSet,
    },
};

/// Identifier of one participant connection.
pub type ConnectionId = Uuid;

#[derive(Debug, Clone)]
/// Handle used to push commands to a live participant.
pub struct ParticipantEntry {
    /// Identity the participant connected with.
    pub identity: String,
    /// Mailbox of the participant actor.
    pub commands: UnboundedSender<ParticipantCommand>,
    /// Raised on disconnect so queued commands are not replayed.
    pub disconnected: DisconnectSignal,
}

/// Session registry of live participants.
pub struct SessionRegistry {
    question_bank: Arc<dyn QuestionBank>,
    adapter_timeout: Duration,
    context: ParticipantContext,
    participants: Arc<DashMap<ConnectionId, ParticipantEntry>>,
    identities: Arc<DashMap<String, ConnectionId>>,
}

impl SessionRegistry {
    /// Create a registry serving questions from `question_bank`.
    pub fn new(
        question_bank: Arc<dyn QuestionBank>,
        timing: QuizTiming,
        adapter_timeout: Duration,
        leaderboard: Arc<Leaderboard>,
    ) -> Self {
        Self {
            question_bank,
            adapter_timeout,
            context: ParticipantContext {
                timing,
                scheduler: DeadlineScheduler::new(),
                leaderboard,
            },
            participants: Arc::new(DashMap::new()),
            identities: Arc::new(DashMap::new()),
        }
    }

    /// Question bank consulted on every new connection.
    pub fn question_bank(&self) -> Arc<dyn QuestionBank> {
        Arc::clone(&self.question_bank)
    }

    /// Leaderboard shared by every participant of the session.
    pub fn leaderboard(&self) -> &Arc<Leaderboard> {
        &self.context.leaderboard
    }

    /// Number of live participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Whether `connection_id` is still live.
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.participants.contains_key(connection_id)
    }

    /// Register a new connection and spawn its participant actor.
    ///
    /// `identity` must be present and valid, and not already live. The question
    /// sequence is fetched from the question bank; an empty sequence still
    /// creates the participant, which finishes straight away.
    pub async fn connect(
        &self,
        identity: Option<&str>,
        outbound: UnboundedSender<ParticipantOutboundMessage>,
    ) -> Result<ConnectionId, ServiceError> {
        let identity = participant_identity(identity)?;
        let identity = identity.as_str();

        let questions = self.fetch_questions().await?;

        let connection_id = Uuid::new_v4();
        match self.identities.entry(identity.to_string()) {
            Entry::Occupied(_) => {
                return Err(ServiceError::InvalidParticipant(format!(
                    "participant `{identity}` is already connected"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(connection_id);
            }
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let machine = ParticipantMachine::new(
            identity,
            questions,
            self.context.clone(),
            outbound,
            commands_tx.downgrade(),
        );
        self.participants.insert(
            connection_id,
            ParticipantEntry {
                identity: identity.to_string(),
                commands: commands_tx,
                disconnected: machine.disconnect_signal(),
            },
        );
        info!(%connection_id, identity, "participant connected");

        let participants = Arc::clone(&self.participants);
        let identities = Arc::clone(&self.identities);
        tokio::spawn(async move {
            let score = machine.run(commands_rx).await;
            finish(&participants, &identities, connection_id);
            info!(%connection_id, score, "participant session closed");
        });

        Ok(connection_id)
    }

    /// Ask the participant behind `connection_id` to begin.
    pub fn start(&self, connection_id: &ConnectionId) -> Result<(), ServiceError> {
        self.send(connection_id, ParticipantCommand::Start)
    }

    /// Forward an answer to the participant behind `connection_id`.
    pub fn submit_answer(
        &self,
        connection_id: &ConnectionId,
        payload: AnswerPayload,
    ) -> Result<(), ServiceError> {
        self.send(connection_id, ParticipantCommand::Answer(payload))
    }

    /// Tear down the participant behind `connection_id`; unknown ids are ignored.
    pub fn disconnect(&self, connection_id: &ConnectionId) {
        let Some(entry) = finish(&self.participants, &self.identities, *connection_id) else {
            return;
        };
        entry.disconnected.raise();
        let _ = entry.commands.send(ParticipantCommand::Disconnect);
        info!(%connection_id, identity = %entry.identity, "participant removed");
    }

    async fn fetch_questions(&self) -> Result<QuestionSet, ServiceError> {
        let fetch = self
            .question_bank
            .fetch_eligible_questions(OffsetDateTime::now_utc());
        match tokio::time::timeout(self.adapter_timeout, fetch).await {
            Ok(Ok(questions)) => Ok(questions.into()),
            Ok(Err(err)) => {
                error!(error = %err, "question bank failed");
                Err(ServiceError::AdapterFailure(err))
            }
            Err(_) => {
                warn!(timeout = ?self.adapter_timeout, "question bank did not answer in time");
                Err(ServiceError::AdapterTimeout)
            }
        }
    }

    fn send(
        &self,
        connection_id: &ConnectionId,
        command: ParticipantCommand,
    ) -> Result<(), ServiceError> {
        let commands = self
            .participants
            .get(connection_id)
            .map(|entry| entry.commands.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("participant `{connection_id}`")))?;
        commands
            .send(command)
            .map_err(|_| ServiceError::NotFound(format!("participant `{connection_id}`")))
    }
}

/// Check the identity presented at connection time, returning it trimmed.
pub fn participant_identity(identity: Option<&str>) -> Result<String, ServiceError> {
    let identity = identity
        .map(str::trim)
        .filter(|identity| !identity.is_empty())
        .ok_or_else(|| ServiceError::InvalidParticipant("missing participant identity".into()))?;
    validate_identity(identity).map_err(|err| {
        let mut errors = ValidationErrors::new();
        errors.add("username", err);
        ServiceError::from(errors)
    })?;
    Ok(identity.to_string())
}

/// Remove a participant from both indexes. Idempotent.
fn finish(
    participants: &DashMap<ConnectionId, ParticipantEntry>,
    identities: &DashMap<String, ConnectionId>,
    connection_id: ConnectionId,
) -> Option<ParticipantEntry> {
    let (_, entry) = participants.remove(&connection_id)?;
    identities.remove_if(&entry.identity, |_, owner| *owner == connection_id);
    Some(entry)
}
