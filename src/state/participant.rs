//! Per-participant quiz progression.
//!
//! A [`ParticipantMachine`] owns one participant's progress and is driven by a
//! single actor task ([`ParticipantMachine::run`]) that consumes
//! [`ParticipantCommand`]s from a mailbox. Client requests and timer expiries
//! both arrive through that mailbox, so they are handled one at a time. The
//! answer path and the timeout path additionally race on the question's
//! [`DeadlineHandle`]: only the side that claims it resolves the question.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use thiserror::Error;
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, WeakUnboundedSender},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    config::QuizTiming,
    dto::ws::{
        AnswerPayload, FinishedEvent, ParticipantOutboundMessage, QuestionEvent, ScoreEvent,
    },
    state::{
        deadline::{DeadlineHandle, DeadlineScheduler},
        leaderboard::Leaderboard,
        quiz::QuestionSet,
        scoring,
    },
};

/// Lifecycle of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantPhase {
    /// Connected, quiz not started.
    Idle,
    /// Start requested; the first question is about to be dispatched.
    AwaitingFirstQuestion,
    /// A question is on screen and its deadline is armed.
    QuestionActive,
    /// The current question is being scored.
    Resolving,
    /// No questions left, or the participant went away.
    Finished,
}

/// How a question got resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionCause {
    /// The participant answered before the deadline.
    Answer,
    /// The deadline fired first.
    Timeout,
}

/// Events applied to the participant lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantEvent {
    /// Client asked to begin the quiz.
    Start,
    /// A question is pushed to the client and its deadline armed.
    Dispatch,
    /// The active question is resolved.
    Resolve(ResolutionCause),
    /// Every question has been resolved.
    Exhausted,
    /// The connection went away.
    Disconnect,
}

/// Error returned when an event does not apply to the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the participant was in when the event was received.
    pub from: ParticipantPhase,
    /// The event that cannot be applied from this phase.
    pub event: ParticipantEvent,
}

/// Messages delivered to a participant actor.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantCommand {
    /// Client `start` request.
    Start,
    /// Client `answer` request.
    Answer(AnswerPayload),
    /// The start delay elapsed.
    FirstQuestionDue,
    /// A question deadline fired.
    DeadlineExpired {
        /// Question the deadline was armed for.
        question_index: usize,
    },
    /// The connection closed.
    Disconnect,
}

/// Result of an answer or timeout reaching the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The question was resolved by this event.
    Accepted {
        /// Points awarded for the question.
        points: u32,
        /// Running total after the question.
        total: u32,
    },
    /// Another event already resolved (or is resolving) the question; nothing changed.
    Stale,
}

/// Deadline armed for the question currently on screen.
#[derive(Debug)]
struct PendingDeadline {
    question_index: usize,
    handle: DeadlineHandle,
    dispatched_at: Instant,
}

/// Raised once the participant's connection is gone.
///
/// The registry raises it before queueing [`ParticipantCommand::Disconnect`],
/// so commands already sitting in the mailbox are dropped instead of replayed.
#[derive(Debug, Clone, Default)]
pub struct DisconnectSignal(Arc<AtomicBool>);

impl DisconnectSignal {
    /// Mark the participant as disconnected.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`DisconnectSignal::raise`] has been called.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Collaborators shared by every participant of a session.
#[derive(Debug, Clone)]
pub struct ParticipantContext {
    /// Question window and start delay.
    pub timing: QuizTiming,
    /// Arms the start delay and question deadlines.
    pub scheduler: DeadlineScheduler,
    /// Standings updated on every resolution.
    pub leaderboard: Arc<Leaderboard>,
}

/// State machine for a single participant.
#[derive(Debug)]
pub struct ParticipantMachine {
    identity: String,
    questions: QuestionSet,
    question_index: usize,
    score: u32,
    phase: ParticipantPhase,
    pending: Option<PendingDeadline>,
    start_timer: Option<DeadlineHandle>,
    disconnected: DisconnectSignal,
    context: ParticipantContext,
    outbound: UnboundedSender<ParticipantOutboundMessage>,
    mailbox: WeakUnboundedSender<ParticipantCommand>,
}

impl ParticipantMachine {
    /// Create an idle participant.
    ///
    /// `mailbox` is where timer expiries are delivered; it is held weakly so
    /// the actor stops once every strong sender is gone.
    pub fn new(
        identity: impl Into<String>,
        questions: QuestionSet,
        context: ParticipantContext,
        outbound: UnboundedSender<ParticipantOutboundMessage>,
        mailbox: WeakUnboundedSender<ParticipantCommand>,
    ) -> Self {
        Self {
            identity: identity.into(),
            questions,
            question_index: 0,
            score: 0,
            phase: ParticipantPhase::Idle,
            pending: None,
            start_timer: None,
            disconnected: DisconnectSignal::default(),
            context,
            outbound,
            mailbox,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ParticipantPhase {
        self.phase
    }

    /// Index of the question currently on screen (or about to be).
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    /// Running total across resolved questions.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Whether a question deadline is currently armed.
    pub fn has_pending_deadline(&self) -> bool {
        self.pending.is_some()
    }

    /// Signal observed by the actor between commands.
    pub fn disconnect_signal(&self) -> DisconnectSignal {
        self.disconnected.clone()
    }

    /// Request the quiz to begin; the first question follows after the start delay.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ParticipantEvent::Start)?;

        let mailbox = self.mailbox.clone();
        self.start_timer = Some(
            self.context
                .scheduler
                .arm(self.context.timing.start_delay, move || {
                    deliver(&mailbox, ParticipantCommand::FirstQuestionDue)
                }),
        );
        info!(identity = %self.identity, questions = self.questions.len(), "quiz started");
        Ok(())
    }

    /// Dispatch the first question once the start delay has elapsed.
    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        if self.phase != ParticipantPhase::AwaitingFirstQuestion {
            return Err(InvalidTransition {
                from: self.phase,
                event: ParticipantEvent::Dispatch,
            });
        }
        self.start_timer = None;
        self.dispatch_current()
    }

    /// Resolve the active question with the participant's answer.
    ///
    /// The deadline is cancelled before anything is scored; if it already
    /// fired, the timeout owns the question and the answer is discarded.
    pub async fn submit_answer(
        &mut self,
        payload: AnswerPayload,
    ) -> Result<Resolution, InvalidTransition> {
        let invalid = InvalidTransition {
            from: self.phase,
            event: ParticipantEvent::Resolve(ResolutionCause::Answer),
        };
        if self.phase != ParticipantPhase::QuestionActive {
            return Err(invalid);
        }
        let Some(pending) = self.pending.as_ref() else {
            return Err(invalid);
        };

        if payload
            .question_index
            .is_some_and(|index| index != pending.question_index)
        {
            debug!(
                identity = %self.identity,
                active = pending.question_index,
                answered = ?payload.question_index,
                "answer targets another question"
            );
            return Ok(Resolution::Stale);
        }
        if !self.context.scheduler.cancel(&pending.handle) {
            return Ok(Resolution::Stale);
        }

        let Some(pending) = self.pending.take() else {
            return Err(invalid);
        };
        self.transition(ParticipantEvent::Resolve(ResolutionCause::Answer))?;

        let window = self.context.timing.question_window.as_secs_f64();
        let correct = self
            .questions
            .get(pending.question_index)
            .is_some_and(|question| question.is_correct(&payload.answer.as_text()));
        let points = scoring::score(correct, payload.response_time, window);

        info!(
            identity = %self.identity,
            question_index = pending.question_index,
            correct,
            points,
            reported_secs = payload.response_time,
            elapsed_ms = pending.dispatched_at.elapsed().as_millis() as u64,
            "question answered"
        );

        self.resolve(points).await?;
        Ok(Resolution::Accepted {
            points,
            total: self.score,
        })
    }

    /// Resolve the active question as timed out.
    ///
    /// Only honoured when `question_index` is still on screen and its deadline
    /// actually fired; anything else is a leftover from an earlier race.
    pub async fn expire(&mut self, question_index: usize) -> Result<Resolution, InvalidTransition> {
        let owns_question = self.phase == ParticipantPhase::QuestionActive
            && self.pending.as_ref().is_some_and(|pending| {
                pending.question_index == question_index && pending.handle.has_fired()
            });
        if !owns_question {
            return Ok(Resolution::Stale);
        }

        self.pending = None;
        self.transition(ParticipantEvent::Resolve(ResolutionCause::Timeout))?;
        info!(identity = %self.identity, question_index, "question timed out");

        let points = scoring::timeout_score();
        self.resolve(points).await?;
        Ok(Resolution::Accepted {
            points,
            total: self.score,
        })
    }

    /// Stop everything for this participant. Calling it again has no effect.
    pub fn disconnect(&mut self) {
        self.disconnected.raise();
        if self.phase == ParticipantPhase::Finished
            && self.pending.is_none()
            && self.start_timer.is_none()
        {
            return;
        }

        if let Some(pending) = self.pending.take() {
            pending.handle.cancel();
        }
        if let Some(timer) = self.start_timer.take() {
            timer.cancel();
        }
        if self.phase != ParticipantPhase::Finished {
            info!(
                identity = %self.identity,
                phase = ?self.phase,
                question_index = self.question_index,
                "participant disconnected"
            );
            self.phase = ParticipantPhase::Finished;
        }
    }

    /// Drive the machine from its mailbox until it finishes or the mailbox closes.
    pub async fn run(mut self, mut commands: UnboundedReceiver<ParticipantCommand>) -> u32 {
        if self.questions.is_empty() {
            info!(identity = %self.identity, "no eligible questions; finishing immediately");
            if self.transition(ParticipantEvent::Exhausted).is_ok() {
                self.finish_quiz();
            }
            return self.score;
        }

        while let Some(command) = commands.recv().await {
            if self.disconnected.is_raised() {
                debug!(identity = %self.identity, ?command, "dropping command queued before disconnect");
                break;
            }

            match command {
                ParticipantCommand::Start => {
                    if let Err(err) = self.start() {
                        warn!(identity = %self.identity, error = %err, "ignoring start request");
                    }
                }
                ParticipantCommand::FirstQuestionDue => {
                    if let Err(err) = self.begin() {
                        debug!(identity = %self.identity, error = %err, "ignoring start timer");
                    }
                }
                ParticipantCommand::Answer(payload) => match self.submit_answer(payload).await {
                    Ok(Resolution::Accepted { .. }) => {}
                    Ok(Resolution::Stale) => {
                        debug!(identity = %self.identity, "discarding stale answer");
                    }
                    Err(err) => {
                        warn!(identity = %self.identity, error = %err, "ignoring answer");
                    }
                },
                ParticipantCommand::DeadlineExpired { question_index } => {
                    match self.expire(question_index).await {
                        Ok(Resolution::Accepted { .. }) => {}
                        Ok(Resolution::Stale) => {
                            debug!(identity = %self.identity, question_index, "discarding stale deadline");
                        }
                        Err(err) => {
                            warn!(identity = %self.identity, error = %err, "ignoring deadline");
                        }
                    }
                }
                ParticipantCommand::Disconnect => {
                    self.disconnect();
                    break;
                }
            }

            if self.phase == ParticipantPhase::Finished {
                break;
            }
        }

        self.disconnect();
        self.score
    }

    /// Apply the score of the resolved question and move on.
    async fn resolve(&mut self, points: u32) -> Result<(), InvalidTransition> {
        self.score = self.score.saturating_add(points);
        let snapshot = self
            .context
            .leaderboard
            .update_and_snapshot(&self.identity, self.score)
            .await;
        self.emit(ParticipantOutboundMessage::Score(ScoreEvent::new(
            self.score, snapshot,
        )));

        self.question_index += 1;
        if self.disconnected.is_raised() {
            // The resolution in flight completes; nothing new is dispatched.
            return Ok(());
        }
        self.dispatch_current()
    }

    /// Push the question at `question_index` and arm its deadline, or finish.
    fn dispatch_current(&mut self) -> Result<(), InvalidTransition> {
        let timing = self.context.timing;
        let Some(event) = self
            .questions
            .get(self.question_index)
            .map(|question| QuestionEvent::new(question, self.question_index, timing.time_limit_secs()))
        else {
            self.transition(ParticipantEvent::Exhausted)?;
            self.finish_quiz();
            return Ok(());
        };

        self.transition(ParticipantEvent::Dispatch)?;
        self.emit(ParticipantOutboundMessage::Question(event));

        let question_index = self.question_index;
        let mailbox = self.mailbox.clone();
        let handle = self
            .context
            .scheduler
            .arm(timing.question_window, move || {
                deliver(&mailbox, ParticipantCommand::DeadlineExpired { question_index })
            });
        self.pending = Some(PendingDeadline {
            question_index,
            handle,
            dispatched_at: Instant::now(),
        });

        debug!(identity = %self.identity, question_index, "question dispatched");
        Ok(())
    }

    fn finish_quiz(&mut self) {
        info!(identity = %self.identity, score = self.score, "quiz finished");
        self.emit(ParticipantOutboundMessage::Finished(FinishedEvent {
            score: self.score,
        }));
    }

    fn emit(&self, message: ParticipantOutboundMessage) {
        if self.outbound.send(message).is_err() {
            debug!(identity = %self.identity, "participant channel closed; dropping event");
        }
    }

    fn transition(&mut self, event: ParticipantEvent) -> Result<ParticipantPhase, InvalidTransition> {
        self.phase = next_phase(self.phase, event)?;
        Ok(self.phase)
    }
}

/// Compute the phase reached by applying `event` in `from`.
pub fn next_phase(
    from: ParticipantPhase,
    event: ParticipantEvent,
) -> Result<ParticipantPhase, InvalidTransition> {
    use ParticipantEvent as E;
    use ParticipantPhase as P;

    let next = match (from, event) {
        (P::Idle, E::Start) => P::AwaitingFirstQuestion,
        (P::AwaitingFirstQuestion | P::Resolving, E::Dispatch) => P::QuestionActive,
        (P::QuestionActive, E::Resolve(_)) => P::Resolving,
        (P::Idle | P::AwaitingFirstQuestion | P::Resolving, E::Exhausted) => P::Finished,
        (_, E::Disconnect) => P::Finished,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

fn deliver(mailbox: &WeakUnboundedSender<ParticipantCommand>, command: ParticipantCommand) {
    if let Some(tx) = mailbox.upgrade() {
        let _ = tx.send(command);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{
        sync::mpsc::{self, error::TryRecvError},
        time::sleep,
    };

    use super::*;
    use crate::{dto::ws::AnswerValue, state::quiz::Question};

    struct Harness {
        machine: ParticipantMachine,
        leaderboard: Arc<Leaderboard>,
        events: UnboundedReceiver<ParticipantOutboundMessage>,
        mailbox: UnboundedReceiver<ParticipantCommand>,
        _mailbox_tx: UnboundedSender<ParticipantCommand>,
    }

    fn questions(count: usize) -> QuestionSet {
        (0..count)
            .map(|i| Question::new(format!("Question {i}?"), ["a", "b", "c"], "a"))
            .collect::<Vec<_>>()
            .into()
    }

    fn harness(count: usize) -> Harness {
        harness_with(questions(count))
    }

    fn harness_with(questions: QuestionSet) -> Harness {
        let leaderboard = Arc::new(Leaderboard::new());
        let (events_tx, events) = mpsc::unbounded_channel();
        let (mailbox_tx, mailbox) = mpsc::unbounded_channel();
        let context = ParticipantContext {
            timing: QuizTiming {
                question_window: Duration::from_secs(60),
                start_delay: Duration::from_secs(2),
            },
            scheduler: DeadlineScheduler::new(),
            leaderboard: Arc::clone(&leaderboard),
        };
        let machine = ParticipantMachine::new(
            "alice",
            questions,
            context,
            events_tx,
            mailbox_tx.downgrade(),
        );
        Harness {
            machine,
            leaderboard,
            events,
            mailbox,
            _mailbox_tx: mailbox_tx,
        }
    }

    fn answer(answer: &str, response_time: f64) -> AnswerPayload {
        AnswerPayload {
            answer: answer.into(),
            response_time,
            question_index: None,
        }
    }

    fn assert_deadline_invariant(machine: &ParticipantMachine) {
        assert_eq!(
            machine.has_pending_deadline(),
            machine.phase() == ParticipantPhase::QuestionActive
        );
    }

    async fn started(count: usize) -> Harness {
        let mut h = harness(count);
        h.machine.start().unwrap();
        assert_eq!(h.machine.phase(), ParticipantPhase::AwaitingFirstQuestion);
        assert_eq!(h.mailbox.recv().await, Some(ParticipantCommand::FirstQuestionDue));
        h.machine.begin().unwrap();
        h
    }

    #[tokio::test(start_paused = true)]
    async fn start_dispatches_first_question_after_delay() {
        let mut h = harness(2);
        h.machine.start().unwrap();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(h.mailbox.try_recv(), Err(TryRecvError::Empty));
        sleep(Duration::from_secs(2)).await;
        assert_eq!(h.mailbox.try_recv(), Ok(ParticipantCommand::FirstQuestionDue));

        h.machine.begin().unwrap();
        assert_eq!(h.machine.phase(), ParticipantPhase::QuestionActive);
        assert_deadline_invariant(&h.machine);
        assert_eq!(
            h.events.try_recv().unwrap(),
            ParticipantOutboundMessage::Question(QuestionEvent {
                question: "Question 0?".into(),
                options: vec!["a".into(), "b".into(), "c".into()],
                time_limit: 60,
                question_index: 0,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_only_valid_when_idle() {
        let mut h = harness(1);
        h.machine.start().unwrap();
        assert_eq!(
            h.machine.start(),
            Err(InvalidTransition {
                from: ParticipantPhase::AwaitingFirstQuestion,
                event: ParticipantEvent::Start,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn answer_is_rejected_before_a_question_is_active() {
        let mut h = harness(1);
        let err = h.machine.submit_answer(answer("a", 1.0)).await.unwrap_err();
        assert_eq!(err.from, ParticipantPhase::Idle);
        assert_eq!(h.machine.score(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn correct_answer_scores_by_latency_and_finishes() {
        let mut h = started(1).await;
        let _question = h.events.recv().await;

        let resolution = h.machine.submit_answer(answer("a", 45.0)).await.unwrap();
        assert_eq!(resolution, Resolution::Accepted { points: 25, total: 25 });

        assert_eq!(
            h.events.recv().await,
            Some(ParticipantOutboundMessage::Score(ScoreEvent {
                score: 25,
                leaderboard: vec![("alice".into(), 25)],
            }))
        );
        assert_eq!(
            h.events.recv().await,
            Some(ParticipantOutboundMessage::Finished(FinishedEvent { score: 25 }))
        );
        assert_eq!(h.machine.phase(), ParticipantPhase::Finished);
        assert_eq!(h.machine.question_index(), 1);
        assert_deadline_invariant(&h.machine);

        // The cancelled deadline never reports back.
        sleep(Duration::from_secs(120)).await;
        assert_eq!(h.mailbox.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn numeric_answer_matches_textual_option() {
        let mut h = harness_with(vec![Question::new("2 + 2?", ["3", "4", "5"], "4")].into());
        h.machine.start().unwrap();
        assert_eq!(h.mailbox.recv().await, Some(ParticipantCommand::FirstQuestionDue));
        h.machine.begin().unwrap();

        let payload = AnswerPayload {
            answer: AnswerValue::Integer(4),
            response_time: 15.0,
            question_index: Some(0),
        };
        assert_eq!(
            h.machine.submit_answer(payload).await.unwrap(),
            Resolution::Accepted { points: 75, total: 75 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_wins_over_late_answer() {
        let mut h = started(1).await;
        let _question = h.events.recv().await;

        assert_eq!(
            h.mailbox.recv().await,
            Some(ParticipantCommand::DeadlineExpired { question_index: 0 })
        );

        // The deadline fired but its expiry has not been processed yet.
        let late = h.machine.submit_answer(answer("a", 59.0)).await.unwrap();
        assert_eq!(late, Resolution::Stale);
        assert_eq!(h.machine.phase(), ParticipantPhase::QuestionActive);

        let resolution = h.machine.expire(0).await.unwrap();
        assert_eq!(resolution, Resolution::Accepted { points: 0, total: 0 });
        assert_eq!(
            h.events.recv().await,
            Some(ParticipantOutboundMessage::Score(ScoreEvent {
                score: 0,
                leaderboard: vec![("alice".into(), 0)],
            }))
        );
        assert_eq!(h.leaderboard.score_of("alice").await, Some(0));

        // Once finished, further answers have no effect.
        assert!(h.machine.submit_answer(answer("a", 1.0)).await.is_err());
        assert_eq!(h.machine.score(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_after_answer_is_stale() {
        let mut h = started(2).await;
        h.machine.submit_answer(answer("b", 3.0)).await.unwrap();
        assert_eq!(h.machine.question_index(), 1);

        assert_eq!(h.machine.expire(0).await.unwrap(), Resolution::Stale);
        // Question 1's deadline has not fired yet.
        assert_eq!(h.machine.expire(1).await.unwrap(), Resolution::Stale);
        assert_eq!(h.machine.question_index(), 1);
        assert_eq!(h.machine.phase(), ParticipantPhase::QuestionActive);
    }

    #[tokio::test(start_paused = true)]
    async fn answer_for_another_question_is_discarded() {
        let mut h = started(2).await;
        let mut payload = answer("a", 1.0);
        payload.question_index = Some(7);

        assert_eq!(
            h.machine.submit_answer(payload).await.unwrap(),
            Resolution::Stale
        );
        assert!(h.machine.has_pending_deadline());

        payload = answer("a", 6.0);
        payload.question_index = Some(0);
        assert_eq!(
            h.machine.submit_answer(payload).await.unwrap(),
            Resolution::Accepted { points: 90, total: 90 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn index_advances_once_per_resolution() {
        let mut h = started(3).await;
        let mut seen = vec![h.machine.question_index()];

        h.machine.submit_answer(answer("a", 30.0)).await.unwrap();
        seen.push(h.machine.question_index());

        let expired = h.mailbox.recv().await;
        assert_eq!(expired, Some(ParticipantCommand::DeadlineExpired { question_index: 1 }));
        h.machine.expire(1).await.unwrap();
        assert_eq!(h.machine.expire(1).await.unwrap(), Resolution::Stale);
        seen.push(h.machine.question_index());

        h.machine.submit_answer(answer("c", 0.0)).await.unwrap();
        seen.push(h.machine.question_index());

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(h.machine.score(), 50);
        assert_eq!(h.machine.phase(), ParticipantPhase::Finished);
        assert_eq!(h.leaderboard.score_of("alice").await, Some(50));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_deadline() {
        let mut h = started(2).await;
        assert!(h.machine.has_pending_deadline());

        h.machine.disconnect();
        assert_eq!(h.machine.phase(), ParticipantPhase::Finished);
        assert_deadline_invariant(&h.machine);

        sleep(Duration::from_secs(300)).await;
        assert_eq!(h.mailbox.try_recv(), Err(TryRecvError::Empty));

        h.machine.disconnect();
        assert_eq!(h.machine.phase(), ParticipantPhase::Finished);
        assert_eq!(h.leaderboard.score_of("alice").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_queued_before_disconnect_is_dropped() {
        let Harness {
            mut machine,
            leaderboard,
            mut events,
            mut mailbox,
            _mailbox_tx: mailbox_tx,
        } = harness(2);
        machine.start().unwrap();
        assert_eq!(mailbox.recv().await, Some(ParticipantCommand::FirstQuestionDue));
        machine.begin().unwrap();
        assert!(matches!(
            events.recv().await,
            Some(ParticipantOutboundMessage::Question(_))
        ));

        // The deadline fires and its expiry waits in the mailbox, ahead of the disconnect.
        sleep(Duration::from_secs(61)).await;
        let signal = machine.disconnect_signal();
        signal.raise();
        mailbox_tx.send(ParticipantCommand::Disconnect).unwrap();
        drop(mailbox_tx);

        let score = machine.run(mailbox).await;
        assert_eq!(score, 0);
        assert_eq!(events.recv().await, None);
        assert_eq!(leaderboard.score_of("alice").await, None);
        assert!(signal.is_raised());
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_in_flight_does_not_dispatch_after_disconnect() {
        let mut h = started(2).await;
        let _question = h.events.recv().await;

        h.machine.disconnect_signal().raise();
        let resolution = h.machine.submit_answer(answer("a", 30.0)).await.unwrap();
        assert_eq!(resolution, Resolution::Accepted { points: 50, total: 50 });

        assert!(matches!(
            h.events.recv().await,
            Some(ParticipantOutboundMessage::Score(_))
        ));
        assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
        assert!(!h.machine.has_pending_deadline());
        assert_eq!(h.machine.phase(), ParticipantPhase::Resolving);

        h.machine.disconnect();
        assert_eq!(h.machine.phase(), ParticipantPhase::Finished);
        sleep(Duration::from_secs(120)).await;
        assert_eq!(h.mailbox.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_during_start_delay_cancels_first_dispatch() {
        let mut h = harness(1);
        h.machine.start().unwrap();
        h.machine.disconnect();

        sleep(Duration::from_secs(10)).await;
        assert_eq!(h.mailbox.try_recv(), Err(TryRecvError::Empty));
        assert!(h.machine.begin().is_err());
        assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn actor_finishes_immediately_without_questions() {
        let h = harness(0);
        let mut events = h.events;
        let (_tx, rx) = mpsc::unbounded_channel();

        let score = h.machine.run(rx).await;
        assert_eq!(score, 0);
        assert_eq!(
            events.recv().await,
            Some(ParticipantOutboundMessage::Finished(FinishedEvent { score: 0 }))
        );
    }

    #[test]
    fn transition_table() {
        use ParticipantEvent as E;
        use ParticipantPhase as P;

        assert_eq!(next_phase(P::Idle, E::Start), Ok(P::AwaitingFirstQuestion));
        assert_eq!(
            next_phase(P::AwaitingFirstQuestion, E::Dispatch),
            Ok(P::QuestionActive)
        );
        assert_eq!(
            next_phase(P::QuestionActive, E::Resolve(ResolutionCause::Timeout)),
            Ok(P::Resolving)
        );
        assert_eq!(next_phase(P::Resolving, E::Dispatch), Ok(P::QuestionActive));
        assert_eq!(next_phase(P::Resolving, E::Exhausted), Ok(P::Finished));
        assert_eq!(next_phase(P::QuestionActive, E::Disconnect), Ok(P::Finished));

        assert!(next_phase(P::Idle, E::Resolve(ResolutionCause::Answer)).is_err());
        assert!(next_phase(P::QuestionActive, E::Start).is_err());
        assert!(next_phase(P::Finished, E::Dispatch).is_err());
        assert!(next_phase(P::QuestionActive, E::Exhausted).is_err());
    }
}
