//! Assistant Session — question/answer turns about one `MatchReport`.
//!
//! Single-flight: while a question is awaiting its answer, further `ask`
//! calls are suppressed. Every user turn is closed by exactly one assistant
//! turn, either the service's answer or `FALLBACK_ANSWER`.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::{ConversationTurn, MatchReport};
use crate::scoring_client::ScoringService;

/// Assistant text appended when the chat call fails.
pub const FALLBACK_ANSWER: &str = "Something went wrong.";

/// What a call to `ask` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// The service answered; the assistant turn was appended.
    Answered(ConversationTurn),
    /// The service failed; the fallback turn was appended.
    FellBack(ConversationTurn),
    /// Blank question. Nothing appended, nothing sent.
    Ignored,
    /// Another question is still awaiting its answer. Nothing appended, nothing sent.
    Suppressed,
    /// The session moved to another report while this answer was in flight;
    /// the answer was dropped.
    Discarded,
}

#[derive(Default)]
struct SessionInner {
    report: Option<Arc<MatchReport>>,
    turns: Vec<ConversationTurn>,
    awaiting: bool,
    /// Bumped on every rescope so late answers can tell they are stale.
    scope: u64,
}

pub struct AssistantSession {
    service: Arc<dyn ScoringService>,
    inner: Mutex<SessionInner>,
}

impl AssistantSession {
    /// A session with no report in scope; `ask` fails with `NoReport` until
    /// `rescope` provides one.
    pub fn new(service: Arc<dyn ScoringService>) -> Self {
        Self {
            service,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn for_report(service: Arc<dyn ScoringService>, report: Arc<MatchReport>) -> Self {
        let session = Self::new(service);
        session.rescope(Some(report));
        session
    }

    /// Points the session at a new report (or none), dropping the previous
    /// conversation.
    pub fn rescope(&self, report: Option<Arc<MatchReport>>) {
        let mut inner = self.lock();
        inner.report = report;
        inner.turns.clear();
        inner.awaiting = false;
        inner.scope += 1;
        debug!("Assistant session rescoped (scope {})", inner.scope);
    }

    pub fn report(&self) -> Option<Arc<MatchReport>> {
        self.lock().report.clone()
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.lock().turns.clone()
    }

    pub fn is_awaiting_answer(&self) -> bool {
        self.lock().awaiting
    }

    pub async fn ask(&self, question: &str) -> Result<AskOutcome, AppError> {
        let question = question.trim();

        let (report, scope) = {
            let mut inner = self.lock();
            let report = inner.report.clone().ok_or(AppError::NoReport)?;
            if question.is_empty() {
                return Ok(AskOutcome::Ignored);
            }
            if inner.awaiting {
                debug!("Question suppressed: previous answer still pending");
                return Ok(AskOutcome::Suppressed);
            }
            inner.turns.push(ConversationTurn::user(question));
            inner.awaiting = true;
            (report, inner.scope)
        };

        let mut pending = PendingAnswer {
            session: self,
            scope,
            settled: false,
        };

        info!("Asking assistant ({} chars)", question.len());
        let result = self.service.chat(question, &report).await;

        pending.settled = true;
        Ok(self.settle(scope, result))
    }

    fn settle(&self, scope: u64, result: Result<String, AppError>) -> AskOutcome {
        let mut inner = self.lock();
        if inner.scope != scope {
            debug!("Dropping answer for superseded scope {}", scope);
            return AskOutcome::Discarded;
        }
        inner.awaiting = false;

        let outcome = match result {
            Ok(answer) => AskOutcome::Answered(ConversationTurn::assistant(answer)),
            Err(e) => {
                warn!("Assistant chat failed: {}", e);
                AskOutcome::FellBack(ConversationTurn::assistant(FALLBACK_ANSWER))
            }
        };
        if let AskOutcome::Answered(turn) | AskOutcome::FellBack(turn) = &outcome {
            inner.turns.push(turn.clone());
        }
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Closes the user turn with the fallback if the `ask` future is dropped
/// before the answer arrives.
struct PendingAnswer<'a> {
    session: &'a AssistantSession,
    scope: u64,
    settled: bool,
}

impl Drop for PendingAnswer<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.settle(
                self.scope,
                Err(AppError::ChatFailed("request abandoned".to_string())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::testing::FakeScoringService;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn report() -> Arc<MatchReport> {
        Arc::new(MatchReport {
            overall_score: 75.0,
            missing_skills: vec!["Kafka".into()],
            ..Default::default()
        })
    }

    fn session_with(service: FakeScoringService) -> (AssistantSession, Arc<FakeScoringService>) {
        let service = Arc::new(service);
        (AssistantSession::for_report(service.clone(), report()), service)
    }

    #[tokio::test]
    async fn test_answer_appends_two_turns() {
        let (session, service) =
            session_with(FakeScoringService::new().chat_reply(Ok("Learn Kafka.".into())));

        let outcome = session.ask("What should I learn?").await.unwrap();

        assert_eq!(
            outcome,
            AskOutcome::Answered(ConversationTurn::assistant("Learn Kafka."))
        );
        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], ConversationTurn::user("What should I learn?"));
        assert_eq!(turns[1].role, Role::Assistant);
        assert!(!session.is_awaiting_answer());
        assert_eq!(service.chat_calls(), 1);
    }

    #[tokio::test]
    async fn test_chat_receives_full_report() {
        let (session, service) = session_with(FakeScoringService::new());
        session.ask("Why?").await.unwrap();
        assert_eq!(service.last_chat_report().as_ref(), Some(report().as_ref()));
    }

    #[tokio::test]
    async fn test_empty_question_is_a_no_op() {
        let (session, service) = session_with(FakeScoringService::new());

        assert_eq!(session.ask("").await.unwrap(), AskOutcome::Ignored);
        assert_eq!(session.ask("   \t").await.unwrap(), AskOutcome::Ignored);

        assert!(session.turns().is_empty());
        assert_eq!(service.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_chat_appends_fallback_turn() {
        let (session, _) = session_with(
            FakeScoringService::new().chat_reply(Err(AppError::ChatFailed("500".into()))),
        );

        let outcome = session.ask("Am I a fit?").await.unwrap();

        assert_eq!(
            outcome,
            AskOutcome::FellBack(ConversationTurn::assistant(FALLBACK_ANSWER))
        );
        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].text, FALLBACK_ANSWER);
        assert!(!session.is_awaiting_answer());
    }

    #[tokio::test]
    async fn test_no_report_rejected_without_call() {
        let service = Arc::new(FakeScoringService::new());
        let session = AssistantSession::new(service.clone());

        let err = session.ask("Hello?").await.unwrap_err();

        assert!(matches!(err, AppError::NoReport));
        assert!(session.turns().is_empty());
        assert_eq!(service.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_question_suppressed_while_awaiting() {
        let gate = Arc::new(Notify::new());
        let (session, service) = session_with(FakeScoringService::new().gate_chat(gate.clone()));

        let (first, second) = tokio::join!(session.ask("First?"), async {
            assert!(session.is_awaiting_answer());
            let outcome = session.ask("Second?").await;
            gate.notify_one();
            outcome
        });

        assert!(matches!(first.unwrap(), AskOutcome::Answered(_)));
        assert_eq!(second.unwrap(), AskOutcome::Suppressed);
        assert_eq!(service.chat_calls(), 1);
        assert_eq!(session.turns().len(), 2);
    }

    #[tokio::test]
    async fn test_rescope_clears_turns_and_discards_late_answer() {
        let gate = Arc::new(Notify::new());
        let (session, _) = session_with(FakeScoringService::new().gate_chat(gate.clone()));

        let (late, ()) = tokio::join!(session.ask("Old question"), async {
            session.rescope(Some(report()));
            gate.notify_one();
        });

        assert_eq!(late.unwrap(), AskOutcome::Discarded);
        assert!(session.turns().is_empty());
        assert!(!session.is_awaiting_answer());
    }

    #[tokio::test]
    async fn test_abandoned_question_is_closed_with_fallback() {
        let gate = Arc::new(Notify::new());
        let (session, _) = session_with(FakeScoringService::new().gate_chat(gate));

        let timed_out = tokio::time::timeout(Duration::from_millis(20), session.ask("Hello?")).await;

        assert!(timed_out.is_err());
        assert!(!session.is_awaiting_answer());
        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_turns_accumulate_in_order() {
        let (session, _) = session_with(
            FakeScoringService::new()
                .chat_reply(Ok("one".into()))
                .chat_reply(Ok("two".into())),
        );
        session.ask("q1").await.unwrap();
        session.ask("q2").await.unwrap();
        let texts: Vec<String> = session.turns().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["q1", "one", "q2", "two"]);
    }
}
