//! In-memory `ScoringService` used by the workflow and assistant tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::analysis::draft::DraftInput;
use crate::auth::token_store::SessionToken;
use crate::errors::AppError;
use crate::models::MatchReport;
use crate::scoring_client::ScoringService;

/// Replies are served in queue order; an empty queue falls back to a fixed
/// success. A gate, when set, parks the call until the test releases it.
#[derive(Default)]
pub struct FakeScoringService {
    analyze_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    analyze_replies: Mutex<VecDeque<Result<Value, AppError>>>,
    chat_replies: Mutex<VecDeque<Result<String, AppError>>>,
    analyze_gate: Option<Arc<Notify>>,
    chat_gate: Option<Arc<Notify>>,
    last_token: Mutex<Option<SessionToken>>,
    last_chat_report: Mutex<Option<MatchReport>>,
}

impl FakeScoringService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze_reply(self, reply: Result<Value, AppError>) -> Self {
        self.analyze_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn chat_reply(self, reply: Result<String, AppError>) -> Self {
        self.chat_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn gate_analyze(mut self, gate: Arc<Notify>) -> Self {
        self.analyze_gate = Some(gate);
        self
    }

    pub fn gate_chat(mut self, gate: Arc<Notify>) -> Self {
        self.chat_gate = Some(gate);
        self
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<SessionToken> {
        self.last_token.lock().unwrap().clone()
    }

    pub fn last_chat_report(&self) -> Option<MatchReport> {
        self.last_chat_report.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoringService for FakeScoringService {
    async fn authenticate(&self, _email: &str, _password: &str) -> Result<SessionToken, AppError> {
        Ok(SessionToken::new("fake-token"))
    }

    async fn signup(&self, _email: &str, _password: &str) -> Result<SessionToken, AppError> {
        Ok(SessionToken::new("fake-token"))
    }

    async fn analyze(
        &self,
        _resume: &DraftInput,
        _job_description: &DraftInput,
        token: &SessionToken,
    ) -> Result<Value, AppError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.clone());
        if let Some(gate) = &self.analyze_gate {
            gate.notified().await;
        }
        self.analyze_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "match_score": 7.5, "message": "Good fit" })))
    }

    async fn chat(&self, question: &str, report: &MatchReport) -> Result<String, AppError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_chat_report.lock().unwrap() = Some(report.clone());
        if let Some(gate) = &self.chat_gate {
            gate.notified().await;
        }
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("About '{question}': keep going.")))
    }
}
