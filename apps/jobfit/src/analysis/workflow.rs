//! Analysis Workflow — the step state machine behind the upload flow.
//!
//! Flow: CollectingResume → CollectingJobDescription → Submitting → Result,
//!       with Reset back to CollectingResume.
//!
//! Step changes go through the pure `WorkflowStep::next`; `AnalysisWorkflow`
//! applies them and performs the one side effect (the analyze call).
//! Reset is refused while a submission is in flight, so a response always
//! lands on the state that dispatched it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::draft::{DraftInput, UploadDraft};
use crate::analysis::normalizer::{normalize, ScoreScale};
use crate::assistant::AssistantSession;
use crate::auth::token_store::TokenStore;
use crate::errors::AppError;
use crate::models::MatchReport;
use crate::scoring_client::ScoringService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    CollectingResume,
    CollectingJobDescription,
    Submitting,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    Advance,
    Back,
    Submit,
    AnalyzeSucceeded,
    AnalyzeFailed,
    Reset,
}

/// Facts about the draft and session that transition guards consult.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Guards {
    pub has_resume: bool,
    pub draft_ready: bool,
    pub authenticated: bool,
}

impl WorkflowStep {
    /// Pure transition function. Returns the next step or the reason the
    /// event is not allowed from `self`.
    pub fn next(self, event: WorkflowEvent, guards: Guards) -> Result<WorkflowStep, AppError> {
        use WorkflowEvent as E;
        use WorkflowStep as S;

        match (self, event) {
            (S::CollectingResume, E::Advance) if guards.has_resume => Ok(S::CollectingJobDescription),
            (S::CollectingResume, E::Advance) => {
                Err(AppError::Validation("Please upload your resume".to_string()))
            }

            (S::CollectingJobDescription, E::Back) => Ok(S::CollectingResume),

            (S::CollectingJobDescription, E::Submit) if !guards.draft_ready => Err(
                AppError::Validation("Please upload both resume and job description".to_string()),
            ),
            (S::CollectingJobDescription, E::Submit) if !guards.authenticated => {
                Err(AppError::Unauthenticated)
            }
            (S::CollectingJobDescription, E::Submit) => Ok(S::Submitting),

            (S::Submitting, E::AnalyzeSucceeded) => Ok(S::Result),
            (S::Submitting, E::AnalyzeFailed) => Ok(S::CollectingJobDescription),
            (S::Submitting, _) => Err(AppError::Busy(
                "Analysis in progress. Please wait for it to finish.".to_string(),
            )),

            (_, E::Reset) => Ok(S::CollectingResume),

            (step, event) => Err(AppError::InvalidTransition(format!(
                "{event:?} is not allowed while {step}"
            ))),
        }
    }

    pub fn is_collecting(self) -> bool {
        matches!(
            self,
            WorkflowStep::CollectingResume | WorkflowStep::CollectingJobDescription
        )
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStep::CollectingResume => "collecting resume",
            WorkflowStep::CollectingJobDescription => "collecting job description",
            WorkflowStep::Submitting => "submitting",
            WorkflowStep::Result => "showing result",
        };
        f.write_str(label)
    }
}

/// Result of `AnalysisWorkflow::submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The analysis finished; the report is now held by the workflow.
    Completed(Arc<MatchReport>),
    /// A submission was already in flight; nothing was sent.
    Suppressed,
}

struct WorkflowInner {
    step: WorkflowStep,
    draft: UploadDraft,
    report: Option<Arc<MatchReport>>,
}

/// Drives one user's upload → analyze → result flow and owns the assistant
/// session scoped to the current report.
pub struct AnalysisWorkflow {
    service: Arc<dyn ScoringService>,
    tokens: TokenStore,
    scale: ScoreScale,
    assistant: AssistantSession,
    inner: Mutex<WorkflowInner>,
}

impl AnalysisWorkflow {
    pub fn new(service: Arc<dyn ScoringService>, tokens: TokenStore, scale: ScoreScale) -> Self {
        Self {
            assistant: AssistantSession::new(service.clone()),
            service,
            tokens,
            scale,
            inner: Mutex::new(WorkflowInner {
                step: WorkflowStep::CollectingResume,
                draft: UploadDraft::new(),
                report: None,
            }),
        }
    }

    // ── Observations ────────────────────────────────────────────────────────

    pub fn step(&self) -> WorkflowStep {
        self.lock().step
    }

    /// The held report; `Some` only in `Result`.
    pub fn report(&self) -> Option<Arc<MatchReport>> {
        self.lock().report.clone()
    }

    pub fn draft(&self) -> UploadDraft {
        self.lock().draft.clone()
    }

    pub fn assistant(&self) -> &AssistantSession {
        &self.assistant
    }

    // ── Draft edits ─────────────────────────────────────────────────────────

    pub fn set_resume(&self, value: DraftInput) -> Result<(), AppError> {
        self.edit_draft(|draft| draft.set_resume(value))
    }

    pub fn set_job_description(&self, value: DraftInput) -> Result<(), AppError> {
        self.edit_draft(|draft| draft.set_job_description(value))
    }

    fn edit_draft(&self, edit: impl FnOnce(&mut UploadDraft)) -> Result<(), AppError> {
        let mut inner = self.lock();
        match inner.step {
            step if step.is_collecting() => {
                edit(&mut inner.draft);
                Ok(())
            }
            WorkflowStep::Submitting => Err(AppError::Busy(
                "Inputs cannot change while the analysis is running".to_string(),
            )),
            step => Err(AppError::InvalidTransition(format!(
                "Inputs cannot change while {step}; reset to start a new analysis"
            ))),
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────────

    pub fn advance(&self) -> Result<WorkflowStep, AppError> {
        self.apply(WorkflowEvent::Advance)
    }

    pub fn back(&self) -> Result<WorkflowStep, AppError> {
        self.apply(WorkflowEvent::Back)
    }

    /// Clears the draft, drops the report and the assistant conversation.
    /// Refused with `Busy` while submitting.
    pub fn reset(&self) -> Result<(), AppError> {
        {
            let mut inner = self.lock();
            inner.step = inner.step.next(WorkflowEvent::Reset, Guards::default())?;
            inner.draft.reset();
            inner.report = None;
        }
        self.assistant.rescope(None);
        info!("Analysis workflow reset");
        Ok(())
    }

    /// Sends the draft for analysis. At most one analyze call is in flight;
    /// a second `submit` meanwhile returns `Suppressed` without a call.
    ///
    /// On failure the workflow is back in `CollectingJobDescription` with the
    /// draft intact. A 401 also clears the token and yields `SessionExpired`.
    pub async fn submit(&self) -> Result<SubmitOutcome, AppError> {
        let (resume, job_description, token) = {
            let mut inner = self.lock();
            if inner.step == WorkflowStep::Submitting {
                debug!("Submit suppressed: analysis already in flight");
                return Ok(SubmitOutcome::Suppressed);
            }

            let token = self.tokens.get();
            let guards = Guards {
                has_resume: inner.draft.has_resume(),
                draft_ready: inner.draft.is_ready(),
                authenticated: token.is_some(),
            };
            let next = inner.step.next(WorkflowEvent::Submit, guards)?;
            let token = token.ok_or(AppError::Unauthenticated)?;
            let (resume, job_description) = inner.draft.submission().ok_or_else(|| {
                AppError::Validation("Please upload both resume and job description".to_string())
            })?;

            inner.step = next;
            (resume, job_description, token)
        };

        let mut in_flight = InFlightSubmission {
            workflow: self,
            settled: false,
        };

        info!("Submitting analysis");
        let result = self
            .service
            .analyze(&resume, &job_description, &token)
            .await
            .and_then(|payload| normalize(&payload, self.scale));

        in_flight.settled = true;
        self.complete(result)
    }

    fn complete(&self, result: Result<MatchReport, AppError>) -> Result<SubmitOutcome, AppError> {
        let failure = match result {
            Ok(report) => {
                let report = Arc::new(report);
                {
                    let mut inner = self.lock();
                    inner.step = inner.step.next(WorkflowEvent::AnalyzeSucceeded, Guards::default())?;
                    inner.report = Some(report.clone());
                }
                self.assistant.rescope(Some(report.clone()));
                info!("Analysis complete: overall score {:.1}", report.overall_score);
                return Ok(SubmitOutcome::Completed(report));
            }
            Err(AppError::Unauthorized) => {
                warn!("Analyze rejected the session token; signing out");
                self.tokens.clear();
                AppError::SessionExpired
            }
            Err(AppError::MalformedPayload(msg)) => {
                warn!("Analyze returned a malformed payload: {}", msg);
                AppError::AnalysisFailed(format!("malformed payload: {msg}"))
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                e
            }
        };

        self.fail_submission();
        Err(failure)
    }

    fn fail_submission(&self) {
        let mut inner = self.lock();
        if let Ok(step) = inner.step.next(WorkflowEvent::AnalyzeFailed, Guards::default()) {
            inner.step = step;
        }
    }

    fn apply(&self, event: WorkflowEvent) -> Result<WorkflowStep, AppError> {
        let mut inner = self.lock();
        let guards = Guards {
            has_resume: inner.draft.has_resume(),
            draft_ready: inner.draft.is_ready(),
            authenticated: self.tokens.is_authenticated(),
        };
        let next = inner.step.next(event, guards)?;
        debug!("Workflow {} → {} on {:?}", inner.step, next, event);
        inner.step = next;
        Ok(next)
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Returns the workflow to the job-description step if the `submit` future
/// is dropped mid-call, so it never stays stuck in `Submitting`.
struct InFlightSubmission<'a> {
    workflow: &'a AnalysisWorkflow,
    settled: bool,
}

impl Drop for InFlightSubmission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Analysis request abandoned before completion");
            self.workflow.fail_submission();
        }
    }
}
