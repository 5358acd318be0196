use std::sync::Arc;

use crate::analysis::AnalysisWorkflow;
use crate::auth::{Authenticator, TokenStore};
use crate::config::Config;
use crate::errors::AppError;
use crate::scoring_client::{HttpScoringService, ScoringService};

/// Shared client state: one scoring service and one token store, handed to
/// every flow that needs them.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tokens: TokenStore,
    /// Pluggable scoring backend. Default: `HttpScoringService`.
    pub service: Arc<dyn ScoringService>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let service = HttpScoringService::new(&config.api_url, config.timeout_secs)?;
        Ok(Self::with_service(config, Arc::new(service)))
    }

    pub fn with_service(config: Config, service: Arc<dyn ScoringService>) -> Self {
        Self {
            config,
            tokens: TokenStore::new(),
            service,
        }
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(self.service.clone(), self.tokens.clone())
    }

    pub fn workflow(&self) -> AnalysisWorkflow {
        AnalysisWorkflow::new(
            self.service.clone(),
            self.tokens.clone(),
            self.config.score_scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DraftInput, SubmitOutcome};
    use crate::testing::FakeScoringService;

    #[tokio::test]
    async fn test_login_token_is_shared_with_workflow() {
        let state = AppState::with_service(Config::default(), Arc::new(FakeScoringService::new()));
        let workflow = state.workflow();

        state
            .authenticator()
            .login("you@example.com", "secret1")
            .await
            .unwrap();
        workflow.set_resume(DraftInput::text("Rust developer")).unwrap();
        workflow.advance().unwrap();
        workflow
            .set_job_description(DraftInput::text("Backend engineer"))
            .unwrap();

        assert!(matches!(
            workflow.submit().await.unwrap(),
            SubmitOutcome::Completed(_)
        ));
    }

    #[test]
    fn test_from_config_builds_http_service() {
        let state = AppState::from_config(Config::default()).unwrap();
        assert!(!state.tokens.is_authenticated());
    }
}
