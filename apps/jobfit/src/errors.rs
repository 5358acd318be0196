use thiserror::Error;

/// Client-level error type.
/// Every failure in the analysis workflow, the assistant session and the
/// collaborator calls is one of these variants.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Sign-up rejected: {0}")]
    SignupRejected(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Chat failed: {0}")]
    ChatFailed(String),

    #[error("No analysis report available")]
    NoReport,

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The single notification line shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthenticated => "Please sign in to analyze your resume.".to_string(),
            AppError::Unauthorized | AppError::SessionExpired => {
                "Session expired. Please login again.".to_string()
            }
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::SignupRejected(msg) => msg.clone(),
            AppError::AnalysisFailed(_) | AppError::MalformedPayload(_) => {
                "Analysis failed".to_string()
            }
            AppError::ChatFailed(_) => "Something went wrong.".to_string(),
            AppError::NoReport => "Run an analysis before asking questions.".to_string(),
            AppError::Busy(msg) => msg.clone(),
            AppError::InvalidTransition(msg) => msg.clone(),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An unexpected error occurred".to_string()
            }
        }
    }

    /// True when the caller should send the user back to the sign-in step.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AppError::Unauthenticated | AppError::Unauthorized | AppError::SessionExpired
        )
    }
}
