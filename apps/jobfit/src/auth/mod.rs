//! Sign-in flow. The only code that ever puts a token into the `TokenStore`.

pub mod token_store;

use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::scoring_client::ScoringService;
pub use token_store::{SessionToken, TokenStore};

const MIN_PASSWORD_LEN: usize = 6;

pub struct Authenticator {
    service: Arc<dyn ScoringService>,
    tokens: TokenStore,
}

impl Authenticator {
    pub fn new(service: Arc<dyn ScoringService>, tokens: TokenStore) -> Self {
        Self { service, tokens }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email = validate_credentials(email, password)?;
        let token = self.service.authenticate(&email, password).await?;
        self.tokens.set(token);
        info!("Signed in as {}", email);
        Ok(())
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email = validate_credentials(email, password)?;
        let token = self.service.signup(&email, password).await?;
        self.tokens.set(token);
        info!("Account created for {}", email);
        Ok(())
    }

    pub fn logout(&self) {
        self.tokens.clear();
        info!("Signed out");
    }
}

/// Form-level checks done before any network call. Returns the email
/// trimmed and lower-cased, the way the service stores it.
pub fn validate_credentials(email: &str, password: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !looks_like_email(&email) {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(email)
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::draft::DraftInput;
    use crate::models::MatchReport;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeAuthService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScoringService for FakeAuthService {
        async fn authenticate(&self, _email: &str, password: &str) -> Result<SessionToken, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if password == "admin123" {
                Ok(SessionToken::new("tok-login"))
            } else {
                Err(AppError::InvalidCredentials)
            }
        }

        async fn signup(&self, email: &str, _password: &str) -> Result<SessionToken, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if email == "admin@example.com" {
                Err(AppError::SignupRejected("Email already registered".into()))
            } else {
                Ok(SessionToken::new("tok-signup"))
            }
        }

        async fn analyze(
            &self,
            _resume: &DraftInput,
            _job_description: &DraftInput,
            _token: &SessionToken,
        ) -> Result<Value, AppError> {
            unreachable!("auth tests never analyze")
        }

        async fn chat(&self, _question: &str, _report: &MatchReport) -> Result<String, AppError> {
            unreachable!("auth tests never chat")
        }
    }

    fn setup() -> (Authenticator, Arc<FakeAuthService>, TokenStore) {
        let service = Arc::new(FakeAuthService::default());
        let tokens = TokenStore::new();
        (
            Authenticator::new(service.clone(), tokens.clone()),
            service,
            tokens,
        )
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let (auth, _, tokens) = setup();
        auth.login("Admin@Example.com ", "admin123").await.unwrap();
        assert_eq!(tokens.get().unwrap().as_str(), "tok-login");
    }

    #[tokio::test]
    async fn test_bad_password_leaves_store_empty() {
        let (auth, _, tokens) = setup();
        let err = auth.login("admin@example.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        assert!(!tokens.is_authenticated());
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_call() {
        let (auth, service, _) = setup();
        assert!(matches!(
            auth.login("not-an-email", "admin123").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.login("a@b.co", "12345").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signup_rejected_surfaces_message() {
        let (auth, _, tokens) = setup();
        let err = auth.signup("admin@example.com", "admin123").await.unwrap_err();
        assert_eq!(err.user_message(), "Email already registered");
        assert!(!tokens.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let (auth, _, tokens) = setup();
        auth.signup("new@example.com", "hunter22").await.unwrap();
        assert!(tokens.is_authenticated());
        auth.logout();
        assert!(!tokens.is_authenticated());
    }

    #[test]
    fn test_email_shapes() {
        assert!(looks_like_email("you@example.com"));
        assert!(looks_like_email("a.b@sub.example.org"));
        assert!(!looks_like_email("you@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("you@@example.com"));
        assert!(!looks_like_email("y ou@example.com"));
    }
}
