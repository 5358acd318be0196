use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Opaque bearer credential issued by the scoring service.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Never print the secret itself.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Process-wide holder of the current session token.
///
/// Cloning yields another handle to the same slot. Only the sign-in flow sets
/// a token; the analysis workflow reads it and clears it on a 401.
#[derive(Clone, Default)]
pub struct TokenStore {
    slot: Arc<Mutex<Option<SessionToken>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SessionToken> {
        self.lock().clone()
    }

    pub fn set(&self, token: SessionToken) {
        *self.lock() = Some(token);
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SessionToken>> {
        // The slot is a plain value; a poisoned lock still holds a usable one.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
