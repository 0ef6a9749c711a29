use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use engine::{AuthProvider, EngineError, UserSession};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, (String, String)>,
    session: Option<UserSession>,
}

/// In-memory auth provider: accounts live in a map, at most one session.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuth {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider already signed in as `user_id`. Test convenience.
    #[must_use]
    pub fn signed_in(user_id: &str) -> Self {
        let auth = Self::new();
        auth.inner().session = Some(UserSession {
            user_id: user_id.to_string(),
            email: format!("{user_id}@sofinance.test"),
        });
        auth
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<UserSession> {
        self.inner().session.clone()
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<UserSession, EngineError> {
        let mut inner = self.inner();
        if inner.users.contains_key(email) {
            return Err(EngineError::Validation(
                "el correo ya está registrado".to_string(),
            ));
        }
        let user_id = format!("user-{}", inner.users.len() + 1);
        inner
            .users
            .insert(email.to_string(), (password.to_string(), user_id.clone()));
        let session = UserSession {
            user_id,
            email: email.to_string(),
        };
        inner.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, EngineError> {
        let mut inner = self.inner();
        match inner.users.get(email) {
            Some((stored, user_id)) if stored == password => {
                let session = UserSession {
                    user_id: user_id.clone(),
                    email: email.to_string(),
                };
                inner.session = Some(session.clone());
                Ok(session)
            }
            _ => Err(EngineError::Unauthenticated),
        }
    }

    async fn sign_out(&self) -> Result<(), EngineError> {
        self.inner().session = None;
        Ok(())
    }
}
