//! Authentication provider port.
//!
//! Onboarding and session management live in the managed provider; the
//! engine only ever asks who the current user is, and rejects writes when
//! nobody is signed in.

use crate::EngineError;

/// An authenticated session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
}

#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    /// The signed-in session, if any.
    fn current_user(&self) -> Option<UserSession>;

    async fn create_user(&self, email: &str, password: &str) -> Result<UserSession, EngineError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession, EngineError>;

    async fn sign_out(&self) -> Result<(), EngineError>;
}
