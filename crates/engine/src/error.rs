//! The module contains the errors the engine can return.
//!
//! [`EngineError`] is the caller-facing taxonomy; backend failures arrive
//! wrapped in [`StoreError`]. Every variant classifies as retryable or not
//! via [`EngineError::is_retryable`], and maps to a localized message via
//! [`EngineError::user_message`]; the internal `Display` rendering is for
//! logs, the user message is for screens.
use thiserror::Error;

/// Failures reported by the document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("malformed document: {0}")]
    Data(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether retrying the same operation later can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::Unavailable(_))
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Validation(String),
    #[error("caller is not authenticated")]
    Unauthenticated,
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl EngineError {
    /// Whether the failed operation is worth queueing for a later retry.
    ///
    /// Network faults, backend saturation and unclassified failures are
    /// transient; auth, validation, permission and not-found failures are
    /// not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Unknown(_) => true,
            Self::Store(err) => err.is_retryable(),
            Self::Validation(_) | Self::Unauthenticated => false,
        }
    }

    /// Human-readable, localized message for the UI, distinct from the
    /// internal error rendering.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Error de conexión. Verifica tu conexión a internet e inténtalo de nuevo."
                    .to_string()
            }
            Self::Store(StoreError::PermissionDenied(_)) => {
                "No tienes permisos para realizar esta operación.".to_string()
            }
            Self::Store(StoreError::NotFound(_)) => {
                "No se encontró la información solicitada.".to_string()
            }
            Self::Store(StoreError::QuotaExceeded(_) | StoreError::Unavailable(_)) => {
                "El servicio no está disponible en este momento. Inténtalo más tarde.".to_string()
            }
            Self::Store(StoreError::Data(_)) => {
                "Ocurrió un problema al leer tus datos.".to_string()
            }
            Self::Validation(message) => message.clone(),
            Self::Unauthenticated => {
                "Usuario no autenticado. Inicia sesión para continuar.".to_string()
            }
            Self::Unknown(_) => "Ocurrió un error inesperado. Inténtalo de nuevo.".to_string(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Network(a), Self::Network(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Unauthenticated, Self::Unauthenticated) => true,
            (Self::Unknown(a), Self::Unknown(b)) => a == b,
            (Self::Store(a), Self::Store(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(EngineError::Network("timeout".to_string()).is_retryable());
        assert!(EngineError::Unknown("boom".to_string()).is_retryable());
        assert!(
            EngineError::Store(StoreError::Unavailable("maintenance".to_string())).is_retryable()
        );
        assert!(EngineError::Store(StoreError::QuotaExceeded("writes".to_string())).is_retryable());

        assert!(!EngineError::Unauthenticated.is_retryable());
        assert!(!EngineError::Validation("monto inválido".to_string()).is_retryable());
        assert!(
            !EngineError::Store(StoreError::PermissionDenied("rules".to_string())).is_retryable()
        );
        assert!(!EngineError::Store(StoreError::NotFound("doc".to_string())).is_retryable());
    }

    #[test]
    fn user_message_is_localized() {
        let err = EngineError::Unauthenticated;
        assert!(err.user_message().starts_with("Usuario no autenticado"));
        assert_ne!(err.user_message(), err.to_string());
    }
}
