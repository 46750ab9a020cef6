use thiserror::Error;

use crate::i18n;

#[derive(Error, Debug)]
pub enum ClausolaError {
    /// Detected locally, before any network call is made.
    #[error("{0}")]
    Validation(String),

    /// Non-2xx response, or a 2xx whose status discriminant is not "success".
    #[error("{message}")]
    Api { message: String },

    #[error("No active chat session. Please analyze a contract.")]
    NoActiveSession,

    /// 401/403 on a session-scoped endpoint. Callers clear the stored user id.
    #[error("Not signed in")]
    Unauthorized,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClausolaError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClausolaError::Validation(message.into())
    }

    pub fn api(message: impl Into<String>) -> Self {
        ClausolaError::Api {
            message: message.into(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClausolaError::Unauthorized)
    }

    /// Display-boundary message, localized where a translation exists.
    /// Validation and API messages already arrive in the display language.
    pub fn user_message(&self, language: &str) -> String {
        match self {
            ClausolaError::NoActiveSession => i18n::text(
                language,
                "no_chat_session",
                "No active chat session. Please analyze a contract.",
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClausolaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_session_message_is_localized() {
        let err = ClausolaError::NoActiveSession;
        assert_eq!(
            err.user_message("en"),
            "No active chat session. Please analyze a contract."
        );
        assert_eq!(
            err.user_message("it"),
            "Nessuna sessione di chat attiva. Analizza prima un contratto."
        );
    }

    #[test]
    fn other_errors_pass_their_display_text_through() {
        assert_eq!(ClausolaError::api("boom").user_message("it"), "boom");
        assert_eq!(
            ClausolaError::Unauthorized.user_message("en"),
            "Not signed in"
        );
    }
}
