//! Document-scoped chat session lifecycle. At most one session is `Starting`
//! or `Active` at a time; a new start tears down any existing session first,
//! best-effort. Teardown always clears local state, whatever the server says.

use tracing::{debug, warn};

use crate::api::Backend;
use crate::error::{ClausolaError, Result};
use crate::i18n;
use crate::types::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    NoSession,
    Starting,
    Active,
    Ending,
}

/// Transcript entry. `Typing` is the distinguished transient placeholder shown
/// while a reply is in flight; it is removed on the next bot message or
/// failure, and it is the only entry ever removed.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Message(ChatMessage),
    Typing,
}

#[derive(Debug, Default)]
pub struct ChatController {
    phase: SessionPhase,
    session_id: Option<String>,
    transcript: Vec<TranscriptEntry>,
    input_enabled: bool,
}

impl ChatController {
    pub fn new() -> Self {
        ChatController::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.transcript.iter().filter_map(|entry| match entry {
            TranscriptEntry::Message(message) => Some(message),
            TranscriptEntry::Typing => None,
        })
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages().last()
    }

    /// Used by the retranslation controller to gate input for the duration of
    /// its round trip.
    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    /// Starts a session scoped to `document_text`. Empty text is a local
    /// precondition failure: no network call is made and input stays disabled.
    pub async fn start<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        document_text: &str,
        language: &str,
    ) -> Result<()> {
        self.transcript.clear();
        self.input_enabled = false;

        if document_text.trim().is_empty() {
            // local failure: drop any previous session id so phase and id agree
            self.session_id = None;
            self.phase = SessionPhase::NoSession;
            return Err(ClausolaError::validation(
                "no document text to start a chat session",
            ));
        }

        // supersede any previous session, ignoring teardown failure
        self.end(backend).await?;

        self.phase = SessionPhase::Starting;
        match backend.chat_start(document_text, language).await {
            Ok(session_id) => {
                debug!(%session_id, "chat session started");
                self.session_id = Some(session_id);
                self.phase = SessionPhase::Active;
                self.input_enabled = true;
                Ok(())
            }
            Err(err) => {
                self.session_id = None;
                self.phase = SessionPhase::NoSession;
                Err(err)
            }
        }
    }

    /// Sends one message. Empty text is a no-op; sending without an active
    /// session fails locally with no network call and no transcript echo. On
    /// success the reply is appended; on failure a locally rendered error
    /// message is appended instead so the conversation stays readable. Input
    /// is re-enabled on every path.
    pub async fn send_message<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        text: &str,
        language: &str,
    ) -> Result<Option<String>> {
        let message = text.trim();
        if message.is_empty() {
            return Ok(None);
        }
        if self.phase != SessionPhase::Active {
            return Err(ClausolaError::NoActiveSession);
        }
        let Some(session_id) = self.session_id.clone() else {
            return Err(ClausolaError::NoActiveSession);
        };

        self.push_message(message, true);
        self.transcript.push(TranscriptEntry::Typing);
        self.input_enabled = false;

        let outcome = backend.chat_message(&session_id, message, language).await;
        self.remove_typing();

        let result = match outcome {
            Ok(reply) => {
                self.push_message(reply.clone(), false);
                Ok(Some(reply))
            }
            Err(err) => {
                let label = i18n::text(language, "chat_error", "Error");
                self.push_message(format!("{label}: {err}"), false);
                Err(err)
            }
        };

        self.input_enabled = true;
        result
    }

    /// No-op without an active session. Failure leaves the session intact.
    pub async fn update_language<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        language: &str,
    ) -> Result<()> {
        if self.phase != SessionPhase::Active {
            return Ok(());
        }
        let Some(session_id) = self.session_id.clone() else {
            return Ok(());
        };
        backend.chat_update_language(&session_id, language).await?;
        debug!(language, "chat language updated");
        Ok(())
    }

    /// Ends the active session, best-effort: a server failure is only logged.
    /// Local state is cleared and input disabled unconditionally, so calling
    /// this twice is a no-op. Must run on shutdown to avoid leaking
    /// server-side sessions.
    pub async fn end<B: Backend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        self.phase = SessionPhase::Ending;
        if let Err(err) = backend.chat_end(&session_id).await {
            warn!(error = %err, "failed to end chat session");
        }
        self.phase = SessionPhase::NoSession;
        self.input_enabled = false;
        Ok(())
    }

    fn push_message(&mut self, text: impl Into<String>, is_user: bool) {
        self.transcript
            .push(TranscriptEntry::Message(ChatMessage::new(text, is_user)));
    }

    fn remove_typing(&mut self) {
        self.transcript
            .retain(|entry| !matches!(entry, TranscriptEntry::Typing));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClausolaError;
    use crate::testing::{Call, MockBackend};

    async fn active_controller(backend: &MockBackend) -> ChatController {
        let mut chat = ChatController::new();
        chat.start(backend, "contract text", "en").await.unwrap();
        chat
    }

    #[tokio::test]
    async fn start_requires_document_text() {
        let backend = MockBackend::new();
        let mut chat = ChatController::new();

        let err = chat.start(&backend, "   ", "en").await.unwrap_err();
        assert!(matches!(err, ClausolaError::Validation(_)));
        assert_eq!(chat.phase(), SessionPhase::NoSession);
        assert!(!chat.input_enabled());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_start_precondition_drops_previous_session_id() {
        let backend = MockBackend::new();
        let mut chat = active_controller(&backend).await;

        chat.start(&backend, "   ", "en").await.unwrap_err();
        assert_eq!(chat.phase(), SessionPhase::NoSession);
        assert!(chat.session_id().is_none());
        // still purely local: no teardown request was issued
        assert_eq!(backend.calls(), vec![Call::ChatStart]);
    }

    #[tokio::test]
    async fn start_activates_session_and_enables_input() {
        let backend = MockBackend::new();
        backend.push_chat_start(Ok("session-42".to_string()));

        let chat = active_controller(&backend).await;
        assert_eq!(chat.phase(), SessionPhase::Active);
        assert_eq!(chat.session_id(), Some("session-42"));
        assert!(chat.input_enabled());
    }

    #[tokio::test]
    async fn start_supersedes_existing_session() {
        let backend = MockBackend::new();
        let mut chat = active_controller(&backend).await;

        chat.start(&backend, "another contract", "en").await.unwrap();
        assert_eq!(
            backend.calls(),
            vec![Call::ChatStart, Call::ChatEnd, Call::ChatStart]
        );
    }

    #[tokio::test]
    async fn start_failure_leaves_no_session() {
        let backend = MockBackend::new();
        backend.push_chat_start(Err(ClausolaError::api("start refused")));

        let mut chat = ChatController::new();
        let err = chat.start(&backend, "contract", "en").await.unwrap_err();
        assert_eq!(err.to_string(), "start refused");
        assert_eq!(chat.phase(), SessionPhase::NoSession);
        assert!(!chat.input_enabled());
    }

    #[tokio::test]
    async fn empty_message_is_a_no_op() {
        let backend = MockBackend::new();
        let mut chat = active_controller(&backend).await;
        let transcript_len = chat.transcript().len();

        let sent = chat.send_message(&backend, "   ", "en").await.unwrap();
        assert!(sent.is_none());
        assert_eq!(chat.transcript().len(), transcript_len);
        assert_eq!(backend.calls(), vec![Call::ChatStart]);
    }

    #[tokio::test]
    async fn send_without_session_fails_locally_without_echo() {
        let backend = MockBackend::new();
        let mut chat = ChatController::new();

        let err = chat.send_message(&backend, "Hi", "en").await.unwrap_err();
        assert!(matches!(err, ClausolaError::NoActiveSession));
        assert!(chat.transcript().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn send_appends_echo_and_reply_and_drops_typing() {
        let backend = MockBackend::new();
        backend.push_chat_message(Ok("the notice period is 30 days".to_string()));
        let mut chat = active_controller(&backend).await;

        let reply = chat
            .send_message(&backend, "what is the notice period?", "en")
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("the notice period is 30 days"));

        let messages: Vec<_> = chat.messages().collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user);
        assert_eq!(messages[0].text, "what is the notice period?");
        assert!(!messages[1].is_user);
        assert!(!chat.transcript().contains(&TranscriptEntry::Typing));
        assert!(chat.input_enabled());
    }

    #[tokio::test]
    async fn send_failure_echoes_error_into_transcript() {
        let backend = MockBackend::new();
        backend.push_chat_message(Err(ClausolaError::api("model unavailable")));
        let mut chat = active_controller(&backend).await;

        let err = chat.send_message(&backend, "Hi", "en").await.unwrap_err();
        assert_eq!(err.to_string(), "model unavailable");

        let messages: Vec<_> = chat.messages().collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "Error: model unavailable");
        assert!(!chat.transcript().contains(&TranscriptEntry::Typing));
        // input is always re-enabled in cleanup
        assert!(chat.input_enabled());
        // the session survives a failed send
        assert_eq!(chat.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn update_language_without_session_is_a_no_op() {
        let backend = MockBackend::new();
        let mut chat = ChatController::new();
        chat.update_language(&backend, "it").await.unwrap();
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn update_language_failure_keeps_session() {
        let backend = MockBackend::new();
        backend.push_chat_update_language(Err(ClausolaError::api("nope")));
        let mut chat = active_controller(&backend).await;

        assert!(chat.update_language(&backend, "it").await.is_err());
        assert_eq!(chat.phase(), SessionPhase::Active);
        assert!(chat.session_id().is_some());
    }

    #[tokio::test]
    async fn double_end_is_idempotent() {
        let backend = MockBackend::new();
        let mut chat = active_controller(&backend).await;

        chat.end(&backend).await.unwrap();
        chat.end(&backend).await.unwrap();

        assert_eq!(chat.phase(), SessionPhase::NoSession);
        assert!(chat.session_id().is_none());
        assert!(!chat.input_enabled());
        // exactly one end request reached the server
        assert_eq!(backend.calls(), vec![Call::ChatStart, Call::ChatEnd]);
    }

    #[tokio::test]
    async fn end_clears_local_state_even_when_server_fails() {
        let backend = MockBackend::new();
        backend.push_chat_end(Err(ClausolaError::api("already gone")));
        let mut chat = active_controller(&backend).await;

        chat.end(&backend).await.unwrap();
        assert_eq!(chat.phase(), SessionPhase::NoSession);
        assert!(chat.session_id().is_none());
    }
}
