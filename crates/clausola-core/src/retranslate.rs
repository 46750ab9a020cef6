//! Re-expresses a completed analysis in a new language without re-uploading
//! the source file, then restarts the chat session so the model's
//! language-conditioned context is rebuilt rather than patched.

use tracing::{debug, warn};

use crate::api::Backend;
use crate::error::Result;
use crate::i18n;
use crate::pipeline::ProgressReporter;
use crate::session::{ChatController, SessionPhase};
use crate::state::AppState;

/// Language-change dispatcher. With a completed analysis in state the change
/// retranslates it; otherwise only the chat language is updated.
pub async fn change_language<B: Backend + ?Sized>(
    backend: &B,
    state: &mut AppState,
    chat: &mut ChatController,
    new_language: &str,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    if state.language == new_language {
        return Ok(());
    }
    if state.language_locked {
        debug!("language change ignored, retranslation in flight");
        return Ok(());
    }
    debug!(from = %state.language, to = %new_language, "changing language");
    state.language = new_language.to_string();

    if state.last_analysis.is_some() {
        retranslate_analysis(backend, state, chat, new_language, progress).await
    } else {
        chat.update_language(backend, new_language).await
    }
}

/// Requires a prior analysis in state. Inputs are gated for the duration; on
/// failure the previous result stays rendered (rollback), and inputs are
/// re-enabled either way.
pub async fn retranslate_analysis<B: Backend + ?Sized>(
    backend: &B,
    state: &mut AppState,
    chat: &mut ChatController,
    language: &str,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    state.language_locked = true;
    chat.set_input_enabled(false);
    progress.report(
        1,
        2,
        &i18n::text(language, "translating", "Translating analysis..."),
        true,
    );

    let result = match backend.retranslate(language).await {
        Ok(retranslated) => {
            state.set_analysis(retranslated);
            progress.report(
                2,
                2,
                &i18n::text(language, "translation_complete", "Translation complete"),
                false,
            );
            restart_chat(backend, state, chat, language).await;
            Ok(())
        }
        Err(err) => {
            // rollback: the previous result was never overwritten, keep it on
            // screen rather than a half-updated or blank view
            if state.last_analysis.is_some() {
                state.results_visible = true;
            } else {
                state.hide_results();
            }
            Err(err)
        }
    };

    state.language_locked = false;
    chat.set_input_enabled(chat.phase() == SessionPhase::Active);
    result
}

/// End, start against the same document text, then align the session language.
/// Failures here are logged, not surfaced as retranslation failures: the
/// retranslated analysis is already rendered.
async fn restart_chat<B: Backend + ?Sized>(
    backend: &B,
    state: &AppState,
    chat: &mut ChatController,
    language: &str,
) {
    let Some(document_text) = state
        .last_analysis
        .as_ref()
        .map(|analysis| analysis.document_text.clone())
    else {
        warn!("no contract text available to restart chat");
        return;
    };

    if let Err(err) = chat.start(backend, &document_text, language).await {
        warn!(error = %err, "failed to restart chat after retranslation");
        return;
    }
    if let Err(err) = chat.update_language(backend, language).await {
        warn!(error = %err, "failed to update chat language after restart");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClausolaError;
    use crate::pipeline::NoProgress;
    use crate::render::render_report;
    use crate::testing::{Call, MockBackend};
    use crate::types::AnalysisResult;

    fn analyzed_state(language: &str) -> AppState {
        let mut state = AppState::new();
        state.language = language.to_string();
        state.set_analysis(AnalysisResult {
            status: "success".to_string(),
            document_text: "original contract".to_string(),
            ..AnalysisResult::default()
        });
        state
    }

    #[tokio::test]
    async fn same_language_is_a_no_op() {
        let backend = MockBackend::new();
        let mut state = analyzed_state("en");
        let mut chat = ChatController::new();

        change_language(&backend, &mut state, &mut chat, "en", &NoProgress)
            .await
            .unwrap();
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn without_analysis_only_chat_language_updates() {
        let backend = MockBackend::new();
        let mut state = AppState::new();
        let mut chat = ChatController::new();
        chat.start(&backend, "doc", "en").await.unwrap();

        change_language(&backend, &mut state, &mut chat, "it", &NoProgress)
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![Call::ChatStart, Call::ChatUpdateLanguage]
        );
        assert_eq!(state.language, "it");
    }

    #[tokio::test]
    async fn success_replaces_result_and_restarts_chat() {
        let backend = MockBackend::new();
        backend.push_retranslate(Ok(AnalysisResult {
            status: "success".to_string(),
            document_text: "contratto originale".to_string(),
            ..AnalysisResult::default()
        }));
        let mut state = analyzed_state("en");
        let mut chat = ChatController::new();
        chat.start(&backend, "original contract", "en").await.unwrap();

        change_language(&backend, &mut state, &mut chat, "it", &NoProgress)
            .await
            .unwrap();

        assert_eq!(
            state.last_analysis.as_ref().map(|a| a.document_text.as_str()),
            Some("contratto originale")
        );
        assert_eq!(
            backend.calls(),
            vec![
                Call::ChatStart,
                Call::Retranslate,
                Call::ChatEnd,
                Call::ChatStart,
                Call::ChatUpdateLanguage,
            ]
        );
        assert!(chat.input_enabled());
        assert!(!state.language_locked);
    }

    #[tokio::test]
    async fn failure_rolls_back_to_the_previous_rendered_view() {
        let backend = MockBackend::new();
        backend.push_retranslate(Err(ClausolaError::api("translator down")));
        let mut state = analyzed_state("en");
        let mut chat = ChatController::new();
        chat.start(&backend, "original contract", "en").await.unwrap();

        let before = render_report(state.last_analysis.as_ref().unwrap(), "en");

        let err = retranslate_analysis(&backend, &mut state, &mut chat, "it", &NoProgress)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "translator down");

        let after = render_report(state.last_analysis.as_ref().unwrap(), "en");
        assert_eq!(before, after);
        assert!(state.results_visible);
        // no chat restart was attempted
        assert_eq!(backend.calls(), vec![Call::ChatStart, Call::Retranslate]);
        // inputs come back regardless of outcome
        assert!(!state.language_locked);
        assert!(chat.input_enabled());
    }

    #[tokio::test]
    async fn chat_restart_failure_does_not_fail_the_retranslation() {
        let backend = MockBackend::new();
        backend.push_retranslate(Ok(AnalysisResult {
            status: "success".to_string(),
            document_text: "contratto".to_string(),
            ..AnalysisResult::default()
        }));
        let mut state = analyzed_state("en");
        let mut chat = ChatController::new();
        chat.start(&backend, "original contract", "en").await.unwrap();
        backend.push_chat_start(Err(ClausolaError::api("no sessions left")));

        retranslate_analysis(&backend, &mut state, &mut chat, "it", &NoProgress)
            .await
            .unwrap();

        assert_eq!(
            state.last_analysis.as_ref().map(|a| a.document_text.as_str()),
            Some("contratto")
        );
        // the failed restart leaves chat input disabled
        assert!(!chat.input_enabled());
    }
}
