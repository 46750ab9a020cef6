//! Two-stage upload/analyze orchestration: extract, then analyze, strictly in
//! sequence with fail-fast on either step. Progress is a 4-step model driving
//! whatever indicator the caller supplies.

use tracing::{debug, warn};

use crate::api::Backend;
use crate::error::{ClausolaError, Result};
use crate::i18n;
use crate::session::ChatController;
use crate::state::AppState;

pub const PROGRESS_TOTAL: u8 = 4;

/// Display-side progress sink. `busy` marks a long-running step (the original
/// client shows a blinking "Processing..." hint next to the message).
pub trait ProgressReporter {
    fn report(&self, step: u8, total: u8, message: &str, busy: bool);
}

/// Reporter that drops everything; used where no indicator is wanted.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _step: u8, _total: u8, _message: &str, _busy: bool) {}
}

/// User-selected file, already read into memory.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of a successful pipeline run. Chat initialization failure does not
/// invalidate the stored analysis; it is carried here for the caller's error
/// surface.
#[derive(Debug)]
pub struct PipelineReport {
    pub chat_error: Option<String>,
}

/// Runs the full pipeline: validate locally, extract, analyze, store the
/// result, then start a chat session scoped to the extracted document. The
/// results view is hidden before the first network call so a failed run never
/// shows a stale previous result; `state.last_analysis` itself is only
/// replaced on success.
pub async fn analyze_document<B: Backend + ?Sized>(
    backend: &B,
    state: &mut AppState,
    chat: &mut ChatController,
    document: Option<InputDocument>,
    language: &str,
    progress: &dyn ProgressReporter,
) -> Result<PipelineReport> {
    debug!("handling document upload");
    state.hide_results();

    let no_file = || {
        ClausolaError::validation(i18n::text(language, "no_file_selected", "Please select a file."))
    };
    let document = document.ok_or_else(no_file)?;
    if document.bytes.is_empty() {
        return Err(no_file());
    }

    progress.report(
        1,
        PROGRESS_TOTAL,
        &i18n::text(language, "extracting_text", "Extracting text..."),
        true,
    );
    let extracted = backend
        .extract_document(&document.file_name, document.bytes, language)
        .await?;

    progress.report(
        2,
        PROGRESS_TOTAL,
        &i18n::text(language, "analyzing_contract", "Analyzing contract..."),
        true,
    );
    let analysis = backend.analyze(&extracted.text, language).await?;

    progress.report(
        4,
        PROGRESS_TOTAL,
        &i18n::text(language, "analysis_complete", "Analysis complete"),
        false,
    );
    let document_text = analysis.document_text.clone();
    state.set_analysis(analysis);

    let chat_error = match chat.start(backend, &document_text, language).await {
        Ok(()) => None,
        Err(err) => {
            warn!(error = %err, "chat initialization failed");
            Some(err.to_string())
        }
    };

    Ok(PipelineReport { chat_error })
}
