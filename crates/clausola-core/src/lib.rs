//! Clausola Core Library
//!
//! Client-side orchestration for a pipeline-backed contract-analysis service:
//! upload/extract/analyze sequencing, a session-scoped chat state machine,
//! retranslation with rollback, student search, and pure result rendering.

pub mod api;
pub mod error;
pub mod i18n;
pub mod pipeline;
pub mod prefs;
pub mod render;
pub mod retranslate;
pub mod search;
pub mod session;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used items at crate root
pub use api::{ApiClient, ApiClientConfig, Backend, HttpSuggester, Suggester, SuggestionField};
pub use error::{ClausolaError, Result};
pub use pipeline::{
    InputDocument, NoProgress, PipelineReport, ProgressReporter, analyze_document,
};
pub use prefs::{AnalysisSnapshot, Preferences, load_preferences, preferences_path, save_preferences};
pub use render::{RenderedReport, ScoreCard, ScoreClass, classify_score, render_report};
pub use retranslate::{change_language, retranslate_analysis};
pub use search::{SearchCategory, SearchController, SearchQuery, SortOrder, SuggestionBox};
pub use session::{ChatController, SessionPhase, TranscriptEntry};
pub use state::{AppState, Mode};
pub use types::{
    AnalysisResult, AuthStatus, CategoryScore, ChatMessage, EvaluationBlock, ExtractResponse,
    FrequentQuestion, HistoryEntry, SearchResponse, SearchResult, SummaryBlock,
};
