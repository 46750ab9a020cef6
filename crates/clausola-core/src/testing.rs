//! In-test collaborators: a recording mock backend and suggester, plus a
//! progress recorder. Queued responses are consumed front to first; an empty
//! queue falls back to a benign success so tests only script what they assert.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{Backend, Suggester, SuggestionField};
use crate::error::{ClausolaError, Result};
use crate::pipeline::ProgressReporter;
use crate::search::SearchQuery;
use crate::types::{
    AnalysisResult, AuthStatus, ExtractResponse, FrequentQuestion, HistoryEntry, SearchResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Extract,
    Analyze,
    Retranslate,
    ChatStart,
    ChatMessage,
    ChatUpdateLanguage,
    ChatEnd,
    FrequentQuestions,
    History,
    Search,
    AuthCheck,
}

#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    extract: Mutex<VecDeque<Result<ExtractResponse>>>,
    analyze: Mutex<VecDeque<Result<AnalysisResult>>>,
    retranslate: Mutex<VecDeque<Result<AnalysisResult>>>,
    chat_start: Mutex<VecDeque<Result<String>>>,
    chat_message: Mutex<VecDeque<Result<String>>>,
    chat_update_language: Mutex<VecDeque<Result<()>>>,
    chat_end: Mutex<VecDeque<Result<()>>>,
    search: Mutex<VecDeque<Result<SearchResponse>>>,
    search_delay: Mutex<Option<Duration>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn take<T>(queue: &Mutex<VecDeque<Result<T>>>, default: impl FnOnce() -> T) -> Result<T> {
    guard(queue).pop_front().unwrap_or_else(|| Ok(default()))
}

impl MockBackend {
    pub fn new() -> Self {
        MockBackend::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        guard(&self.calls).clone()
    }

    fn record(&self, call: Call) {
        guard(&self.calls).push(call);
    }

    pub fn push_extract(&self, response: Result<ExtractResponse>) {
        guard(&self.extract).push_back(response);
    }

    pub fn push_analyze(&self, response: Result<AnalysisResult>) {
        guard(&self.analyze).push_back(response);
    }

    pub fn push_retranslate(&self, response: Result<AnalysisResult>) {
        guard(&self.retranslate).push_back(response);
    }

    pub fn push_chat_start(&self, response: Result<String>) {
        guard(&self.chat_start).push_back(response);
    }

    pub fn push_chat_message(&self, response: Result<String>) {
        guard(&self.chat_message).push_back(response);
    }

    pub fn push_chat_update_language(&self, response: Result<()>) {
        guard(&self.chat_update_language).push_back(response);
    }

    pub fn push_chat_end(&self, response: Result<()>) {
        guard(&self.chat_end).push_back(response);
    }

    pub fn push_search(&self, response: Result<SearchResponse>) {
        guard(&self.search).push_back(response);
    }

    pub fn set_search_delay(&self, delay: Duration) {
        *guard(&self.search_delay) = Some(delay);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn extract_document(
        &self,
        _file_name: &str,
        _bytes: Vec<u8>,
        _language: &str,
    ) -> Result<ExtractResponse> {
        self.record(Call::Extract);
        take(&self.extract, || ExtractResponse {
            text: "extracted text".to_string(),
        })
    }

    async fn analyze(&self, text: &str, _language: &str) -> Result<AnalysisResult> {
        self.record(Call::Analyze);
        let text = text.to_string();
        take(&self.analyze, || AnalysisResult {
            status: "success".to_string(),
            document_text: text,
            ..AnalysisResult::default()
        })
    }

    async fn retranslate(&self, _language: &str) -> Result<AnalysisResult> {
        self.record(Call::Retranslate);
        take(&self.retranslate, || AnalysisResult {
            status: "success".to_string(),
            ..AnalysisResult::default()
        })
    }

    async fn chat_start(&self, _contract_text: &str, _language: &str) -> Result<String> {
        self.record(Call::ChatStart);
        take(&self.chat_start, || "session-1".to_string())
    }

    async fn chat_message(
        &self,
        _session_id: &str,
        _message: &str,
        _language: &str,
    ) -> Result<String> {
        self.record(Call::ChatMessage);
        take(&self.chat_message, || "reply".to_string())
    }

    async fn chat_update_language(&self, _session_id: &str, _language: &str) -> Result<()> {
        self.record(Call::ChatUpdateLanguage);
        take(&self.chat_update_language, || ())
    }

    async fn chat_end(&self, _session_id: &str) -> Result<()> {
        self.record(Call::ChatEnd);
        take(&self.chat_end, || ())
    }

    async fn frequent_questions(&self) -> Result<Vec<FrequentQuestion>> {
        self.record(Call::FrequentQuestions);
        Ok(Vec::new())
    }

    async fn chat_history(&self) -> Result<Vec<HistoryEntry>> {
        self.record(Call::History);
        Ok(Vec::new())
    }

    async fn student_search(&self, _query: &SearchQuery) -> Result<SearchResponse> {
        self.record(Call::Search);
        let delay = *guard(&self.search_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        take(&self.search, || SearchResponse {
            status: "success".to_string(),
            ..SearchResponse::default()
        })
    }

    async fn auth_check(&self) -> Result<AuthStatus> {
        self.record(Call::AuthCheck);
        Ok(AuthStatus {
            authenticated: true,
            user_id: Some("1".to_string()),
        })
    }
}

#[derive(Default)]
pub struct RecordingSuggester {
    prefixes: Mutex<Vec<String>>,
    suggestions: Vec<String>,
    fail: bool,
}

impl RecordingSuggester {
    pub fn with_suggestions(suggestions: Vec<String>) -> Self {
        RecordingSuggester {
            suggestions,
            ..RecordingSuggester::default()
        }
    }

    pub fn failing() -> Self {
        RecordingSuggester {
            fail: true,
            ..RecordingSuggester::default()
        }
    }

    pub fn prefixes(&self) -> Vec<String> {
        guard(&self.prefixes).clone()
    }
}

#[async_trait]
impl Suggester for RecordingSuggester {
    async fn suggest(&self, _field: SuggestionField, prefix: &str) -> Result<Vec<String>> {
        guard(&self.prefixes).push(prefix.to_string());
        if self.fail {
            return Err(ClausolaError::api("lookup unavailable"));
        }
        Ok(self.suggestions.clone())
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    steps: Mutex<Vec<(u8, u8, String, bool)>>,
}

impl RecordingProgress {
    pub fn steps(&self) -> Vec<(u8, u8, String, bool)> {
        guard(&self.steps).clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, step: u8, total: u8, message: &str, busy: bool) {
        guard(&self.steps).push((step, total, message.to_string(), busy));
    }
}
