//! Student-search mode: university + category queries with local validation,
//! an in-flight guard that ignores re-entrant submissions, client-side
//! re-sorting of fetched results, and debounced typeahead suggestions.

use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

use crate::api::{Backend, Suggester, SuggestionField};
use crate::error::{ClausolaError, Result};
use crate::i18n;
use crate::types::SearchResponse;

pub const SUGGESTION_MIN_CHARS: usize = 3;
pub const SUGGESTION_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchCategory {
    #[default]
    Working,
    Jobs,
    Housing,
    Research,
    Internship,
    Scholarships,
    Visas,
    Custom,
}

impl SearchCategory {
    pub const ALL: &'static [SearchCategory] = &[
        SearchCategory::Working,
        SearchCategory::Jobs,
        SearchCategory::Housing,
        SearchCategory::Research,
        SearchCategory::Internship,
        SearchCategory::Scholarships,
        SearchCategory::Visas,
        SearchCategory::Custom,
    ];

    /// Name sent on the wire; the server maps these onto its own identifiers.
    pub fn wire_name(self) -> &'static str {
        match self {
            SearchCategory::Working => "working",
            SearchCategory::Jobs => "jobs",
            SearchCategory::Housing => "housing",
            SearchCategory::Research => "research",
            SearchCategory::Internship => "internship",
            SearchCategory::Scholarships => "scholarships",
            SearchCategory::Visas => "visas",
            SearchCategory::Custom => "custom",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        SearchCategory::ALL
            .iter()
            .copied()
            .find(|category| category.wire_name() == name)
    }

    pub fn is_custom(self) -> bool {
        self == SearchCategory::Custom
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub university: String,
    pub category: SearchCategory,
    /// Only consulted when the category is custom.
    pub keywords: Vec<String>,
    pub language: String,
}

impl SearchQuery {
    /// Local validation; failures never reach the network.
    pub fn validate(&self) -> Result<()> {
        if self.university.trim().is_empty() {
            return Err(ClausolaError::validation(i18n::text(
                &self.language,
                "university_required",
                "University name is required.",
            )));
        }
        if self.category.is_custom() && self.keywords.iter().all(|kw| kw.trim().is_empty()) {
            return Err(ClausolaError::validation(i18n::text(
                &self.language,
                "keywords_required",
                "Please enter keywords for a custom search.",
            )));
        }
        Ok(())
    }

    /// Splits a comma-separated keyword field, dropping empty entries.
    pub fn parse_keywords(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Relevance descending.
    Relevance,
    /// Title lexicographic.
    Title,
}

#[derive(Default)]
pub struct SearchController {
    in_flight: AtomicBool,
    results: Mutex<Option<SearchResponse>>,
}

impl SearchController {
    pub fn new() -> Self {
        SearchController::default()
    }

    /// Submits a search. Returns `Ok(None)` when another submission is already
    /// in flight; the trigger is ignored rather than queued. A successful
    /// response fully replaces the previous result set.
    pub async fn submit<B: Backend + ?Sized>(
        &self,
        backend: &B,
        query: &SearchQuery,
    ) -> Result<Option<SearchResponse>> {
        query.validate()?;

        if self.in_flight.swap(true, AtomicOrdering::SeqCst) {
            debug!("search already in flight, ignoring submission");
            return Ok(None);
        }

        let outcome = backend.student_search(query).await;
        self.in_flight.store(false, AtomicOrdering::SeqCst);

        match outcome {
            Ok(response) => {
                *self.results_guard() = Some(response.clone());
                Ok(Some(response))
            }
            Err(err) => Err(err),
        }
    }

    /// Secondary sort over the already-fetched result set; no network call.
    pub fn sort_results(&self, order: SortOrder) {
        if let Some(response) = self.results_guard().as_mut() {
            match order {
                SortOrder::Relevance => response.results.sort_by(|a, b| {
                    b.relevance_score
                        .partial_cmp(&a.relevance_score)
                        .unwrap_or(Ordering::Equal)
                }),
                SortOrder::Title => response.results.sort_by(|a, b| a.title.cmp(&b.title)),
            }
        }
    }

    pub fn last_results(&self) -> Option<SearchResponse> {
        self.results_guard().clone()
    }

    fn results_guard(&self) -> MutexGuard<'_, Option<SearchResponse>> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cancellable scheduled task: each call cancels the pending one and schedules
/// a new one, so at most one lookup is pending at a time.
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Typeahead for one input field. Keystrokes below the minimum length clear
/// the suggestion list; lookup failures degrade to an empty list and are never
/// surfaced as errors.
pub struct SuggestionBox {
    field: SuggestionField,
    suggester: Arc<dyn Suggester>,
    sender: mpsc::UnboundedSender<Vec<String>>,
    debouncer: Debouncer,
}

impl SuggestionBox {
    pub fn new(
        field: SuggestionField,
        suggester: Arc<dyn Suggester>,
        sender: mpsc::UnboundedSender<Vec<String>>,
    ) -> Self {
        SuggestionBox {
            field,
            suggester,
            sender,
            debouncer: Debouncer::new(SUGGESTION_DEBOUNCE),
        }
    }

    pub fn input(&mut self, text: &str) {
        let prefix = text.trim().to_string();
        if prefix.chars().count() < SUGGESTION_MIN_CHARS {
            self.debouncer.cancel();
            let _ = self.sender.send(Vec::new());
            return;
        }

        let field = self.field;
        let suggester = Arc::clone(&self.suggester);
        let sender = self.sender.clone();
        self.debouncer.schedule(async move {
            let suggestions = suggester
                .suggest(field, &prefix)
                .await
                .unwrap_or_default();
            let _ = sender.send(suggestions);
        });
    }
}
