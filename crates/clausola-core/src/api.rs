//! Wire layer for the analysis service. Every endpoint answers a JSON envelope
//! whose `status` field must equal the literal "success"; anything else, or a
//! non-2xx response, is a failure carrying the server's `error` field when one
//! is present. 401/403 map to [`ClausolaError::Unauthorized`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ClausolaError, Result};
use crate::search::SearchQuery;
use crate::types::{
    AnalysisResult, AuthStatus, ExtractResponse, FrequentQuestion, HistoryEntry, SearchResponse,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_ID_HEADER: &str = "X-User-Id";

const UNIVERSITY_LOOKUP_URL: &str = "http://universities.hipolabs.com/search";

/// Everything the controllers need from the server, behind a trait so the
/// orchestration logic is testable without a live service.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn extract_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        language: &str,
    ) -> Result<ExtractResponse>;

    async fn analyze(&self, text: &str, language: &str) -> Result<AnalysisResult>;

    /// Re-expresses the last analysis in a new language; the server keeps the
    /// document, so only the language travels.
    async fn retranslate(&self, language: &str) -> Result<AnalysisResult>;

    /// Returns the new session id.
    async fn chat_start(&self, contract_text: &str, language: &str) -> Result<String>;

    /// Returns the assistant's reply.
    async fn chat_message(&self, session_id: &str, message: &str, language: &str)
    -> Result<String>;

    async fn chat_update_language(&self, session_id: &str, language: &str) -> Result<()>;

    async fn chat_end(&self, session_id: &str) -> Result<()>;

    async fn frequent_questions(&self) -> Result<Vec<FrequentQuestion>>;

    async fn chat_history(&self) -> Result<Vec<HistoryEntry>>;

    async fn student_search(&self, query: &SearchQuery) -> Result<SearchResponse>;

    async fn auth_check(&self) -> Result<AuthStatus>;
}

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    /// The transport default is not relied upon; the timeout is an explicit
    /// configuration point.
    pub timeout: Duration,
    pub user_id: Option<String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        ApiClientConfig {
            base_url: "http://localhost:5000".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_id: None,
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    user_id: Option<String>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(ApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_user(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user_id {
            Some(id) => request.header(USER_ID_HEADER, id),
            None => request,
        }
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        debug!(path, "sending request");
        let response = self
            .with_user(self.http.post(self.url(path)).json(&body))
            .send()
            .await?;
        decode_envelope(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "sending request");
        let response = self.with_user(self.http.get(self.url(path))).send().await?;
        decode_envelope(response).await
    }
}

/// Shared decoding for every enveloped endpoint.
async fn decode_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let value = read_body(response).await?;
    if value.get("status").and_then(Value::as_str) != Some("success") {
        return Err(ClausolaError::api(server_error(&value, "request did not succeed")));
    }
    Ok(serde_json::from_value(value)?)
}

/// The auth-check payload carries no status discriminant.
async fn decode_plain<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let value = read_body(response).await?;
    Ok(serde_json::from_value(value)?)
}

async fn read_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClausolaError::Unauthorized);
    }
    let body = response.text().await?;
    let value: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    if !status.is_success() {
        let fallback = format!("request failed with status {}", status.as_u16());
        return Err(ClausolaError::api(
            value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or(&fallback)
                .to_string(),
        ));
    }
    Ok(value)
}

fn server_error(value: &Value, fallback: &str) -> String {
    value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

#[derive(Deserialize)]
struct ChatStartPayload {
    session_id: String,
}

#[derive(Deserialize)]
struct ChatMessagePayload {
    response: String,
}

#[derive(Deserialize)]
struct FrequentQuestionsPayload {
    #[serde(default)]
    questions: Vec<FrequentQuestion>,
}

#[derive(Deserialize)]
struct ChatHistoryPayload {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[async_trait]
impl Backend for ApiClient {
    async fn extract_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        language: &str,
    ) -> Result<ExtractResponse> {
        debug!(file_name, "sending extract request");
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .part("file", part)
            .text("language", language.to_string());
        let response = self
            .with_user(self.http.post(self.url("/api/document/extract")).multipart(form))
            .send()
            .await?;
        decode_envelope(response).await
    }

    async fn analyze(&self, text: &str, language: &str) -> Result<AnalysisResult> {
        self.post_json("/analyze", json!({ "text": text, "language": language }))
            .await
    }

    async fn retranslate(&self, language: &str) -> Result<AnalysisResult> {
        self.post_json("/retranslate", json!({ "language": language }))
            .await
    }

    async fn chat_start(&self, contract_text: &str, language: &str) -> Result<String> {
        let payload: ChatStartPayload = self
            .post_json(
                "/api/chat/start",
                json!({ "contract_text": contract_text, "language": language }),
            )
            .await?;
        Ok(payload.session_id)
    }

    async fn chat_message(
        &self,
        session_id: &str,
        message: &str,
        language: &str,
    ) -> Result<String> {
        let payload: ChatMessagePayload = self
            .post_json(
                "/api/chat/message",
                json!({ "session_id": session_id, "message": message, "language": language }),
            )
            .await?;
        Ok(payload.response)
    }

    async fn chat_update_language(&self, session_id: &str, language: &str) -> Result<()> {
        let _: Value = self
            .post_json(
                "/api/chat/update_language",
                json!({ "session_id": session_id, "language": language }),
            )
            .await?;
        Ok(())
    }

    async fn chat_end(&self, session_id: &str) -> Result<()> {
        let _: Value = self
            .post_json("/api/chat/end", json!({ "session_id": session_id }))
            .await?;
        Ok(())
    }

    async fn frequent_questions(&self) -> Result<Vec<FrequentQuestion>> {
        let payload: FrequentQuestionsPayload =
            self.get_json("/api/chat/frequent_questions").await?;
        Ok(payload.questions)
    }

    async fn chat_history(&self) -> Result<Vec<HistoryEntry>> {
        let payload: ChatHistoryPayload = self.get_json("/api/chat/history").await?;
        Ok(payload.history)
    }

    async fn student_search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let mut body = json!({
            "university": query.university,
            "category": query.category.wire_name(),
            "language": query.language,
        });
        if query.category.is_custom() {
            body["keywords"] = json!(query.keywords);
        }
        self.post_json("/api/student/search", body).await
    }

    async fn auth_check(&self) -> Result<AuthStatus> {
        debug!("sending auth check");
        let response = self
            .with_user(self.http.get(self.url("/api/auth/check")))
            .send()
            .await?;
        decode_plain(response).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionField {
    University,
    Keyword,
}

/// External lookup collaborator for typeahead suggestions. Failures degrade to
/// an empty list at the call site; they are never user-facing errors.
#[async_trait]
pub trait Suggester: Send + Sync {
    async fn suggest(&self, field: SuggestionField, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Deserialize)]
struct UniversityRecord {
    name: String,
}

const KEYWORD_VOCABULARY: &[&str] = &[
    "admission requirements",
    "dormitory",
    "enrollment deadline",
    "health insurance",
    "housing",
    "internship",
    "part-time work",
    "research assistant",
    "residence permit",
    "scholarship",
    "student visa",
    "tuition fees",
    "work permit",
    "working hours",
];

pub struct HttpSuggester {
    http: reqwest::Client,
    lookup_url: String,
}

impl HttpSuggester {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(HttpSuggester {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            lookup_url: UNIVERSITY_LOOKUP_URL.to_string(),
        })
    }
}

#[async_trait]
impl Suggester for HttpSuggester {
    async fn suggest(&self, field: SuggestionField, prefix: &str) -> Result<Vec<String>> {
        match field {
            SuggestionField::University => {
                let records: Vec<UniversityRecord> = self
                    .http
                    .get(&self.lookup_url)
                    .query(&[("name", prefix)])
                    .send()
                    .await?
                    .json()
                    .await?;
                Ok(records.into_iter().map(|record| record.name).take(10).collect())
            }
            SuggestionField::Keyword => {
                let needle = prefix.to_lowercase();
                Ok(KEYWORD_VOCABULARY
                    .iter()
                    .filter(|keyword| keyword.contains(&needle))
                    .map(|keyword| keyword.to_string())
                    .collect())
            }
        }
    }
}
