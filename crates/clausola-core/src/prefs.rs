//! Durable client preferences: UI language, application mode, the signed-in
//! user id, and a snapshot of the last analysis. Everything else (session id,
//! search results) is in-memory only and lost on restart.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::error::Result;
use crate::state::Mode;
use crate::types::{AnalysisResult, SummaryBlock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Preferences {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub last_analysis: Option<AnalysisSnapshot>,
}

/// The durable slice of an analysis: document text, shadow analysis, summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisSnapshot {
    #[serde(default)]
    pub contract_text: String,
    #[serde(default)]
    pub shadow_analysis: String,
    #[serde(default)]
    pub summary: SummaryBlock,
}

impl AnalysisSnapshot {
    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        AnalysisSnapshot {
            contract_text: analysis.document_text.clone(),
            shadow_analysis: analysis.shadow_analysis.clone(),
            summary: analysis.summary.clone(),
        }
    }
}

pub fn preferences_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clausola")
        .join("preferences.json")
}

/// A missing or unreadable file yields defaults; preferences are best-effort.
pub async fn load_preferences(path: &Path) -> Preferences {
    match fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(error = %err, "preferences file is corrupt, starting fresh");
            Preferences::default()
        }),
        Err(_) => Preferences::default(),
    }
}

pub async fn save_preferences(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(prefs)?;
    fs::write(path, json).await?;
    Ok(())
}
