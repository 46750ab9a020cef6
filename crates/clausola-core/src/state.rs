use serde::{Deserialize, Serialize};

use crate::prefs::Preferences;
use crate::types::AnalysisResult;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Contract,
    Student,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Contract => "contract",
            Mode::Student => "student",
        }
    }
}

/// Process-wide session state. Initialized at startup from persisted
/// preferences; each field is mutated only by the controller that owns the
/// corresponding operation and read by the renderer.
#[derive(Debug)]
pub struct AppState {
    pub language: String,
    pub mode: Mode,
    /// Last successful analysis. Replaced wholesale on retranslation.
    pub last_analysis: Option<AnalysisResult>,
    /// Whether the results view currently reflects `last_analysis`. Hidden at
    /// the start of every upload attempt so a failed run never shows stale
    /// output.
    pub results_visible: bool,
    /// Set while a retranslation is in flight; blocks a second language change.
    pub language_locked: bool,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            language: DEFAULT_LANGUAGE.to_string(),
            mode: Mode::default(),
            last_analysis: None,
            results_visible: false,
            language_locked: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        AppState::default()
    }

    pub fn from_preferences(prefs: &Preferences) -> Self {
        AppState {
            language: prefs
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            mode: prefs.mode.unwrap_or_default(),
            ..AppState::default()
        }
    }

    pub fn set_analysis(&mut self, result: AnalysisResult) {
        self.last_analysis = Some(result);
        self.results_visible = true;
    }

    pub fn hide_results(&mut self) {
        self.results_visible = false;
    }
}
