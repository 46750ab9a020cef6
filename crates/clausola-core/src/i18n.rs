//! Maps a language code and a string key to display text. Unknown keys fall
//! back to English, then to the caller-supplied literal; score-category labels
//! fall back to a title-cased form of the key itself, since the category key
//! set is server-defined and open.

const EN: &[(&str, &str)] = &[
    ("no_file_selected", "Please select a file."),
    ("extracting_text", "Extracting text..."),
    ("analyzing_contract", "Analyzing contract..."),
    ("performing_analysis", "Processing..."),
    ("analysis_complete", "Analysis complete"),
    ("translating", "Translating analysis..."),
    ("translation_complete", "Translation complete"),
    ("retranslation_error", "Translation error"),
    ("chat_language_error", "Chat language error"),
    ("chat_init_error", "Chat initialization failed"),
    ("chat_error", "Error"),
    ("no_chat_session", "No active chat session. Please analyze a contract."),
    ("error_occurred", "Error"),
    ("contract_text", "Contract Text"),
    ("executive_summary", "Executive Summary"),
    ("key_points", "Key Points"),
    ("potential_issues", "Potential Issues"),
    ("recommendations", "Recommendations"),
    ("no_summary", "No summary available"),
    ("no_key_points", "No key points available"),
    ("no_issues", "No issues identified"),
    ("no_recommendations", "No recommendations provided"),
    ("no_shadow_analysis", "No analysis available"),
    ("overall_score", "Overall Score"),
    ("analysis_accuracy", "Analysis Accuracy"),
    ("search_results", "Search Results"),
    ("results_for", "Results for"),
    ("found_results", "Found {} relevant results"),
    ("relevance_score", "Relevance"),
    ("no_results", "Search failed"),
    ("university_required", "University name is required."),
    ("keywords_required", "Please enter keywords for a custom search."),
];

const IT: &[(&str, &str)] = &[
    ("no_file_selected", "Seleziona un file."),
    ("extracting_text", "Estrazione del testo..."),
    ("analyzing_contract", "Analisi del contratto..."),
    ("performing_analysis", "Elaborazione..."),
    ("analysis_complete", "Analisi completata"),
    ("translating", "Traduzione dell'analisi..."),
    ("translation_complete", "Traduzione completata"),
    ("retranslation_error", "Errore di traduzione"),
    ("chat_language_error", "Errore lingua chat"),
    ("chat_init_error", "Inizializzazione chat non riuscita"),
    ("chat_error", "Errore"),
    ("no_chat_session", "Nessuna sessione di chat attiva. Analizza prima un contratto."),
    ("error_occurred", "Errore"),
    ("contract_text", "Testo del contratto"),
    ("executive_summary", "Sintesi"),
    ("key_points", "Punti chiave"),
    ("potential_issues", "Possibili criticità"),
    ("recommendations", "Raccomandazioni"),
    ("no_summary", "Nessuna sintesi disponibile"),
    ("no_key_points", "Nessun punto chiave disponibile"),
    ("no_issues", "Nessuna criticità individuata"),
    ("no_recommendations", "Nessuna raccomandazione fornita"),
    ("no_shadow_analysis", "Nessuna analisi disponibile"),
    ("overall_score", "Punteggio complessivo"),
    ("analysis_accuracy", "Accuratezza dell'analisi"),
    ("search_results", "Risultati della ricerca"),
    ("results_for", "Risultati per"),
    ("found_results", "Trovati {} risultati rilevanti"),
    ("relevance_score", "Rilevanza"),
    ("no_results", "Ricerca non riuscita"),
    ("university_required", "Il nome dell'università è obbligatorio."),
    ("keywords_required", "Inserisci le parole chiave per una ricerca personalizzata."),
];

const EN_MARKS: &[(&str, &str)] = &[
    ("clarity", "Clarity"),
    ("fairness", "Fairness"),
    ("compliance", "Compliance"),
    ("completeness", "Completeness"),
    ("risk_level", "Risk Level"),
];

const IT_MARKS: &[(&str, &str)] = &[
    ("clarity", "Chiarezza"),
    ("fairness", "Equità"),
    ("compliance", "Conformità"),
    ("completeness", "Completezza"),
    ("risk_level", "Livello di rischio"),
];

fn table(language: &str) -> &'static [(&'static str, &'static str)] {
    match language {
        "it" => IT,
        _ => EN,
    }
}

fn marks_table(language: &str) -> &'static [(&'static str, &'static str)] {
    match language {
        "it" => IT_MARKS,
        _ => EN_MARKS,
    }
}

fn find(entries: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    entries
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
}

pub fn resolve(language: &str, key: &str) -> Option<&'static str> {
    find(table(language), key).or_else(|| find(EN, key))
}

/// Resolve a UI string, falling back to the supplied English literal.
pub fn text(language: &str, key: &str, fallback: &str) -> String {
    resolve(language, key).unwrap_or(fallback).to_string()
}

/// Label for a score-category key: translation when one exists, otherwise a
/// title-cased form of the key.
pub fn mark_label(language: &str, key: &str) -> String {
    find(marks_table(language), key)
        .map(str::to_string)
        .unwrap_or_else(|| title_case(key))
}

pub fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_translation() {
        assert_eq!(
            text("it", "analysis_complete", "Analysis complete"),
            "Analisi completata"
        );
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        assert_eq!(
            text("de", "analysis_complete", "fallback"),
            "Analysis complete"
        );
    }

    #[test]
    fn unknown_key_falls_back_to_literal() {
        assert_eq!(text("en", "not_a_key", "literal fallback"), "literal fallback");
    }

    #[test]
    fn mark_label_title_cases_unknown_keys() {
        assert_eq!(mark_label("en", "termination_terms"), "Termination Terms");
        assert_eq!(mark_label("it", "clarity"), "Chiarezza");
    }

    #[test]
    fn title_case_handles_edge_shapes() {
        assert_eq!(title_case("clarity"), "Clarity");
        assert_eq!(title_case("a__b"), "A B");
        assert_eq!(title_case(""), "");
    }
}
