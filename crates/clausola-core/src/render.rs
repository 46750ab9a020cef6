//! Pure transformation of an [`AnalysisResult`] into display sections. No
//! network access, no mutable session state; rendering never fails on missing
//! fields, every access resolves to a placeholder instead.

use crate::i18n;
use crate::types::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreClass {
    Low,
    Neutral,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub key: String,
    pub title: String,
    pub badge: String,
    pub class: ScoreClass,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub document: String,
    pub summary: String,
    pub scores: Vec<ScoreCard>,
    pub shadow: String,
    /// Overall score scaled to a percentage, e.g. "70%".
    pub overall_badge: String,
}

/// A score of 0 (or anything non-finite the server sends) classifies as low.
pub fn classify_score(score: f64) -> ScoreClass {
    if !score.is_finite() || score <= 3.0 {
        ScoreClass::Low
    } else if score >= 8.0 {
        ScoreClass::High
    } else {
        ScoreClass::Neutral
    }
}

pub fn render_report(result: &AnalysisResult, language: &str) -> RenderedReport {
    RenderedReport {
        document: render_document(result, language),
        summary: render_summary(result, language),
        scores: render_score_grid(result, language),
        shadow: render_shadow(result, language),
        overall_badge: overall_badge(result),
    }
}

fn render_document(result: &AnalysisResult, language: &str) -> String {
    let heading = i18n::text(language, "contract_text", "Contract Text");
    format!("{}\n\n{}", heading, result.document_text)
}

fn render_summary(result: &AnalysisResult, language: &str) -> String {
    let summary = &result.summary;
    let mut output = String::new();

    output.push_str(&i18n::text(language, "executive_summary", "Executive Summary"));
    output.push_str("\n\n");
    if summary.executive_summary.trim().is_empty() {
        output.push_str(&i18n::text(language, "no_summary", "No summary available"));
    } else {
        output.push_str(summary.executive_summary.trim());
    }
    output.push_str("\n\n");

    push_list_section(
        &mut output,
        &i18n::text(language, "key_points", "Key Points"),
        &summary.key_points,
        &i18n::text(language, "no_key_points", "No key points available"),
    );
    push_list_section(
        &mut output,
        &i18n::text(language, "potential_issues", "Potential Issues"),
        &summary.potential_issues,
        &i18n::text(language, "no_issues", "No issues identified"),
    );
    push_list_section(
        &mut output,
        &i18n::text(language, "recommendations", "Recommendations"),
        &summary.recommendations,
        &i18n::text(language, "no_recommendations", "No recommendations provided"),
    );

    output.trim_end().to_string()
}

fn push_list_section(output: &mut String, heading: &str, items: &str, placeholder: &str) {
    output.push_str(heading);
    output.push('\n');
    let mut wrote_item = false;
    for item in items.split('\n').map(str::trim).filter(|line| !line.is_empty()) {
        output.push_str(&format!("• {}\n", item));
        wrote_item = true;
    }
    if !wrote_item {
        output.push_str(&format!("• {}\n", placeholder));
    }
    output.push('\n');
}

/// One card per structured-analysis category, skipping the reserved
/// `overall_score` key. The key set is open; labels come from the localization
/// tables with a title-cased fallback.
fn render_score_grid(result: &AnalysisResult, language: &str) -> Vec<ScoreCard> {
    result
        .summary
        .structured_analysis
        .iter()
        .filter(|(key, _)| key.as_str() != "overall_score")
        .map(|(key, category)| ScoreCard {
            key: key.clone(),
            title: i18n::mark_label(language, key),
            badge: format!("{}/10", format_score(category.score)),
            class: classify_score(category.score),
            content: category.content.clone(),
        })
        .collect()
}

fn render_shadow(result: &AnalysisResult, language: &str) -> String {
    if result.shadow_analysis.trim().is_empty() {
        return i18n::text(language, "no_shadow_analysis", "No analysis available");
    }
    format_shadow_content(&result.shadow_analysis)
}

/// Converts the constrained markdown subset the analysis model emits into
/// display text. The passes are fixed and ordered: bold markers, heading
/// markers, bullet markers, then paragraph/line normalization.
pub fn format_shadow_content(content: &str) -> String {
    let without_bold = strip_bold_markers(content);

    let lines: Vec<String> = without_bold
        .lines()
        .map(|line| {
            if let Some(heading) = line.strip_prefix("#### ") {
                heading.trim().to_string()
            } else if let Some(heading) = line.strip_prefix("### ") {
                heading.trim().to_string()
            } else if let Some(item) = line.strip_prefix("* ") {
                format!("• {}", item.trim())
            } else {
                line.trim_end().to_string()
            }
        })
        .collect();

    // collapse runs of blank lines into single paragraph breaks
    let mut output = String::new();
    let mut previous_blank = true;
    for line in lines {
        if line.is_empty() {
            if !previous_blank {
                output.push('\n');
            }
            previous_blank = true;
        } else {
            output.push_str(&line);
            output.push('\n');
            previous_blank = false;
        }
    }
    output.trim().to_string()
}

fn strip_bold_markers(content: &str) -> String {
    let mut output = String::with_capacity(content.len());
    let mut rest = content;
    loop {
        let Some(open) = rest.find("**") else {
            output.push_str(rest);
            break;
        };
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            // unmatched marker stays literal
            output.push_str(rest);
            break;
        };
        output.push_str(&rest[..open]);
        output.push_str(&after_open[..close]);
        rest = &after_open[close + 2..];
    }
    output
}

fn overall_badge(result: &AnalysisResult) -> String {
    let raw = result.evaluation.evaluation.overall_score;
    let score = if raw.is_finite() { raw.clamp(0.0, 10.0) } else { 0.0 };
    format!("{}%", (score * 10.0).round() as i64)
}

fn format_score(score: f64) -> String {
    if !score.is_finite() {
        return "0".to_string();
    }
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{score}")
    }
}

/// Formats a chat reply for display: paragraphs separated by blank lines, and
/// `- ` runs within a paragraph rendered as bullet lists.
pub fn format_chat_message(message: &str) -> String {
    message
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| {
            if paragraph.contains("\n- ") {
                paragraph
                    .split("\n- ")
                    .map(|item| item.trim_start_matches("- ").trim())
                    .filter(|item| !item.is_empty())
                    .map(|item| format!("• {}", item))
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                paragraph.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
