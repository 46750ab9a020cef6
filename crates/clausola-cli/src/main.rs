use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use clausola_core::{
    AnalysisSnapshot, ApiClient, ApiClientConfig, AppState, Backend, ChatController,
    HttpSuggester, InputDocument, Mode, NoProgress, Preferences, ProgressReporter, RenderedReport,
    ScoreClass, SearchCategory, SearchController, SearchQuery, SortOrder, Suggester,
    SuggestionBox, SuggestionField, analyze_document, change_language, i18n, load_preferences,
    preferences_path, render::format_chat_message, render_report, save_preferences,
};

/// CLI wrapper for SearchCategory (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliCategory {
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

impl From<CliCategory> for SearchCategory {
    fn from(cli: CliCategory) -> Self {
        match cli {
            CliCategory::Working => SearchCategory::Working,
            CliCategory::Jobs => SearchCategory::Jobs,
            CliCategory::Housing => SearchCategory::Housing,
            CliCategory::Research => SearchCategory::Research,
            CliCategory::Internship => SearchCategory::Internship,
            CliCategory::Scholarships => SearchCategory::Scholarships,
            CliCategory::Visas => SearchCategory::Visas,
            CliCategory::Custom => SearchCategory::Custom,
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum CliSort {
    #[default]
    Relevance,
    Title,
}

impl From<CliSort> for SortOrder {
    fn from(cli: CliSort) -> Self {
        match cli {
            CliSort::Relevance => SortOrder::Relevance,
            CliSort::Title => SortOrder::Title,
        }
    }
}

#[derive(Parser)]
#[command(name = "clausola")]
#[command(about = "Analyze employment contracts, chat about them, and search university regulations")]
struct Cli {
    /// Analysis service base URL
    #[arg(long, default_value = "http://localhost:5000")]
    server: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Display language (e.g. "en", "it"). Defaults to the saved preference.
    #[arg(short, long)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a contract, run the analysis pipeline, then chat about it
    Analyze {
        /// Contract file to analyze
        file: PathBuf,
    },
    /// Search university regulation pages (student mode)
    Search {
        /// University name; prompted for with suggestions when omitted
        university: Option<String>,
        #[arg(short, long, value_enum, default_value_t = CliCategory::Working)]
        category: CliCategory,
        /// Comma-separated keywords (required with --category custom)
        #[arg(short, long)]
        keywords: Option<String>,
        #[arg(long, value_enum, default_value_t = CliSort::Relevance)]
        sort: CliSort,
    },
    /// Show your most frequently asked questions
    Questions,
    /// Show your past chat history
    History,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// indicatif-backed view of the pipeline's 4-step progress model.
struct StepProgress {
    bar: ProgressBar,
}

impl StepProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(clausola_core::pipeline::PROGRESS_TOTAL as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:30.cyan} {pos}/{len} {msg}")
                .unwrap(),
        );
        StepProgress { bar }
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for StepProgress {
    fn report(&self, step: u8, total: u8, message: &str, _busy: bool) {
        self.bar.set_length(total as u64);
        self.bar.set_position(step as u64);
        self.bar.set_message(message.to_string());
    }
}

/// The shared error surface: one styled line on stderr.
fn show_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

async fn handle_auth_failure(prefs: &mut Preferences, prefs_path: &Path) {
    prefs.user_id = None;
    if let Err(err) = save_preferences(prefs_path, prefs).await {
        tracing::warn!(error = %err, "failed to persist preferences");
    }
    eprintln!(
        "{} your session is no longer valid, please sign in again",
        style("Sign in required:").red().bold()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let prefs_path = preferences_path();
    let mut prefs = load_preferences(&prefs_path).await;
    let language = cli
        .lang
        .clone()
        .or_else(|| prefs.language.clone())
        .unwrap_or_else(|| "en".to_string());
    prefs.language = Some(language.clone());

    let client = ApiClient::new(ApiClientConfig {
        base_url: cli.server.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        user_id: prefs.user_id.clone(),
    })?;

    match cli.command {
        Command::Analyze { file } => {
            run_analyze(&client, &file, &language, &mut prefs, &prefs_path).await?;
        }
        Command::Search {
            university,
            category,
            keywords,
            sort,
        } => {
            let timeout = Duration::from_secs(cli.timeout_secs);
            run_search(
                &client,
                university,
                category.into(),
                keywords,
                sort.into(),
                &language,
                timeout,
                &mut prefs,
                &prefs_path,
            )
            .await?;
        }
        Command::Questions => {
            run_questions(&client, &mut prefs, &prefs_path).await?;
        }
        Command::History => {
            run_history(&client, &mut prefs, &prefs_path).await?;
        }
    }

    Ok(())
}

async fn run_analyze(
    client: &ApiClient,
    file: &Path,
    language: &str,
    prefs: &mut Preferences,
    prefs_path: &Path,
) -> Result<()> {
    prefs.mode = Some(Mode::Contract);
    let mut state = AppState::from_preferences(prefs);
    state.language = language.to_string();
    let mut chat = ChatController::new();

    println!(
        "\n{}  {}\n",
        style("clausola").cyan().bold(),
        style("Contract Analyzer").dim()
    );

    let document = match fs::read(file).await {
        Ok(bytes) => Some(InputDocument {
            file_name: file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string()),
            bytes,
        }),
        Err(_) => None,
    };

    let progress = StepProgress::new();
    let report = match analyze_document(client, &mut state, &mut chat, document, language, &progress)
        .await
    {
        Ok(report) => {
            progress.clear();
            report
        }
        Err(err) => {
            progress.clear();
            if err.is_auth() {
                handle_auth_failure(prefs, prefs_path).await;
            } else {
                show_error(&err.to_string());
            }
            std::process::exit(1);
        }
    };

    println!(
        "{} {}",
        style("✓").green().bold(),
        i18n::text(language, "analysis_complete", "Analysis complete")
    );

    if let Some(analysis) = &state.last_analysis {
        print_report(&render_report(analysis, language));
        prefs.last_analysis = Some(AnalysisSnapshot::from_analysis(analysis));
        save_preferences(prefs_path, prefs).await?;
    }

    if let Some(chat_error) = report.chat_error {
        show_error(&format!(
            "{}: {}",
            i18n::text(language, "chat_init_error", "Chat initialization failed"),
            chat_error
        ));
    }

    chat_loop(client, &mut state, &mut chat, prefs, prefs_path).await
}

async fn chat_loop(
    client: &ApiClient,
    state: &mut AppState,
    chat: &mut ChatController,
    prefs: &mut Preferences,
    prefs_path: &Path,
) -> Result<()> {
    if !chat.input_enabled() {
        return Ok(());
    }

    println!(
        "\n{}\n",
        style("Ask about the contract. /lang <code> switches language, /quit exits.").dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style(">").cyan().bold());
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim().to_string();
        if input == "/quit" {
            break;
        }

        if let Some(code) = input.strip_prefix("/lang ") {
            let code = code.trim();
            let spinner = create_spinner(&i18n::text(code, "translating", "Translating analysis..."));
            match change_language(client, state, chat, code, &NoProgress).await {
                Ok(()) => {
                    spinner.finish_and_clear();
                    prefs.language = Some(code.to_string());
                    if let Some(analysis) = &state.last_analysis {
                        print_report(&render_report(analysis, code));
                        prefs.last_analysis = Some(AnalysisSnapshot::from_analysis(analysis));
                    }
                    save_preferences(prefs_path, prefs).await?;
                }
                Err(err) => {
                    spinner.finish_and_clear();
                    show_error(&format!(
                        "{}: {}",
                        i18n::text(code, "retranslation_error", "Translation error"),
                        err
                    ));
                    // rollback already happened; show the previous result again
                    if let Some(analysis) = &state.last_analysis {
                        print_report(&render_report(analysis, &state.language));
                    }
                }
            }
            continue;
        }

        let spinner = create_spinner("…");
        match chat.send_message(client, &input, &state.language).await {
            Ok(Some(reply)) => {
                spinner.finish_and_clear();
                println!("\n{}\n", format_chat_message(&reply));
            }
            Ok(None) => {
                spinner.finish_and_clear();
            }
            Err(err) => {
                spinner.finish_and_clear();
                if err.is_auth() {
                    handle_auth_failure(prefs, prefs_path).await;
                    break;
                }
                // the transcript carries a locally rendered error entry
                if let Some(message) = chat.last_message() {
                    println!("\n{}\n", style(&message.text).red());
                } else {
                    show_error(&err.user_message(&state.language));
                }
            }
        }
    }

    // the terminal analog of page-unload teardown
    chat.end(client).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_search(
    client: &ApiClient,
    university: Option<String>,
    category: SearchCategory,
    keywords: Option<String>,
    sort: SortOrder,
    language: &str,
    timeout: Duration,
    prefs: &mut Preferences,
    prefs_path: &Path,
) -> Result<()> {
    prefs.mode = Some(Mode::Student);
    save_preferences(prefs_path, prefs).await?;

    let suggester: Arc<dyn Suggester> = Arc::new(HttpSuggester::new(timeout)?);

    let university = match university {
        Some(name) => name,
        None => {
            prompt_with_suggestions(
                SuggestionField::University,
                Arc::clone(&suggester),
                "University name",
            )
            .await?
        }
    };

    let keywords = match keywords {
        Some(raw) => SearchQuery::parse_keywords(&raw),
        None if category.is_custom() => {
            let raw = prompt_with_suggestions(
                SuggestionField::Keyword,
                Arc::clone(&suggester),
                "Keywords (comma-separated)",
            )
            .await?;
            SearchQuery::parse_keywords(&raw)
        }
        None => Vec::new(),
    };

    let query = SearchQuery {
        university,
        category,
        keywords,
        language: language.to_string(),
    };

    let controller = SearchController::new();
    let spinner = create_spinner("Searching...");
    match controller.submit(client, &query).await {
        Ok(Some(_)) => {
            spinner.finish_and_clear();
            controller.sort_results(sort);
            if let Some(results) = controller.last_results() {
                print_search_results(&results, language);
            }
            Ok(())
        }
        Ok(None) => {
            spinner.finish_and_clear();
            Ok(())
        }
        Err(err) => {
            spinner.finish_and_clear();
            if err.is_auth() {
                handle_auth_failure(prefs, prefs_path).await;
            } else {
                show_error(&format!(
                    "{}: {}",
                    i18n::text(language, "no_results", "Search failed"),
                    err
                ));
            }
            std::process::exit(1);
        }
    }
}

/// One-line prompt backed by the debounced suggestion lookup: the typed text
/// is offered back with numbered suggestions; a number picks one, anything
/// else is taken literally.
async fn prompt_with_suggestions(
    field: SuggestionField,
    suggester: Arc<dyn Suggester>,
    prompt: &str,
) -> Result<String> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut suggestions_box = SuggestionBox::new(field, suggester, tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} {}: ", style("?").cyan().bold(), prompt);
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            anyhow::bail!("stdin closed");
        };
        let typed = line.trim().to_string();
        if typed.is_empty() {
            continue;
        }

        suggestions_box.input(&typed);
        let suggestions = rx.recv().await.unwrap_or_default();
        if suggestions.is_empty() {
            return Ok(typed);
        }

        for (index, suggestion) in suggestions.iter().enumerate() {
            println!("  {} {}", style(format!("{}.", index + 1)).dim(), suggestion);
        }
        print!("{} pick a number or press Enter to keep \"{typed}\": ", style("?").cyan().bold());
        std::io::stdout().flush()?;
        let Some(choice) = lines.next_line().await? else {
            return Ok(typed);
        };
        let choice = choice.trim();
        if choice.is_empty() {
            return Ok(typed);
        }
        if let Ok(number) = choice.parse::<usize>() {
            if number >= 1 && number <= suggestions.len() {
                return Ok(suggestions[number - 1].clone());
            }
        }
        return Ok(choice.to_string());
    }
}

async fn run_questions(
    client: &ApiClient,
    prefs: &mut Preferences,
    prefs_path: &Path,
) -> Result<()> {
    if !ensure_signed_in(client, prefs, prefs_path).await? {
        std::process::exit(1);
    }
    match client.frequent_questions().await {
        Ok(questions) if questions.is_empty() => {
            println!("{}", style("No frequent questions yet.").dim());
            Ok(())
        }
        Ok(questions) => {
            println!("\n{}\n", style("Frequent Questions").cyan().bold());
            for question in questions {
                println!(
                    "{} {} {}",
                    style("•").cyan(),
                    question.question,
                    style(format!("(asked {} times)", question.count)).dim()
                );
                if !question.response.is_empty() {
                    println!("  {}", style(&question.response).dim());
                }
            }
            Ok(())
        }
        Err(err) => {
            if err.is_auth() {
                handle_auth_failure(prefs, prefs_path).await;
            } else {
                show_error(&err.to_string());
            }
            std::process::exit(1);
        }
    }
}

async fn run_history(client: &ApiClient, prefs: &mut Preferences, prefs_path: &Path) -> Result<()> {
    if !ensure_signed_in(client, prefs, prefs_path).await? {
        std::process::exit(1);
    }
    match client.chat_history().await {
        Ok(history) if history.is_empty() => {
            println!("{}", style("No chat history yet.").dim());
            Ok(())
        }
        Ok(history) => {
            println!("\n{}\n", style("Chat History").cyan().bold());
            for entry in history {
                println!(
                    "{} {} {}",
                    style("•").cyan(),
                    entry.question,
                    style(&entry.asked_at).dim()
                );
                if !entry.response.is_empty() {
                    println!("  {}", entry.response);
                }
            }
            Ok(())
        }
        Err(err) => {
            if err.is_auth() {
                handle_auth_failure(prefs, prefs_path).await;
            } else {
                show_error(&err.to_string());
            }
            std::process::exit(1);
        }
    }
}

async fn ensure_signed_in(
    client: &ApiClient,
    prefs: &mut Preferences,
    prefs_path: &Path,
) -> Result<bool> {
    match client.auth_check().await {
        Ok(status) if status.authenticated => {
            if status.user_id.is_some() && status.user_id != prefs.user_id {
                prefs.user_id = status.user_id;
                save_preferences(prefs_path, prefs).await?;
            }
            Ok(true)
        }
        Ok(_) => {
            handle_auth_failure(prefs, prefs_path).await;
            Ok(false)
        }
        Err(err) => {
            if err.is_auth() {
                handle_auth_failure(prefs, prefs_path).await;
                Ok(false)
            } else {
                show_error(&err.to_string());
                Ok(false)
            }
        }
    }
}

fn print_report(report: &RenderedReport) {
    let divider = style("─".repeat(60)).dim().to_string();

    println!("\n{divider}");
    println!("\n{}\n", report.document.trim_end());
    println!("{divider}");
    println!("\n{}\n", report.summary);

    if !report.scores.is_empty() {
        println!("{divider}");
        println!();
        for card in &report.scores {
            let badge = match card.class {
                ScoreClass::Low => style(card.badge.clone()).red().bold(),
                ScoreClass::High => style(card.badge.clone()).green().bold(),
                ScoreClass::Neutral => style(card.badge.clone()).yellow(),
            };
            println!("{}  {}", style(&card.title).bold(), badge);
            if !card.content.is_empty() {
                println!("  {}", card.content);
            }
        }
        println!();
    }

    println!("{divider}");
    println!(
        "\n{} {}\n",
        style("Overall Score:").bold(),
        style(&report.overall_badge).cyan().bold()
    );
    println!("{divider}");
    println!("\n{}\n", style("Shadow Analysis").bold());
    println!("{}\n", report.shadow);
}

fn print_search_results(results: &clausola_core::SearchResponse, language: &str) {
    println!(
        "\n{}\n",
        style(i18n::text(language, "search_results", "Search Results"))
            .cyan()
            .bold()
    );
    println!(
        "{} {} — {} results\n",
        i18n::text(language, "results_for", "Results for"),
        style(&results.university).bold(),
        results.total_results.max(results.summary.total_results)
    );

    for result in &results.results {
        println!("{}", style(&result.title).bold());
        if !result.url.is_empty() {
            println!("  {}", style(&result.url).cyan().underlined());
        }
        if !result.content_summary.is_empty() {
            println!("  {}", result.content_summary);
        }
        let mut meta = Vec::new();
        if !result.matched_keywords.is_empty() {
            meta.push(result.matched_keywords.join(", "));
        }
        meta.push(format!(
            "{}: {:.2}",
            i18n::text(language, "relevance_score", "Relevance"),
            result.relevance_score
        ));
        println!("  {}\n", style(meta.join(" | ")).dim());
    }
}
