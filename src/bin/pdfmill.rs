//! CLI binary for pdfmill.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, runs a batch conversion over a directory, and prints
//! per-document results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfmill::{
    convert_dir, ConversionConfig, ConversionProgressCallback, PageKind, PageSeparator,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Truncate a message to at most `max` characters, never mid-character.
/// Provider error text routinely carries non-ASCII, so byte slicing is not
/// safe here.
fn truncate_message(message: &str, max: usize) -> String {
    if message.chars().count() <= max {
        return message.to_string();
    }
    let cut: String = message.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}\u{2026}")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-page log
/// lines using [indicatif]. The bar is resized per document as each PDF's
/// page count becomes known.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Wall-clock start time of the page currently in flight.
    page_start: Mutex<Option<Instant>>,
    /// Count of pages that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_document_start` (called once per document, before any pages).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_document_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_start: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once the page count is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_position(0);
        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.page_start
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize, kind: PageKind) {
        *self.page_start.lock().unwrap() = Some(Instant::now());
        let label = match kind {
            PageKind::Text => "text",
            PageKind::Mixed => "vision",
        };
        self.bar.set_message(format!("page {page_num} ({label})"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, markdown_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = truncate_message(error, 80);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_cleanup_start(&self, chunks: usize) {
        self.bar.set_prefix("Cleaning up");
        if chunks > 1 {
            self.bar.set_message(format!("{chunks} chunks"));
        } else {
            self.bar.set_message("formatting pass");
        }
    }

    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages converted  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in ./data (output lands next to each file)
  pdfmill

  # Convert a specific directory into a separate output directory
  pdfmill ~/papers --output-dir ~/papers/markdown

  # Cheaper models, stricter text classification
  pdfmill data --vision-model gpt-4o-mini --threshold 0.95

  # Use a specific provider
  pdfmill data --provider anthropic --vision-model claude-sonnet-4-20250514

  # Machine-readable run summary
  pdfmill data --json > run.json

HOW PAGES ARE HANDLED:
  Each page is classified by the share of its area covered by extractable
  text glyphs. At or above the threshold (default 0.9) the text is taken
  verbatim — no model call, no cost. Below it, the page is rendered to an
  image and transcribed by the vision model (tables, diagrams, figures).
  The assembled document then gets one LLM cleanup pass.

  Existing .md files are never overwritten: a numeric suffix is appended
  ("report.md", "report 2.md", …), so re-running is always safe.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY            OpenAI API key
  ANTHROPIC_API_KEY         Anthropic API key
  PDFIUM_DYNAMIC_LIB_PATH   Path to a libpdfium build, if not bundled

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Convert:         pdfmill ./data
"#;

/// Convert a directory of PDF files to Markdown using vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfmill",
    version,
    about = "Convert a directory of PDF files to Markdown using vision LLMs",
    long_about = "Convert every PDF in a directory to clean, well-structured Markdown. \
Text-dominant pages are extracted directly (free, lossless); image-heavy pages are \
interpreted by a vision language model. Supports OpenAI, Anthropic, and any provider \
the environment is configured for.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the PDFs to convert.
    #[arg(default_value = "data")]
    input_dir: PathBuf,

    /// Write Markdown files here instead of next to each PDF.
    #[arg(short, long, env = "PDFMILL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Vision model for image-heavy pages.
    #[arg(long, env = "PDFMILL_VISION_MODEL", default_value = "gpt-4o")]
    vision_model: String,

    /// Model for the final cleanup pass (plain text, so a cheap one works).
    #[arg(long, env = "PDFMILL_CLEANUP_MODEL", default_value = "gpt-4o-mini")]
    cleanup_model: String,

    /// LLM provider: openai, anthropic, ollama, …
    /// Auto-detected from API key env vars if not set.
    #[arg(long, env = "PDFMILL_PROVIDER")]
    provider: Option<String>,

    /// Text-coverage ratio at or above which a page is extracted directly
    /// (0.0–1.0).
    #[arg(long, env = "PDFMILL_THRESHOLD", default_value_t = 0.9)]
    threshold: f32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFMILL_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "PDFMILL_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Retries per LLM call on failure.
    #[arg(long, env = "PDFMILL_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDFMILL_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Page separator: none, hr, comment, or a custom string.
    #[arg(long, env = "PDFMILL_SEPARATOR", default_value = "none")]
    separator: String,

    /// Output a structured JSON run summary instead of log lines.
    #[arg(long, env = "PDFMILL_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFMILL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFMILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFMILL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run batch conversion ─────────────────────────────────────────────
    let summary = convert_dir(&cli.input_dir, cli.output_dir.as_deref(), &config)
        .await
        .context("Batch conversion failed")?;

    if cli.json {
        println!("{}", render_json_summary(&summary)?);
    } else if !cli.quiet {
        for outcome in &summary.outcomes {
            match (&outcome.output_path, &outcome.error) {
                (Some(out), None) => {
                    let stats = outcome.stats.as_ref();
                    eprintln!(
                        "{}  {}  →  {}  {}",
                        green("✔"),
                        outcome.pdf_path.display(),
                        bold(&out.display().to_string()),
                        dim(&stats
                            .map(|s| format!(
                                "({} pages: {} direct, {} vision, {} failed, {}ms)",
                                s.total_pages,
                                s.direct_pages,
                                s.vision_pages,
                                s.failed_pages,
                                s.total_duration_ms
                            ))
                            .unwrap_or_default()),
                    );
                }
                (_, Some(e)) => {
                    eprintln!("{}  {}  {}", red("✘"), outcome.pdf_path.display(), red(&e.to_string()));
                }
                _ => {}
            }
        }
        eprintln!(
            "{} {} converted, {} failed",
            if summary.failed() == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&summary.converted().to_string()),
            summary.failed(),
        );
    }

    // A run that found PDFs but converted none of them is a failure.
    if !summary.outcomes.is_empty() && summary.converted() == 0 {
        anyhow::bail!("No documents were converted");
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .vision_model(&cli.vision_model)
        .cleanup_model(&cli.cleanup_model)
        .image_area_threshold(cli.threshold)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .page_separator(parse_separator(&cli.separator));

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        custom => PageSeparator::Custom(custom.to_string()),
    }
}

/// Serialise the run summary for `--json`.
fn render_json_summary(summary: &pdfmill::RunSummary) -> Result<String> {
    let documents: Vec<serde_json::Value> = summary
        .outcomes
        .iter()
        .map(|o| {
            serde_json::json!({
                "input": o.pdf_path,
                "output": o.output_path,
                "stats": o.stats.as_ref().map(|s| serde_json::json!({
                    "total_pages": s.total_pages,
                    "direct_pages": s.direct_pages,
                    "vision_pages": s.vision_pages,
                    "failed_pages": s.failed_pages,
                    "cleanup_chunks": s.cleanup_chunks,
                    "total_input_tokens": s.total_input_tokens,
                    "total_output_tokens": s.total_output_tokens,
                    "total_duration_ms": s.total_duration_ms,
                })),
                "error": o.error.as_ref().map(|e| e.to_string()),
            })
        })
        .collect();

    serde_json::to_string_pretty(&serde_json::json!({
        "converted": summary.converted(),
        "failed": summary.failed(),
        "documents": documents,
    }))
    .context("Failed to serialise run summary")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_passes_through_untruncated() {
        assert_eq!(truncate_message("rate limited", 80), "rate limited");
    }

    #[test]
    fn truncation_respects_character_boundaries() {
        // Byte 79 falls inside the two-byte 'é'; a byte slice would panic.
        let msg = format!("{}é — délai d'attente dépassé après trois tentatives", "x".repeat(78));
        assert!(msg.len() > 80);
        let out = truncate_message(&msg, 80);
        assert!(out.chars().count() <= 80);
        assert!(out.ends_with('\u{2026}'));
    }

    #[test]
    fn multibyte_error_does_not_panic_page_error_callback() {
        let cb = CliProgressCallback::new_dynamic();
        let msg = format!("{}é {}", "x".repeat(78), "suffix padding to exceed the limit");
        cb.on_page_error(1, 3, &msg);
        cb.bar.finish_and_clear();
    }

    #[test]
    fn separator_parsing() {
        assert!(matches!(parse_separator("none"), PageSeparator::None));
        assert!(matches!(parse_separator("HR"), PageSeparator::HorizontalRule));
        assert!(matches!(parse_separator("---"), PageSeparator::HorizontalRule));
        assert!(matches!(parse_separator("comment"), PageSeparator::Comment));
        assert!(matches!(parse_separator("***"), PageSeparator::Custom(_)));
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["pdfmill"]);
        assert_eq!(cli.input_dir, PathBuf::from("data"));
        assert!(cli.output_dir.is_none());
        assert_eq!(cli.vision_model, "gpt-4o");
        assert_eq!(cli.threshold, 0.9);
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "pdfmill",
            "papers",
            "--output-dir",
            "out",
            "--threshold",
            "0.95",
            "--provider",
            "anthropic",
        ]);
        assert_eq!(cli.input_dir, PathBuf::from("papers"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.threshold, 0.95);
        assert_eq!(cli.provider.as_deref(), Some("anthropic"));
    }
}
