//! CLI binary for edgequake-pdfbatch.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! wires up pdfium and the caption provider, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfbatch::pipeline::caption::resolve_provider;
use edgequake_pdfbatch::pipeline::discover::discover_folders;
use edgequake_pdfbatch::pipeline::extract::bind_pdfium;
use edgequake_pdfbatch::validate::file_listing;
use edgequake_pdfbatch::{
    validate_configuration, BatchConfig, BatchProgressCallback, FolderOutput, FolderReport,
    ImageHandling, Orchestrator, PageSeparator, PdfiumExtractor, ProgressCallback, RunSummary,
    VlmCaptioner,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over all files in the run, with a log
/// line per folder and per file printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Starts as a spinner; `on_run_start` switches to a bar once the file
    /// count is known.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for PDF folders…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_run_start(&self, folders: usize, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Converting {total_files} PDF file(s) in {folders} folder(s)…"
            ))
        ));
    }

    fn on_folder_start(&self, name: &str, files: usize) {
        self.bar.set_message(name.to_string());
        self.bar
            .println(format!("{} {}  {}", cyan("▸"), bold(name), dim(&format!("{files} file(s)"))));
    }

    fn on_file_complete(&self, name: &str, pages: usize, images: usize) {
        self.bar.println(format!(
            "  {} {:<40}  {}",
            green("✓"),
            name,
            dim(&format!("{pages:>3} pages  {images:>3} images")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, name: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar
            .println(format!("  {} {:<40}  {}", red("✗"), name, red(&msg)));
        self.bar.inc(1);
    }

    fn on_folder_complete(&self, report: &FolderReport) {
        let line = match &report.output {
            FolderOutput::Written { path } => {
                format!("  {} {}", green("→"), path.display())
            }
            FolderOutput::NoSuccessfulDocuments => {
                format!("  {} no output (every file failed)", red("→"))
            }
            FolderOutput::WriteFailed { message } => format!("  {} {}", red("→"), red(message)),
            FolderOutput::Skipped { existing } => format!(
                "  {} skipped, already converted as {}",
                cyan("→"),
                existing.display()
            ),
        };
        self.bar.println(line);
    }
}

impl CliProgressCallback {
    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every folder under ./imports into ./exports
  pdfbatch

  # Custom locations and root-group filename
  pdfbatch -i ~/papers -e ~/papers-md -o loose_papers.md

  # No API key needed: keep images but skip AI captions
  pdfbatch --no-images

  # Text only
  pdfbatch --no-images --omit-images

  # Only convert folders that have no export yet
  pdfbatch --skip-converted

  # Check setup without converting anything
  pdfbatch --validate
  pdfbatch --list-files

  # JSON run summary on stdout
  pdfbatch --json > run.json

LAYOUT:
  imports/loose.pdf            → exports/combined_documents.md
  imports/Q1 Reports/*.pdf     → exports/Q1_Reports_YYYY-MM-DD_HH-MM-SS.md
  (every run)                  → exports/processing_summary_<unix>.md

SUPPORTED CAPTION PROVIDERS:
  Provider     Model                  Vision
  ─────────    ─────────────────────  ──────
  openai       gpt-4.1-nano (default) ✓
  openai       gpt-4.1-mini, gpt-4o   ✓
  anthropic    claude-haiku-4-20250514 ✓
  gemini       gemini-2.0-flash       ✓
  ollama       llava, llama3.2-vision ✓

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. RUST_LOG=edgequake_pdfbatch=debug
"#;

/// Batch-convert folders of PDFs to Markdown with AI image captions.
#[derive(Parser, Debug)]
#[command(
    name = "pdfbatch",
    version,
    about = "Batch-convert folders of PDFs to Markdown with AI image captions",
    long_about = "Convert every folder of PDF documents under an import directory into one \
self-contained Markdown file per folder. Page text is extracted with pdfium; embedded images \
are inlined as base64 and described by a vision LLM (OpenAI, Anthropic, Gemini, Ollama, …).",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing PDF folders and loose PDFs.
    #[arg(short, long, env = "PDFBATCH_IMPORTS", default_value = "imports")]
    imports: PathBuf,

    /// Directory receiving the Markdown outputs and the run summary.
    #[arg(short, long, env = "PDFBATCH_EXPORTS", default_value = "exports")]
    exports: PathBuf,

    /// Output filename for loose PDFs directly under the import directory.
    #[arg(short, long, env = "PDFBATCH_OUTPUT", default_value = "combined_documents.md")]
    output: String,

    /// Do not caption images; embed them without descriptions.
    #[arg(long, env = "PDFBATCH_NO_IMAGES")]
    no_images: bool,

    /// With --no-images: leave images out of the output entirely.
    #[arg(long, env = "PDFBATCH_OMIT_IMAGES", requires = "no_images")]
    omit_images: bool,

    /// Skip folders that already have an export in the export directory.
    #[arg(long, env = "PDFBATCH_SKIP_CONVERTED")]
    skip_converted: bool,

    /// Page marker inside a document: comment, hr, or a custom string.
    #[arg(long, env = "PDFBATCH_SEPARATOR", default_value = "comment")]
    separator: String,

    /// Caption model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-haiku-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Caption provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "Caption provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Retries per image on caption failure.
    #[arg(long, env = "PDFBATCH_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Caption temperature (0.0–2.0).
    #[arg(long, env = "PDFBATCH_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens per caption.
    #[arg(long, env = "PDFBATCH_MAX_TOKENS", default_value_t = 300)]
    max_tokens: usize,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "PDFBATCH_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFBATCH_QUIET")]
    quiet: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFBATCH_VERBOSE")]
    verbose: bool,

    /// Check paths, PDF engine and caption provider, then exit.
    #[arg(long, conflicts_with = "list_files")]
    validate: bool,

    /// List discovered folders and PDF files, then exit.
    #[arg(long)]
    list_files: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let utility_mode = cli.validate || cli.list_files;
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !utility_mode;
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

    // ── Listing mode ─────────────────────────────────────────────────────
    if cli.list_files {
        let folders = discover_folders(&cli.imports)?;
        print!("{}", file_listing(&folders));
        return Ok(ExitCode::SUCCESS);
    }

    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as Arc<dyn BatchProgressCallback>),
    )?;

    // ── Validation mode ──────────────────────────────────────────────────
    if cli.validate {
        return validate(&config, cli.json);
    }

    // ── Collaborators ────────────────────────────────────────────────────
    // Fail fast on a missing engine or provider before touching any folder.
    let extractor = PdfiumExtractor::new().context("PDF engine unavailable")?;
    let mut orchestrator = Orchestrator::new(config.clone(), Box::new(extractor));
    if config.describes_images() {
        let captioner =
            VlmCaptioner::from_config(&config).context("Caption provider unavailable")?;
        tracing::info!(
            "Captioning images with {} ({})",
            captioner.provider_name(),
            captioner.model()
        );
        orchestrator = orchestrator.with_captioner(Box::new(captioner));
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let result = orchestrator.run();
    if let Some(ref cb) = progress {
        cb.finish();
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) if e.is_configuration() => {
            eprintln!("{} {}", red("error:"), e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Batch run failed"),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&summary.to_json())
            .context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary);
    }

    Ok(ExitCode::SUCCESS)
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let image_handling = match (cli.no_images, cli.omit_images) {
        (false, _) => ImageHandling::Describe,
        (true, false) => ImageHandling::EmbedOnly,
        (true, true) => ImageHandling::Omit,
    };

    let mut builder = BatchConfig::builder()
        .imports_dir(&cli.imports)
        .exports_dir(&cli.exports)
        .root_output_name(cli.output.trim())
        .image_handling(image_handling)
        .page_separator(parse_separator(&cli.separator))
        .skip_already_converted(cli.skip_converted)
        .max_retries(cli.max_retries)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.trim().to_lowercase().as_str() {
        "comment" => PageSeparator::Comment,
        "hr" | "---" => PageSeparator::HorizontalRule,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

/// `--validate`: path checks from the library plus engine and provider checks.
fn validate(config: &BatchConfig, json: bool) -> Result<ExitCode> {
    let mut report = validate_configuration(config);

    match bind_pdfium() {
        Ok(_) => report.push_info("PDF engine: pdfium library found"),
        Err(e) => report.push_error(e.to_string()),
    }

    if config.describes_images() {
        match resolve_provider(config) {
            Ok(p) => report.push_info(format!("Caption provider: {} ({})", p.name(), p.model())),
            Err(e) => report.push_error(e.to_string()),
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else {
        print!("{}", report.render());
    }

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(summary: &RunSummary) {
    let failed = summary.total_failed();
    eprintln!(
        "{} {} folder(s) processed, {} output file(s) written",
        if failed == 0 { green("✔") } else { cyan("⚠") },
        bold(&summary.folders_processed().to_string()),
        bold(&summary.output_files_written().to_string()),
    );
    eprintln!(
        "   {} pages  /  {} images  /  {} failed file(s)  in {:.1}s",
        dim(&summary.total_pages().to_string()),
        dim(&summary.total_images().to_string()),
        if failed == 0 {
            dim("0")
        } else {
            red(&failed.to_string())
        },
        summary.elapsed_secs(),
    );
    if let Some(ref path) = summary.summary_path {
        eprintln!("   Summary: {}", bold(&path.display().to_string()));
    }
}
