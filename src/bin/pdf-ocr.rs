//! CLI binary for pdf-ocr.
//!
//! Two subcommands over the library crate: `serve` runs the HTTP service,
//! `extract` runs one local PDF through the same orchestrator and prints
//! the text.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_ocr::server::{self, DEFAULT_MAX_UPLOAD_BYTES};
use pdf_ocr::{
    ExtractionConfig, ExtractionOutput, ExtractionProgressCallback, ExtractionResponse,
    Extractor, OcrError, PdfiumRasterizer, ProgressCallback, TesseractCli,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::info;
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

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the PDF is rasterised, then a
/// page bar with one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_rasterize_start(&self) {
        self.bar.set_prefix("Rendering");
        self.bar.set_message("rasterising pages…");
    }

    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognising {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognised  ({} failed)",
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
  # Run the HTTP service on port 3000
  pdf-ocr serve --port 3000

  # Extract a local PDF to stdout
  pdf-ocr extract scan.pdf

  # Hindi + English, written to a file
  pdf-ocr extract --language eng+hin scan.pdf -o scan.txt

  # Same JSON the HTTP endpoint returns
  pdf-ocr extract --json scan.pdf

  # Upload to a running service
  curl -F file=@scan.pdf -F language=eng http://localhost:3000/api/extract-text

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Directory containing libpdfium (else system library path)
  TESSERACT_CMD           tesseract executable (else `tesseract` on PATH)
  PDF_OCR_HOST            serve: bind address
  PDF_OCR_PORT            serve: port
  PDF_OCR_MAX_UPLOAD_MB   serve: request body cap in MiB
  PDF_OCR_MAX_PAGES       page cap per document
  PDF_OCR_PAGE_TIMEOUT    per-page OCR budget in seconds
  PDF_OCR_CONCURRENCY     pages recognised at once
  PDF_OCR_SCRATCH_DIR     parent directory for per-request scratch dirs
  RUST_LOG                tracing filter (overrides -v / -q)
"#;

/// Extract text from PDFs with pdfium + tesseract.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-ocr",
    version,
    about = "Extract text from PDF files by rasterising pages and running OCR",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_OCR_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Extract text from a local PDF.
    Extract(ExtractArgs),
}

/// Settings shared by both subcommands.
#[derive(Args, Debug)]
struct EngineArgs {
    /// Largest page count accepted per document.
    #[arg(long, env = "PDF_OCR_MAX_PAGES", default_value_t = 200)]
    max_pages: usize,

    /// Per-page OCR budget in seconds.
    #[arg(long, env = "PDF_OCR_PAGE_TIMEOUT", default_value_t = 120)]
    page_timeout: u64,

    /// Pages recognised at once (output order is unaffected).
    #[arg(short, long, env = "PDF_OCR_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Parent directory for scratch directories (default: OS temp dir).
    #[arg(long, env = "PDF_OCR_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Directory containing libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract_cmd: PathBuf,

    /// Skip whitespace / invisible-character cleanup of recognised text.
    #[arg(long)]
    raw_text: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "PDF_OCR_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PDF_OCR_PORT", default_value_t = 3000)]
    port: u16,

    /// Request body cap in MiB.
    #[arg(long, env = "PDF_OCR_MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_BYTES / (1024 * 1024))]
    max_upload_mb: usize,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local PDF file.
    input: PathBuf,

    /// Language hint passed to tesseract (e.g. eng, hin, eng+hin).
    #[arg(short, long, default_value = "eng")]
    language: String,

    /// Write text to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the JSON response the HTTP endpoint would return.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_OCR_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The extract progress bar replaces INFO-level library logs.
    let show_progress = match &cli.command {
        Command::Extract(a) => !cli.quiet && !a.no_progress && !a.json,
        Command::Serve(_) => false,
    };
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

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Extract(args) => extract(args, show_progress, cli.quiet).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let extractor = build_extractor(&args.engine, None)?;
    extractor_preflight(&args.engine)?;

    let max_upload_bytes = args
        .max_upload_mb
        .checked_mul(1024 * 1024)
        .context("--max-upload-mb is too large")?;
    let app = server::router(Arc::new(extractor), max_upload_bytes);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn extract(args: ExtractArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let extractor = build_extractor(&args.engine, progress_cb)?;
    let language = extractor.language_or_default(Some(&args.language));
    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.display().to_string());

    let result = extractor.extract_file(&args.input, &language).await;

    if args.json {
        // Same shape as the HTTP endpoint, failures included.
        let mut json = serde_json::to_string_pretty(&json_response(&result, &file_name))
            .context("Failed to serialise output")?;
        json.push('\n');
        emit(args.output.as_deref(), &json).await?;
    }
    let output =
        result.with_context(|| format!("Extraction failed for {}", args.input.display()))?;
    if !args.json {
        emit(args.output.as_deref(), &output.text).await?;
    }

    match args.output {
        Some(ref path) => {
            if !quiet {
                eprintln!(
                    "{}  {}/{} pages  {}ms  →  {}",
                    if output.stats.failed_pages == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    output.stats.succeeded_pages,
                    output.stats.total_pages,
                    output.stats.total_duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            if !quiet && !show_progress && !args.json {
                eprintln!(
                    "Recognised {}/{} pages in {}ms",
                    output.stats.succeeded_pages,
                    output.stats.total_pages,
                    output.stats.total_duration_ms
                );
            }
        }
    }

    Ok(())
}

/// The response the HTTP endpoint would send for this outcome.
fn json_response(
    result: &std::result::Result<ExtractionOutput, OcrError>,
    file_name: &str,
) -> ExtractionResponse {
    match result {
        Ok(output) => ExtractionResponse::success(output, file_name),
        Err(e) => ExtractionResponse::failure(e),
    }
}

/// Write to `path`, or to stdout when none is given.
async fn emit(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, content.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")
        }
    }
}

/// Map CLI args to an [`Extractor`].
fn build_extractor(engine: &EngineArgs, progress: Option<ProgressCallback>) -> Result<Extractor> {
    let mut builder = ExtractionConfig::builder()
        .max_pages(engine.max_pages)
        .page_timeout_secs(engine.page_timeout)
        .page_concurrency(engine.concurrency)
        .clean_text(!engine.raw_text);

    if let Some(ref dir) = engine.scratch_dir {
        builder = builder.scratch_root(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    Ok(Extractor::new(
        Arc::new(PdfiumRasterizer::new(engine.pdfium_lib_path.clone())),
        Arc::new(TesseractCli::new(engine.tesseract_cmd.clone())),
        config,
    ))
}

/// Fail fast at startup when pdfium or the scratch root is unusable.
fn extractor_preflight(engine: &EngineArgs) -> Result<()> {
    PdfiumRasterizer::new(engine.pdfium_lib_path.clone())
        .check_binding()
        .context("PDF engine unavailable")?;

    if let Some(ref dir) = engine.scratch_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create scratch root {}", dir.display()))?;
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        // No signal handler: run until killed.
        Err(_) => std::future::pending::<()>().await,
    }
}
