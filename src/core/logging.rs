//! Terminal Logging Module
//!
//! Tracing setup for the CLI plus the small amount of styled terminal
//! output it needs:
//! - JSON file log with daily rolling, old files gzip-compressed
//! - Compact stderr log so stdout stays clean for command output
//! - Diagnostic error reporting (miette)
//! - Terminal capability detection for colour and emoji

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use console::{style, Term};
use flate2::write::GzEncoder;
use flate2::Compression;
use miette::Diagnostic;
use supports_color::Stream;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "tripkit.log";

static TERMINAL_CAPS: OnceLock<TerminalCapabilities> = OnceLock::new();

fn get_terminal_caps() -> &'static TerminalCapabilities {
    TERMINAL_CAPS.get_or_init(TerminalCapabilities::detect)
}

// ============================================================================
// Terminal Capability Detection
// ============================================================================

/// Terminal color support levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLevel {
    TrueColor,
    Ansi256,
    Ansi16,
    NoColor,
}

/// Detected terminal capabilities
#[derive(Debug, Clone)]
pub struct TerminalCapabilities {
    pub color_level: ColorLevel,
    pub supports_unicode: bool,
    pub is_interactive: bool,
}

impl TerminalCapabilities {
    /// Detect terminal capabilities from environment
    pub fn detect() -> Self {
        use is_terminal::IsTerminal;

        let color_level = match supports_color::on(Stream::Stderr) {
            Some(support) if support.has_16m => ColorLevel::TrueColor,
            Some(support) if support.has_256 => ColorLevel::Ansi256,
            Some(support) if support.has_basic => ColorLevel::Ansi16,
            _ => ColorLevel::NoColor,
        };

        let is_interactive = io::stderr().is_terminal();

        // Unicode support heuristic
        let supports_unicode = std::env::var("TERM")
            .map(|t| !t.contains("dumb"))
            .unwrap_or(true)
            && std::env::var("LANG")
                .map(|l| l.contains("UTF-8") || l.contains("utf8"))
                .unwrap_or(true);

        Self {
            color_level,
            supports_unicode,
            is_interactive,
        }
    }

    pub fn should_colorize(&self) -> bool {
        self.is_interactive && self.color_level != ColorLevel::NoColor
    }
}

// ============================================================================
// Logging Initialization
// ============================================================================

/// Directory log files are written to.
pub fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tripkit").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize logging for the CLI.
///
/// Sets up a JSON file layer (daily rolling) and a compact stderr layer,
/// both filtered by `RUST_LOG` or `default_filter`. Standard `log` macros
/// are routed to `tracing` and miette is configured for error reports.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init(default_filter: &str) -> WorkerGuard {
    let log_dir = log_dir();

    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(env_filter.clone());

    // stdout carries command output
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_target(false)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    // Already installed when tracing-subscriber bridges `log` itself.
    let _ = tracing_log::LogTracer::init();

    init_miette();

    let log_dir_clone = log_dir.clone();
    std::thread::spawn(move || {
        compress_old_logs(&log_dir_clone);
    });

    log::debug!("Logging to {:?} (daily rolling)", log_dir.join(LOG_FILE));

    guard
}

/// Compress rolled-over log files
fn compress_old_logs(log_dir: &Path) {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_stale_log(name, &today) {
            continue;
        }
        match compress_file(&path) {
            Ok(()) => log::info!("Compressed old log: {:?}", path),
            Err(e) => log::warn!("Failed to compress old log {:?}: {}", path, e),
        }
    }
}

/// Rolled files are named `tripkit.log.YYYY-MM-DD`; today's is still open.
fn is_stale_log(name: &str, today: &str) -> bool {
    name.starts_with(&format!("{LOG_FILE}.")) && !name.ends_with(today) && !name.ends_with(".gz")
}

fn compress_file(path: &Path) -> io::Result<()> {
    let file = fs::File::open(path)?;
    let mut reader = io::BufReader::new(file);

    let mut gz_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No filename"))?
        .to_os_string();
    gz_name.push(".gz");
    let gz_path = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No parent directory"))?
        .join(gz_name);

    if gz_path.exists() {
        return Ok(());
    }

    let output = fs::File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)?;
    Ok(())
}

fn init_miette() {
    let caps = get_terminal_caps();

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(caps.color_level == ColorLevel::TrueColor)
                .unicode(caps.supports_unicode)
                .context_lines(2)
                .tab_width(4)
                .color(caps.should_colorize())
                .build(),
        )
    }))
    .ok(); // Ignore if already set
}

// ============================================================================
// Diagnostic Error Types (miette integration)
// ============================================================================

/// Error reported by the CLI, optionally pointing into the input text.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code("tripkit::error"))]
pub struct CliError {
    message: String,

    #[source_code]
    source_code: Option<String>,

    #[label("here")]
    span: Option<miette::SourceSpan>,

    #[help]
    help_text: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source_code: None,
            span: None,
            help_text: None,
        }
    }

    /// JSON syntax error located in `source`.
    pub fn json(source: &str, err: &serde_json::Error) -> Self {
        let offset = offset_of(source, err.line(), err.column());
        Self::new(format!("Invalid JSON: {err}")).with_source(source, offset, 1)
    }

    pub fn with_source(mut self, source: impl Into<String>, offset: usize, length: usize) -> Self {
        let source = source.into();
        let offset = offset.min(source.len());
        let length = length.min(source.len() - offset);
        self.source_code = Some(source);
        self.span = Some(miette::SourceSpan::new(offset.into(), length));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help_text = Some(help.into());
        self
    }
}

/// Byte offset of a 1-based line and column.
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

// ============================================================================
// Console Output Utilities
// ============================================================================

fn prefix(shortcode: &str, fallback: &'static str) -> String {
    if get_terminal_caps().supports_unicode {
        if let Some(emoji) = emojis::get_by_shortcode(shortcode) {
            return emoji.as_str().to_string();
        }
    }
    fallback.to_string()
}

/// Print a success message to stderr
pub fn print_success(message: &str) {
    let term = Term::stderr();
    let _ = term.write_line(&format!(
        "{} {}",
        style(prefix("white_check_mark", "[v]")).green(),
        style(message).green()
    ));
}

/// Print a warning message to stderr
pub fn print_warning(message: &str) {
    let term = Term::stderr();
    let _ = term.write_line(&format!(
        "{} {}",
        style(prefix("warning", "[!]")).yellow(),
        style(message).yellow().bold()
    ));
}

// ============================================================================
// Tests
// ============================================================================
