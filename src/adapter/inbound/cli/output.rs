//! Terminal and JSON-line rendering for pulsewire commands.
//!
//! With `--json` every helper writes `{"type": ..., "payload": ...}` to
//! stdout, one object per line, so `cleanup` progress and query results can
//! be piped into `jq`. `--quiet` keeps warnings and drops the rest.

use std::fmt::Display;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use parking_lot::{const_rwlock, RwLock};
use serde_json::{json, Value};

/// Labels in `field` rows are padded to this width.
const LABEL_WIDTH: usize = 12;

/// Global output flags, set once from the parsed command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }

    const fn mode(self) -> Mode {
        if self.json {
            Mode::Json
        } else if self.quiet {
            Mode::Quiet
        } else {
            Mode::Text
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text,
    Quiet,
    Json,
}

static OUTPUT: RwLock<OutputConfig> = const_rwlock(OutputConfig::new(false, false, 0));

fn mode() -> Mode {
    OUTPUT.read().mode()
}

/// Write one `{"type", "payload"}` object to stdout.
pub fn emit_json_line(kind: &str, payload: Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

/// JSON line in JSON mode, `text` in text mode, nothing when quiet.
fn emit(kind: &str, payload: impl FnOnce() -> Value, text: impl FnOnce()) {
    match mode() {
        Mode::Json => emit_json_line(kind, payload()),
        Mode::Text => text(),
        Mode::Quiet => {}
    }
}

pub fn configure(config: OutputConfig) {
    *OUTPUT.write() = config;
}

#[must_use]
pub fn is_json() -> bool {
    mode() == Mode::Json
}

#[must_use]
pub fn verbosity() -> u8 {
    OUTPUT.read().verbose
}

/// `pulsewire <version>` banner; text mode only.
pub fn header(version: &str) {
    if mode() == Mode::Text {
        println!("{} {}\n", "pulsewire".bold(), version.dimmed());
    }
}

pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        || json!({ "label": label, "value": value }),
        || println!("  {:<LABEL_WIDTH$} {}", label.dimmed(), value),
    );
}

pub fn success(message: &str) {
    emit(
        "success",
        || json!({ "message": message }),
        || println!("  {} {}", "✓".green(), message),
    );
}

/// Shown even with `--quiet`.
pub fn warning(message: &str) {
    match mode() {
        Mode::Json => emit_json_line("warning", json!({ "message": message })),
        Mode::Text | Mode::Quiet => println!("  {} {}", "!".yellow().bold(), message),
    }
}

pub fn section(title: &str) {
    emit(
        "section",
        || json!({ "title": title }),
        || println!("\n{}", title.bold().underline()),
    );
}

/// One line of the `watch` feed. JSON mode prints events itself.
pub fn event(timestamp: &str, label: &str, message: &str) {
    if mode() == Mode::Text {
        println!("  {} {:<17} {}", timestamp.dimmed(), label.cyan(), message);
    }
}

/// Indented block, used for rendered tables.
pub fn lines(content: &str) {
    emit(
        "lines",
        || json!({ "content": content }),
        || content.lines().for_each(|line| println!("  {line}")),
    );
}

pub fn note(message: &str) {
    emit(
        "note",
        || json!({ "message": message }),
        || println!("  {}", message.dimmed()),
    );
}

pub fn hint(message: &str) {
    emit(
        "hint",
        || json!({ "message": message }),
        || println!("  {} {}", "hint:".cyan(), message.dimmed()),
    );
}

/// Cyan in text mode, plain in JSON so payloads carry no escape codes.
#[must_use]
pub fn highlight(value: impl Display) -> String {
    if is_json() {
        value.to_string()
    } else {
        value.cyan().to_string()
    }
}

/// Two decimals, or `-` for a statistic an empty window does not have.
#[must_use]
pub fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// Cleanup progress bar over `total` rows; hidden unless in text mode.
#[must_use]
pub fn progress(total: u64, message: &str) -> ProgressBar {
    if mode() != Mode::Text {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::with_template("  {msg} {wide_bar:.green/white} {pos}/{len} rows ({eta})")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message(message.to_string());
    pb
}
