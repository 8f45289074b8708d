//! CLI output formatting utilities.
//!
//! Colored status messages for the terminal. Colors are only used when the
//! stream supports them.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const ADD: &str = "+";
  pub const MODIFY: &str = "~";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

/// A follow-up suggestion after an error.
pub fn print_hint(message: &str) {
  eprintln!(
    "  {} {}",
    symbols::ARROW.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message
  );
}

/// Loader progress: only messages are shown, plain file loads are logged.
pub fn print_ticker(filename: &str, message: Option<&str>) {
  if let Some(message) = message {
    eprintln!(
      "{} {}: {}",
      symbols::INFO.if_supports_color(Stream::Stderr, |s| s.blue()),
      filename.if_supports_color(Stream::Stderr, |s| s.cyan()),
      message
    );
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
