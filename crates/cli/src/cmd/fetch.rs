//! Implementation of the `keel fetch` command.

use std::time::Instant;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use keel_lib::fetch::fetch_elements;
use keel_lib::source::SourceRegistry;

use super::Session;
use crate::output::{format_duration, symbols};

/// Fetch the sources of `targets` and their dependencies, subprojects included.
pub fn cmd_fetch(mut session: Session, targets: &[String]) -> Result<()> {
  let start = Instant::now();
  session.context.fetch_subprojects = true;
  let project = session.project()?;

  let result = fetch_elements(&session.context, project, targets, SourceRegistry::with_defaults())
    .context("Failed to fetch sources")?;

  for fetched in &result.fetched {
    println!("  {} Fetched {}", symbols::ADD.green(), fetched.cyan());
  }
  println!(
    "{} {} fetched, {} already cached ({})",
    symbols::SUCCESS.green(),
    result.fetched.len(),
    result.cached,
    format_duration(start.elapsed()).dimmed()
  );
  Ok(())
}
