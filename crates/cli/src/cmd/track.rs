//! Implementation of the `keel track` command.
//!
//! Resolves the tracking branches of the targets' sources and writes the new
//! refs to the element files or to `project.refs`.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use keel_lib::track::{TrackOptions, track_elements};

use super::Session;
use crate::output::symbols;

pub fn cmd_track(session: Session, targets: &[String], dry_run: bool) -> Result<()> {
  let project = session.project()?;
  let options = TrackOptions { dry_run };
  let result = track_elements(&session.context, project, targets, &options).context("Failed to track sources")?;

  if dry_run {
    println!("{}", "Dry run - no changes written".yellow());
    println!();
  }

  let prefix = if dry_run { "Would update" } else { "Updated" };
  for tracked in &result.updated {
    let old = tracked.old.as_deref().unwrap_or("none");
    println!(
      "  {} {} {}[{}]: {} {}",
      symbols::MODIFY.yellow(),
      prefix,
      tracked.element.cyan(),
      tracked.index,
      format!("{} ->", old).dimmed(),
      tracked.new.green()
    );
  }

  if !result.unchanged.is_empty() {
    println!("  {} Unchanged: {}", symbols::INFO.dimmed(), result.unchanged.join(", ").dimmed());
  }

  if result.updated.is_empty() {
    println!("{} All sources are up to date.", symbols::SUCCESS.green());
  }
  Ok(())
}
