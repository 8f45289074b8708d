//! Implementation of the `keel show` command.
//!
//! Loads the targets and prints every element of the resulting graph, each
//! after the elements it depends on.

use std::sync::Arc;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use keel_lib::loader::{Loader, MetaElement, dependency_order};

use super::Session;
use crate::output::{print_json, print_ticker, symbols};

pub fn cmd_show(mut session: Session, targets: &[String], fetch: bool, json: bool) -> Result<()> {
  session.context.fetch_subprojects = fetch;
  let project = session.project()?;

  let mut loader = Loader::new(&session.context, project, targets.iter().cloned())?;
  loader.set_ticker(print_ticker);
  let loaded = loader.load(false);
  loader.cleanup();
  let loaded = loaded.context("Failed to load elements")?;

  let order = dependency_order(&loaded);
  if json {
    let elements: Vec<&MetaElement> = order.iter().map(|element| &**element).collect();
    return print_json(&elements);
  }

  for element in &order {
    print_element(element);
  }
  Ok(())
}

fn names(deps: &[Arc<MetaElement>]) -> String {
  deps
    .iter()
    .map(|dep| dep.full_name.as_str())
    .collect::<Vec<_>>()
    .join(", ")
}

fn print_element(element: &MetaElement) {
  println!(
    "{} {} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    element.full_name.if_supports_color(Stream::Stdout, |s| s.cyan()),
    format!("({}, {})", element.kind, element.project).if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
  if !element.build_dependencies.is_empty() {
    println!("    build: {}", names(&element.build_dependencies));
  }
  if !element.dependencies.is_empty() {
    println!("    runtime: {}", names(&element.dependencies));
  }
}
