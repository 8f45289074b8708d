//! The flattened element graph produced by the loader.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::element::LoadElement;
use super::types::Symbol;
use crate::error::LoadError;
use crate::node::{Node, Provenance};

/// A source of an element, with its selector keys consumed.
#[derive(Debug, Clone, Serialize)]
pub struct MetaSource {
  /// The element the source belongs to.
  pub element_name: String,
  /// Position of the source in the element's `sources` list.
  pub element_index: usize,
  pub kind: String,
  /// The source configuration, without `kind` and `directory`.
  pub config: Node,
  /// Subdirectory to stage the source into.
  pub directory: Option<String>,
}

/// A fully loaded element.
///
/// Every element appears once in the graph, dependencies are shared.
#[derive(Debug, Serialize)]
pub struct MetaElement {
  /// Name of the project the element belongs to.
  pub project: String,
  pub name: String,
  pub full_name: String,
  pub kind: String,
  #[serde(skip)]
  pub provenance: Provenance,
  pub sources: Vec<MetaSource>,
  pub config: Node,
  pub variables: Node,
  pub environment: Node,
  pub env_nocache: Vec<String>,
  pub public: Node,
  pub sandbox: Node,
  /// Dependencies needed to build the element, in sorted order.
  #[serde(serialize_with = "full_names")]
  pub build_dependencies: Vec<Arc<MetaElement>>,
  /// Dependencies needed to run the element, in sorted order.
  #[serde(serialize_with = "full_names")]
  pub dependencies: Vec<Arc<MetaElement>>,
}

impl MetaElement {
  /// Extract everything but the dependencies from a loaded element.
  pub(crate) fn new(element: &LoadElement, project: &str) -> Result<Self, LoadError> {
    let node = &element.node;

    Ok(Self {
      project: project.to_string(),
      name: element.name.clone(),
      full_name: element.full_name.clone(),
      kind: element.kind.clone(),
      provenance: node.provenance().clone(),
      sources: extract_sources(node, &element.name)?,
      config: node.get_mapping_or_empty(Symbol::CONFIG)?,
      variables: node.get_mapping_or_empty(Symbol::VARIABLES)?,
      environment: node.get_mapping_or_empty(Symbol::ENVIRONMENT)?,
      env_nocache: node.get_str_list(Symbol::ENV_NOCACHE)?,
      public: node.get_mapping_or_empty(Symbol::PUBLIC)?,
      sandbox: node.get_mapping_or_empty(Symbol::SANDBOX)?,
      build_dependencies: Vec::new(),
      dependencies: Vec::new(),
    })
  }
}

fn full_names<S: Serializer>(deps: &[Arc<MetaElement>], serializer: S) -> Result<S::Ok, S::Error> {
  serializer.collect_seq(deps.iter().map(|dep| dep.full_name.as_str()))
}

fn extract_sources(node: &Node, element_name: &str) -> Result<Vec<MetaSource>, LoadError> {
  let Some(sources) = node.get_opt_sequence(Symbol::SOURCES)? else {
    return Ok(Vec::new());
  };

  sources
    .iter()
    .enumerate()
    .map(|(index, source)| {
      source.expect_mapping()?;
      let kind = source.get_str(Symbol::KIND)?.to_string();
      let directory = source
        .get_opt_str(Symbol::DIRECTORY)?
        .filter(|directory| !directory.is_empty())
        .map(str::to_string);

      let mut config = source.clone();
      config.remove(Symbol::KIND);
      if directory.is_some() {
        config.remove(Symbol::DIRECTORY);
      }

      Ok(MetaSource {
        element_name: element_name.to_string(),
        element_index: index,
        kind,
        config,
        directory,
      })
    })
    .collect()
}

/// Flatten the graph below `targets` so that every element comes after all
/// of its build and runtime dependencies. Each element appears once.
pub fn dependency_order(targets: &[Arc<MetaElement>]) -> Vec<Arc<MetaElement>> {
  fn visit(element: &Arc<MetaElement>, seen: &mut HashSet<String>, order: &mut Vec<Arc<MetaElement>>) {
    if !seen.insert(element.full_name.clone()) {
      return;
    }
    for dep in element.build_dependencies.iter().chain(&element.dependencies) {
      visit(dep, seen, order);
    }
    order.push(Arc::clone(element));
  }

  let mut seen = HashSet::new();
  let mut order = Vec::new();
  for target in targets {
    visit(target, &mut seen, &mut order);
  }
  order
}
