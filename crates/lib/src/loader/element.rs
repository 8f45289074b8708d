use std::collections::HashSet;

use super::types::{Dependency, ELEMENT_KEYS, Symbol};
use super::{ElementId, LoaderId};
use crate::error::LoadError;
use crate::node::Node;

/// A dependency resolved to the element it refers to.
#[derive(Debug, Clone)]
pub struct LoadDependency {
  pub dep: Dependency,
  pub element: ElementId,
}

/// An element file loaded by a loader, before it is collected into a
/// [`MetaElement`](super::MetaElement).
#[derive(Debug)]
pub struct LoadElement {
  /// The element's document.
  pub node: Node,
  /// Filename relative to the element path of its project.
  pub name: String,
  /// Name qualified with the junctions leading to its project, unique across projects.
  pub full_name: String,
  pub kind: String,
  /// The loader of the project this element belongs to.
  pub loader: LoaderId,
  /// Resolved dependencies, sorted once loading completes.
  pub deps: Vec<LoadDependency>,
  rewritable: bool,
  /// Text of the element file, kept for rewritable loads.
  source: Option<String>,
  dep_cache: Option<HashSet<String>>,
}

impl LoadElement {
  pub(crate) fn new(node: Node, name: &str, full_name: String, loader: LoaderId, rewritable: bool) -> Result<Self, LoadError> {
    node.validate(ELEMENT_KEYS)?;
    let kind = node.get_str(Symbol::KIND)?.to_string();

    Ok(Self {
      node,
      name: name.to_string(),
      full_name,
      kind,
      loader,
      deps: Vec::new(),
      rewritable,
      source: None,
      dep_cache: None,
    })
  }

  pub(crate) fn with_source(mut self, source: String) -> Self {
    self.source = Some(source);
    self
  }

  /// Whether the document still matches the file it was loaded from.
  pub(crate) fn is_unchanged(&self) -> bool {
    self
      .source
      .as_deref()
      .and_then(|source| Node::parse(source, &self.name).ok())
      .is_some_and(|original| original == self.node)
  }

  /// Whether the element was loaded to be written back.
  pub fn is_rewritable(&self) -> bool {
    self.rewritable
  }

  /// Whether this element depends on `other`, directly or indirectly.
  ///
  /// Answers `false` until the dependency cache was computed by the loader,
  /// which happens when dependencies are sorted.
  pub fn depends(&self, other: &LoadElement) -> bool {
    self
      .dep_cache
      .as_ref()
      .is_some_and(|cache| cache.contains(&other.full_name))
  }

  pub(crate) fn dep_cache(&self) -> Option<&HashSet<String>> {
    self.dep_cache.as_ref()
  }

  pub(crate) fn set_dep_cache(&mut self, cache: HashSet<String>) {
    self.dep_cache = Some(cache);
  }
}
