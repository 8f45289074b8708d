//! Source tracking.
//!
//! Tracking resolves the tracking branch of each source of an element to a
//! new ref and records it, either inline in the element file or in the
//! project's `project.refs`, depending on the project's ref storage.

use tracing::{debug, info};

use crate::context::Context;
use crate::error::LoadError;
use crate::loader::{Loader, LoaderId, Symbol};
use crate::node::Node;
use crate::project::{Project, RefStorage};

/// Options for [`track_elements`].
#[derive(Debug, Default)]
pub struct TrackOptions {
  /// Resolve new refs without writing them.
  pub dry_run: bool,
}

/// A source whose ref changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSource {
  pub element: String,
  /// Position of the source in the element's `sources` list.
  pub index: usize,
  pub kind: String,
  pub old: Option<String>,
  pub new: String,
}

#[derive(Debug, Default)]
pub struct TrackResult {
  pub updated: Vec<TrackedSource>,
  /// Sources whose tracked ref is the current one, as `element[index]`.
  pub unchanged: Vec<String>,
  /// Whether anything was written.
  pub written: bool,
}

/// Track the sources of `elements`, files of `project`.
///
/// The elements are loaded with their dependencies, so subprojects reached
/// through junction-qualified dependencies must be available. Only the
/// sources of `elements` themselves are tracked; a junction is tracked like
/// any other element.
pub fn track_elements(
  context: &Context,
  project: Project,
  elements: &[String],
  options: &TrackOptions,
) -> Result<TrackResult, LoadError> {
  let mut loader = Loader::new(context, project, elements.iter().cloned())?;
  let result = track_loaded(&mut loader, elements, options);
  loader.cleanup();
  result
}

fn track_loaded(loader: &mut Loader<'_>, elements: &[String], options: &TrackOptions) -> Result<TrackResult, LoadError> {
  loader.load(true)?;

  let ref_storage = loader.project(LoaderId::ROOT).ref_storage;
  let mut result = TrackResult::default();
  let mut refs_changed = false;

  for element in elements {
    let mut element_changed = false;
    let mut sources = loader.element_sources(element)?;

    for (index, source) in sources.iter_mut().enumerate() {
      let Some(new) = source.track()? else {
        debug!(element = %element, index, kind = source.kind(), "source does not track");
        continue;
      };

      let old = stored_ref(loader, element, index)?;
      if old.as_deref() == Some(new.as_str()) {
        result.unchanged.push(format!("{}[{}]", element, index));
        continue;
      }

      info!(element = %element, index, old = ?old, new = %new, "tracked new ref");
      if !options.dry_run {
        write_ref(loader, element, index, &new)?;
        match ref_storage {
          RefStorage::Inline => element_changed = true,
          RefStorage::ProjectRefs => refs_changed = true,
        }
      }

      result.updated.push(TrackedSource {
        element: element.clone(),
        index,
        kind: source.kind().to_string(),
        old,
        new,
      });
    }

    if element_changed {
      loader.save_element(element)?;
      result.written = true;
    }
  }

  if refs_changed && let Some(refs) = &loader.project(LoaderId::ROOT).refs {
    refs.save()?;
    result.written = true;
  }

  Ok(result)
}

/// The ref currently recorded for a source of a toplevel element.
fn stored_ref(loader: &Loader<'_>, element: &str, index: usize) -> Result<Option<String>, LoadError> {
  let project = loader.project(LoaderId::ROOT);
  let source = match project.ref_storage {
    RefStorage::Inline => {
      let Some(id) = loader.find_element(LoaderId::ROOT, element) else {
        return Ok(None);
      };
      loader
        .element(id)
        .node
        .get_opt_sequence(Symbol::SOURCES)?
        .and_then(|sources| sources.get(index))
    }
    RefStorage::ProjectRefs => project
      .refs
      .as_ref()
      .and_then(|refs| refs.lookup_ref(&project.name, element, index)),
  };

  match source {
    Some(source) => Ok(source.get_opt_str("ref")?.map(str::to_string)),
    None => Ok(None),
  }
}

fn write_ref(loader: &mut Loader<'_>, element: &str, index: usize, new: &str) -> Result<(), LoadError> {
  let target = match loader.project(LoaderId::ROOT).ref_storage {
    RefStorage::Inline => {
      let node = loader.element_node_mut(element)?;
      let provenance = node.provenance().clone();
      node
        .get_sequence_mut(Symbol::SOURCES)?
        .get_mut(index)
        .ok_or_else(|| LoadError::invalid_data(format!("{}: no source at index {}", provenance, index)))?
    }
    RefStorage::ProjectRefs => {
      let project = loader.project_mut(LoaderId::ROOT);
      let name = project.name.clone();
      let refs = project
        .refs
        .as_mut()
        .ok_or_else(|| LoadError::invalid_data(format!("{}: project refs are not loaded", name)))?;
      refs.lookup_ref_for_write(&name, element, index)?
    }
  };

  let value = Node::scalar(new, target.child_provenance("ref"));
  target.insert("ref", value)
}
