//! Project reference storage.
//!
//! Projects with `ref-storage: project.refs` keep the refs of their sources
//! outside of the element files, in a `project.refs` file next to
//! `project.conf`. Refs are stored per project so that a toplevel project can
//! also pin the sources of its junctioned subprojects.
//!
//! # File Format
//!
//! ```yaml
//! projects:
//!   hello:
//!     base.bst:
//!     - ref: 4b3d5e7a...
//!     - {}
//!       # one entry per source of the element, by position
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LoadError;
use crate::node::{Node, Provenance};

/// The refs of a project, loaded from its `project.refs` file.
///
/// Two views are kept: the loaded tree, which lookups read from, and the save
/// tree, which writes go to and which [`ProjectRefs::save`] dumps.
#[derive(Debug, Clone)]
pub struct ProjectRefs {
  fullpath: PathBuf,
  base_name: String,
  toplevel: Node,
  toplevel_save: Node,
}

impl ProjectRefs {
  /// Create an empty store for `<directory>/<base_name>`. Nothing is read until [`ProjectRefs::load`].
  pub fn new(directory: &Path, base_name: &str) -> Self {
    let toplevel = Self::empty(base_name);
    Self {
      fullpath: directory.join(base_name),
      base_name: base_name.to_string(),
      toplevel_save: toplevel.clone(),
      toplevel,
    }
  }

  fn empty(base_name: &str) -> Node {
    let mut toplevel = Node::mapping(Provenance::new(base_name));
    let projects = Node::mapping(toplevel.child_provenance("projects"));
    if let Some(mapping) = toplevel.as_mapping_mut() {
      mapping.insert("projects".to_string(), projects);
    }
    toplevel
  }

  /// Load the file. A missing file loads as an empty store.
  pub fn load(&mut self) -> Result<(), LoadError> {
    let toplevel = match Node::load(&self.fullpath, &self.base_name) {
      Ok(node) => node,
      Err(LoadError::MissingFile { .. }) => {
        debug!(path = %self.fullpath.display(), "no project refs, starting empty");
        Self::empty(&self.base_name)
      }
      Err(e) => return Err(e),
    };

    toplevel.validate(&["projects"])?;
    let mut toplevel = toplevel;
    if toplevel.get_opt_mapping("projects")?.is_none() {
      let projects = Node::mapping(toplevel.child_provenance("projects"));
      toplevel.insert("projects", projects)?;
    }

    self.toplevel_save = toplevel.clone();
    self.toplevel = toplevel;
    Ok(())
  }

  /// Write the save view back to the file.
  pub fn save(&self) -> Result<(), LoadError> {
    debug!(path = %self.fullpath.display(), "saving project refs");
    self.toplevel_save.dump(&self.fullpath)
  }

  pub fn path(&self) -> &Path {
    &self.fullpath
  }

  /// The ref mapping of source `source_index` of `element` in `project`.
  ///
  /// Never creates anything, returns `None` when any level is absent.
  pub fn lookup_ref(&self, project: &str, element: &str, source_index: usize) -> Option<&Node> {
    self
      .toplevel
      .get("projects")?
      .get(project)?
      .get(element)?
      .as_sequence()?
      .get(source_index)
  }

  /// The ref mapping of a source in the save view, created when missing.
  ///
  /// Missing project and element entries are created, and the element's list
  /// is padded with empty mappings up to `source_index`.
  pub fn lookup_ref_for_write(&mut self, project: &str, element: &str, source_index: usize) -> Result<&mut Node, LoadError> {
    let projects = ensure_child(&mut self.toplevel_save, "projects", Node::mapping)?;
    let project_node = ensure_child(projects, project, Node::mapping)?;
    let element_node = ensure_child(project_node, element, Node::sequence)?;

    let len = element_node
      .as_sequence()
      .map(<[Node]>::len)
      .ok_or_else(|| not_a_list(element_node, element))?;
    let padding: Vec<Node> = (len..=source_index)
      .map(|index| Node::mapping(element_node.item_provenance(index)))
      .collect();

    let provenance = element_node.provenance().clone();
    let list = element_node
      .as_sequence_mut()
      .ok_or_else(|| LoadError::invalid_data(format!("{}: Value is not a list", provenance)))?;
    list.extend(padding);
    list
      .get_mut(source_index)
      .ok_or_else(|| LoadError::invalid_data(format!("{}: missing source {}", provenance, source_index)))
  }
}

fn not_a_list(node: &Node, key: &str) -> LoadError {
  LoadError::invalid_data(format!(
    "{}: Value of '{}' is not of the expected type 'list'",
    node.provenance(),
    key
  ))
}

/// Get `key` of the mapping `node`, inserting `make(provenance)` when absent.
fn ensure_child<'n>(
  node: &'n mut Node,
  key: &str,
  make: fn(Provenance) -> Node,
) -> Result<&'n mut Node, LoadError> {
  if node.get(key).is_none() {
    let child = make(node.child_provenance(key));
    node.insert(key, child)?;
  }
  let provenance = node.provenance().clone();
  node
    .get_mut(key)
    .ok_or_else(|| LoadError::invalid_data(format!("{}: missing key '{}'", provenance, key)))
}
