//! Junction elements.
//!
//! A junction links to another project. The subproject is obtained by
//! staging the junction's sources, and the project found at `path` inside
//! them is loaded.
//!
//! ```yaml
//! kind: junction
//! sources:
//! - kind: git
//!   url: upstream:base.git
//!   ref: 4b3d5e7...
//! config:
//!   path: project
//!   options:
//!     arch: aarch64
//! ```
//!
//! Instead of sources, a junction may name a junction inside another
//! subproject, in which case it resolves to the same project:
//!
//! ```yaml
//! kind: junction
//! config:
//!   target: middleware.bst:base.bst
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::context::Context;
use crate::error::LoadError;
use crate::loader::MetaElement;
use crate::node::Node;
use crate::project::Project;
use crate::source::{Consistency, Source, SourceRegistry};

struct StagedSource {
  directory: Option<String>,
  source: Box<dyn Source>,
}

/// A junction element instantiated from its [`MetaElement`].
pub struct JunctionElement {
  name: String,
  path: String,
  options: Node,
  target: Option<String>,
  target_junction: Option<String>,
  target_element: Option<String>,
  sources: Vec<StagedSource>,
}

impl JunctionElement {
  /// Configure the junction and instantiate its sources.
  pub fn from_meta(
    meta: &MetaElement,
    project: &Project,
    context: &Context,
    registry: &SourceRegistry,
  ) -> Result<Self, LoadError> {
    let config = &meta.config;
    config.validate(&["path", "options", "target"])?;

    let sources = meta
      .sources
      .iter()
      .map(|source| {
        Ok(StagedSource {
          directory: source.directory.clone(),
          source: registry.create(source, project, context)?,
        })
      })
      .collect::<Result<Vec<_>, LoadError>>()?;

    Ok(Self {
      name: meta.name.clone(),
      path: config.get_opt_str("path")?.unwrap_or_default().to_string(),
      options: config.get_mapping_or_empty("options")?,
      target: config.get_opt_str("target")?.map(str::to_string),
      target_junction: None,
      target_element: None,
      sources,
    })
  }

  /// Validate the configuration. Must be called before [`JunctionElement::target`] is used.
  pub fn preflight(&mut self) -> Result<(), LoadError> {
    let Some(target) = &self.target else {
      return Ok(());
    };

    if !self.sources.is_empty() {
      return Err(self.error("junction elements cannot define both 'sources' and 'target' config option"));
    }
    if self.options.as_mapping().is_some_and(|options| !options.is_empty()) {
      return Err(self.error("junction elements cannot define both 'options' and 'target'"));
    }
    if !self.path.is_empty() {
      return Err(self.error("junction elements cannot define both 'path' and 'target'"));
    }

    let (junction, element) = match target.split(':').collect::<Vec<_>>()[..] {
      [junction, element] => (junction.to_string(), element.to_string()),
      _ => return Err(self.error("'target' option must be in format '{junction-name}:{element-name}'")),
    };

    if element == self.name {
      return Err(self.error("junction elements cannot target an element with the same name"));
    }

    self.target_junction = Some(junction);
    self.target_element = Some(element);
    Ok(())
  }

  fn error(&self, message: &str) -> LoadError {
    LoadError::invalid_data(format!("{}: {}", self.name, message))
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The name usable in file names: without `.bst`, slashes replaced.
  pub fn normal_name(&self) -> String {
    self.name.strip_suffix(".bst").unwrap_or(&self.name).replace('/', "-")
  }

  /// Path of the subproject inside the staged sources.
  pub fn path(&self) -> &str {
    &self.path
  }

  /// Option values to set in the subproject.
  pub fn options(&self) -> &Node {
    &self.options
  }

  /// The junction and element this junction targets, once preflighted.
  pub fn target(&self) -> Option<(&str, &str)> {
    Some((self.target_junction.as_deref()?, self.target_element.as_deref()?))
  }

  pub fn sources(&self) -> impl Iterator<Item = &dyn Source> {
    self.sources.iter().map(|staged| staged.source.as_ref())
  }

  pub fn sources_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Source>> {
    self.sources.iter_mut().map(|staged| &mut staged.source)
  }

  /// The lowest consistency of all sources, `Cached` without sources.
  pub fn consistency(&self) -> Consistency {
    self
      .sources()
      .map(|source| source.consistency())
      .min()
      .unwrap_or(Consistency::Cached)
  }

  /// Stage all sources into `directory`, each in its configured subdirectory.
  pub fn stage_sources(&self, directory: &Path) -> Result<(), LoadError> {
    for staged in &self.sources {
      let destination = match &staged.directory {
        Some(subdir) => directory.join(subdir),
        None => directory.to_path_buf(),
      };
      fs::create_dir_all(&destination)
        .map_err(|e| LoadError::io(format!("failed to create {}", destination.display()), e))?;

      debug!(junction = %self.name, kind = staged.source.kind(), to = %destination.display(), "staging source");
      staged.source.stage(&destination)?;
    }
    Ok(())
  }
}
