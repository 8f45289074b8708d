//! Element loading and dependency resolution.
//!
//! The [`Loader`] loads the requested target elements and everything they
//! depend on, following junctions into subprojects. Loading runs in passes:
//!
//! 1. **Load**: element files are parsed recursively and each dependency is
//!    resolved to the element it refers to. Junction-qualified dependencies
//!    first resolve the junction to a subproject loader, materializing the
//!    subproject in the build directory when needed.
//! 2. **Circular check**: one traversal from all targets rejects cycles,
//!    across projects.
//! 3. **Sort**: the direct dependencies of every element are put in a
//!    deterministic order where dependencies come before their dependents.
//! 4. **Collect**: the loaded elements are flattened into a graph of shared
//!    [`MetaElement`]s.
//!
//! # Junction Resolution
//!
//! Junctions defined by a parent project take precedence over junctions of
//! the same name in its subprojects. When two subprojects both define a
//! junction that the parent does not, loading fails with
//! [`LoadError::ConflictingJunction`] so that the toplevel project can decide.
//!
//! # Arena
//!
//! All loaders and elements of one invocation live in the toplevel
//! [`Loader`], they refer to each other by [`LoaderId`] and [`ElementId`].

pub mod element;
mod graph;
pub mod meta;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

pub use element::{LoadDependency, LoadElement};
pub use meta::{MetaElement, MetaSource, dependency_order};
pub use types::{DepType, Dependency, Symbol};

use crate::consts::JUNCTION_KIND;
use crate::context::Context;
use crate::element::JunctionElement;
use crate::error::LoadError;
use crate::node::Node;
use crate::project::Project;
use crate::source::{Consistency, Source, SourceRegistry};

/// Index of a loader in the arena. The toplevel loader is [`LoaderId::ROOT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(pub(crate) usize);

impl LoaderId {
  pub const ROOT: LoaderId = LoaderId(0);
}

/// Index of a loaded element in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) usize);

/// Progress callback, called with a filename and an optional message.
pub type Ticker<'a> = Box<dyn FnMut(&str, Option<&str>) + 'a>;

/// The loader of one project.
#[derive(Debug)]
struct LoaderNode {
  project: Project,
  /// Directory element filenames are relative to.
  basedir: PathBuf,
  targets: Vec<String>,
  /// Junction names leading to this project, each followed by `:`.
  prefix: String,
  parent: Option<LoaderId>,
  /// Staged subproject, removed by cleanup.
  tempdir: Option<PathBuf>,
  elements: HashMap<String, ElementId>,
  /// Resolved junctions, `None` when the junction is absent from a subproject.
  junctions: HashMap<String, Option<LoaderId>>,
  /// Junctions being resolved, to reject a junction that needs itself.
  resolving: HashSet<String>,
}

impl LoaderNode {
  fn new(project: Project, targets: Vec<String>, parent: Option<LoaderId>, tempdir: Option<PathBuf>, prefix: String) -> Self {
    Self {
      basedir: project.element_path.clone(),
      project,
      targets,
      prefix,
      parent,
      tempdir,
      elements: HashMap::new(),
      junctions: HashMap::new(),
      resolving: HashSet::new(),
    }
  }
}

/// Loads a project's target elements and all their dependencies.
pub struct Loader<'a> {
  context: &'a Context,
  registry: SourceRegistry,
  loaders: Vec<LoaderNode>,
  elements: Vec<LoadElement>,
  /// Collected elements by full name.
  meta_elements: HashMap<String, (Arc<MetaElement>, ElementId)>,
  ticker: Option<Ticker<'a>>,
  rewritable: bool,
}

impl<'a> Loader<'a> {
  /// Create a loader for `targets` of `project`.
  ///
  /// Targets are filenames relative to the project's element path, an
  /// absolute target is an error.
  pub fn new<I, S>(context: &'a Context, project: Project, targets: I) -> Result<Self, LoadError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
    for target in &targets {
      if Path::new(target).is_absolute() {
        return Err(LoadError::invalid_data(format!(
          "Target '{}' was not specified as a relative path to the base project directory: {}",
          target,
          project.element_path.display()
        )));
      }
    }

    Ok(Self {
      context,
      registry: SourceRegistry::with_defaults(),
      loaders: vec![LoaderNode::new(project, targets, None, None, String::new())],
      elements: Vec::new(),
      meta_elements: HashMap::new(),
      ticker: None,
      rewritable: false,
    })
  }

  /// Use `registry` to instantiate junction sources.
  pub fn with_sources(mut self, registry: SourceRegistry) -> Self {
    self.registry = registry;
    self
  }

  /// Report progress to `ticker`.
  pub fn set_ticker(&mut self, ticker: impl FnMut(&str, Option<&str>) + 'a) {
    self.ticker = Some(Box::new(ticker));
  }

  /// Load the targets.
  ///
  /// With `rewritable`, loaded elements can be modified with
  /// [`Loader::element_node_mut`] and written back with [`Loader::save_element`].
  ///
  /// Returns one [`MetaElement`] per target, in target order. Subprojects
  /// staged while loading stay on disk until [`Loader::cleanup`], also when
  /// loading fails.
  pub fn load(&mut self, rewritable: bool) -> Result<Vec<Arc<MetaElement>>, LoadError> {
    self.rewritable = rewritable;
    let targets = self.loaders[LoaderId::ROOT.0].targets.clone();

    let mut ids = Vec::with_capacity(targets.len());
    for target in &targets {
      info!(element = %target, "loading target");
      ids.push(self.load_file(LoaderId::ROOT, target)?);
    }

    graph::check_circular_deps(&self.elements, &ids)?;

    let mut visited = HashSet::new();
    for id in &ids {
      graph::sort_dependencies(&mut self.elements, *id, &mut visited);
    }

    let metas = ids
      .iter()
      .map(|id| self.collect_element(*id))
      .collect::<Result<Vec<_>, _>>()?;
    debug!(
      targets = metas.len(),
      elements = self.meta_elements.len(),
      projects = self.loaders.len(),
      "load complete"
    );
    Ok(metas)
  }

  /// Remove the staged subprojects.
  ///
  /// Only directories inside the build directory are removed. Safe to call
  /// after a failed load, and more than once.
  pub fn cleanup(&mut self) {
    self.cleanup_loader(LoaderId::ROOT);
  }

  fn cleanup_loader(&mut self, id: LoaderId) {
    let children: Vec<LoaderId> = (0..self.loaders.len())
      .map(LoaderId)
      .filter(|child| self.loaders[child.0].parent == Some(id))
      .collect();
    for child in children {
      self.cleanup_loader(child);
    }

    let node = &mut self.loaders[id.0];
    if node.parent.is_none() {
      return;
    }
    let Some(tempdir) = node.tempdir.take() else {
      return;
    };

    let builddir = &self.context.builddir;
    if tempdir == *builddir || !tempdir.starts_with(builddir) {
      warn!(path = %tempdir.display(), "not removing directory outside of the build directory");
      return;
    }

    if tempdir.exists() {
      debug!(path = %tempdir.display(), project = %node.project.name, "removing subproject checkout");
      if let Err(e) = fs::remove_dir_all(&tempdir) {
        warn!(path = %tempdir.display(), error = %e, "failed to remove subproject checkout");
      }
    }
  }

  /// The loaded element `dep` refers to, looked up from the loader that declared it.
  pub fn get_element_for_dep(&self, loader: LoaderId, dep: &Dependency) -> Option<&LoadElement> {
    let loader = match &dep.junction {
      Some(junction) => (*self.loaders[loader.0].junctions.get(junction)?)?,
      None => loader,
    };
    let id = self.loaders[loader.0].elements.get(&dep.name)?;
    Some(&self.elements[id.0])
  }

  pub fn project(&self, loader: LoaderId) -> &Project {
    &self.loaders[loader.0].project
  }

  pub fn project_mut(&mut self, loader: LoaderId) -> &mut Project {
    &mut self.loaders[loader.0].project
  }

  pub fn element(&self, id: ElementId) -> &LoadElement {
    &self.elements[id.0]
  }

  /// The element loaded from `filename` by `loader`.
  pub fn find_element(&self, loader: LoaderId, filename: &str) -> Option<ElementId> {
    self.loaders[loader.0].elements.get(filename).copied()
  }

  /// The loader a junction of `loader` resolved to.
  pub fn junction_loader(&self, loader: LoaderId, junction: &str) -> Option<LoaderId> {
    self.loaders[loader.0].junctions.get(junction).copied().flatten()
  }

  /// The parent of a subproject loader.
  pub fn parent(&self, loader: LoaderId) -> Option<LoaderId> {
    self.loaders[loader.0].parent
  }

  /// The staged directory of a subproject loader, until cleanup.
  pub fn tempdir(&self, loader: LoaderId) -> Option<&Path> {
    self.loaders[loader.0].tempdir.as_deref()
  }

  /// Whether `element` depends on `other`, directly or indirectly.
  pub fn depends(&mut self, element: ElementId, other: ElementId) -> bool {
    graph::ensure_dep_cache(&mut self.elements, element);
    self.elements[element.0].depends(&self.elements[other.0])
  }

  /// Instantiate the sources of a collected element, by full name.
  pub fn element_sources(&self, full_name: &str) -> Result<Vec<Box<dyn Source>>, LoadError> {
    let (meta, id) = self
      .meta_elements
      .get(full_name)
      .ok_or_else(|| LoadError::invalid_data(format!("{}: element is not loaded", full_name)))?;
    let project = self.project(self.elements[id.0].loader);
    meta
      .sources
      .iter()
      .map(|source| self.registry.create(source, project, self.context))
      .collect()
  }

  /// The document of a toplevel element, for modification.
  pub fn element_node_mut(&mut self, filename: &str) -> Result<&mut Node, LoadError> {
    let id = self.rewritable_element(filename)?;
    Ok(&mut self.elements[id.0].node)
  }

  /// Write a toplevel element back to its file.
  ///
  /// An element whose document was not modified keeps its file untouched,
  /// comments included.
  pub fn save_element(&self, filename: &str) -> Result<(), LoadError> {
    let id = self.rewritable_element(filename)?;
    let element = &self.elements[id.0];
    let path = self.loaders[LoaderId::ROOT.0].basedir.join(filename);
    if element.is_unchanged() {
      debug!(path = %path.display(), "element unchanged, not saving");
      return Ok(());
    }
    debug!(path = %path.display(), "saving element");
    element.node.dump(&path)
  }

  fn rewritable_element(&self, filename: &str) -> Result<ElementId, LoadError> {
    let id = self
      .find_element(LoaderId::ROOT, filename)
      .ok_or_else(|| LoadError::invalid_data(format!("{}: element is not loaded", filename)))?;
    if !self.elements[id.0].is_rewritable() {
      return Err(LoadError::invalid_data(format!(
        "{}: element was not loaded as rewritable",
        filename
      )));
    }
    Ok(id)
  }

  fn tick(&mut self, filename: &str, message: Option<&str>) {
    trace!(filename, message = ?message, "tick");
    if let Some(ticker) = self.ticker.as_mut() {
      ticker(filename, message);
    }
  }

  /// Load `filename` in `loader` and, recursively, its dependencies.
  fn load_file(&mut self, loader: LoaderId, filename: &str) -> Result<ElementId, LoadError> {
    if let Some(id) = self.loaders[loader.0].elements.get(filename) {
      return Ok(*id);
    }

    self.tick(filename, None);

    let node = &self.loaders[loader.0];
    let fullpath = node.basedir.join(filename);
    let full_name = format!("{}{}", node.prefix, filename);
    trace!(path = %fullpath.display(), full_name, "loading element");

    let (document, source) = Node::load_source(&fullpath, filename)?;
    let declared = types::extract_dependencies(&document)?;
    let mut element = LoadElement::new(document, filename, full_name, loader, self.rewritable)?;
    if self.rewritable {
      element = element.with_source(source);
    }

    let id = ElementId(self.elements.len());
    self.elements.push(element);
    self.loaders[loader.0].elements.insert(filename.to_string(), id);

    for dep in declared {
      let dep_loader = match &dep.junction {
        Some(junction) => {
          self.load_file(loader, junction)?;
          self.get_loader_for_junction(loader, junction)?
        }
        None => loader,
      };

      let dep_id = self.load_file(dep_loader, &dep.name)?;
      if self.elements[dep_id.0].kind == JUNCTION_KIND {
        return Err(LoadError::invalid_data(format!(
          "{}: Cannot depend on junction",
          dep.provenance
        )));
      }

      self.elements[id.0].deps.push(LoadDependency { dep, element: dep_id });
    }

    Ok(id)
  }

  /// The loader of the subproject `junction` of `loader` links to.
  fn get_loader_for_junction(&mut self, loader: LoaderId, junction: &str) -> Result<LoaderId, LoadError> {
    self.get_loader(loader, junction, 0)?.ok_or_else(|| LoadError::ConflictingJunction {
      junction: junction.to_string(),
      project: self.loaders[loader.0].project.name.clone(),
    })
  }

  /// Resolve `junction` from `loader`.
  ///
  /// `level` counts the parents this lookup was delegated through; only the
  /// requesting level treats a missing junction file as an error.
  fn get_loader(&mut self, loader: LoaderId, junction: &str, level: usize) -> Result<Option<LoaderId>, LoadError> {
    if let Some(cached) = self.loaders[loader.0].junctions.get(junction) {
      return match cached {
        Some(resolved) => Ok(Some(*resolved)),
        None => Err(LoadError::ConflictingJunction {
          junction: junction.to_string(),
          project: self.loaders[loader.0].project.name.clone(),
        }),
      };
    }

    if let Some(parent) = self.loaders[loader.0].parent
      && let Some(resolved) = self.get_loader(parent, junction, level + 1)?
    {
      trace!(junction, "junction resolved by parent project");
      self.loaders[loader.0].junctions.insert(junction.to_string(), Some(resolved));
      return Ok(Some(resolved));
    }

    if !self.loaders[loader.0].resolving.insert(junction.to_string()) {
      return Err(LoadError::invalid_data(format!(
        "{}: junction {} depends on itself",
        self.loaders[loader.0].project.name, junction
      )));
    }
    let resolved = self.resolve_junction(loader, junction, level);
    self.loaders[loader.0].resolving.remove(junction);

    let resolved = resolved?;
    self.loaders[loader.0].junctions.insert(junction.to_string(), resolved);
    Ok(resolved)
  }

  fn resolve_junction(&mut self, loader: LoaderId, junction: &str, level: usize) -> Result<Option<LoaderId>, LoadError> {
    let id = match self.load_file(loader, junction) {
      Ok(id) => id,
      Err(LoadError::MissingFile { .. }) if level > 0 => {
        debug!(junction, project = %self.loaders[loader.0].project.name, "junction not defined in parent project");
        return Ok(None);
      }
      Err(e) => return Err(e),
    };

    // Runs before the cycle check, so only junctions are collected here.
    // They have no dependencies to descend into.
    let kind = &self.elements[id.0].kind;
    if kind != JUNCTION_KIND {
      return Err(LoadError::invalid_data(format!(
        "{}: Expected junction but element kind is {}",
        junction, kind
      )));
    }
    let meta = self.collect_element(id)?;

    let mut element = JunctionElement::from_meta(&meta, &self.loaders[loader.0].project, self.context, &self.registry)?;
    element.preflight()?;

    if let Some((target_junction, target_element)) = element.target() {
      let (target_junction, target_element) = (target_junction.to_string(), target_element.to_string());
      debug!(junction, target_junction, target_element, "following junction target");
      self.load_file(loader, &target_junction)?;
      let subproject = self.get_loader_for_junction(loader, &target_junction)?;
      return self.get_loader_for_junction(subproject, &target_element).map(Some);
    }

    self.materialize(loader, junction, element).map(Some)
  }

  /// Make the junction's sources available, stage them and load the subproject.
  fn materialize(&mut self, loader: LoaderId, junction: &str, mut element: JunctionElement) -> Result<LoaderId, LoadError> {
    for source in element.sources_mut() {
      match source.consistency() {
        Consistency::Cached => {}
        Consistency::Resolved if self.context.fetch_subprojects => {
          let message = format!("Fetching subproject from {} source", source.kind());
          if let Some(ticker) = self.ticker.as_mut() {
            ticker(junction, Some(&message));
          }
          info!(junction, kind = source.kind(), "fetching subproject");
          source.fetch()?;
        }
        Consistency::Resolved => {
          return Err(LoadError::SubprojectFetchNeeded {
            junction: junction.to_string(),
          });
        }
        Consistency::Inconsistent => {
          return Err(LoadError::SubprojectInconsistent {
            junction: junction.to_string(),
          });
        }
      }
    }

    let builddir = &self.context.builddir;
    fs::create_dir_all(builddir)
      .map_err(|e| LoadError::io(format!("failed to create build directory {}", builddir.display()), e))?;
    let tempdir = tempfile::Builder::new()
      .prefix(&format!("{}-", element.normal_name()))
      .tempdir_in(builddir)
      .map_err(|e| LoadError::io(format!("failed to create a directory in {}", builddir.display()), e))?;

    element.stage_sources(tempdir.path())?;

    let project_dir = tempdir.path().join(element.path());
    let project = match Project::load(&project_dir, self.context, Some(&element)) {
      Ok(project) => project,
      Err(source @ LoadError::MissingProjectConf { .. }) => {
        let path = if element.path().is_empty() { "." } else { element.path() };
        return Err(LoadError::InvalidJunction {
          junction: junction.to_string(),
          path: path.to_string(),
          source: Box::new(source),
        });
      }
      Err(e) => return Err(e),
    };

    let tempdir = tempdir.keep();
    let prefix = format!("{}{}:", self.loaders[loader.0].prefix, junction);
    info!(junction, project = %project.name, path = %tempdir.display(), "loaded subproject");

    let id = LoaderId(self.loaders.len());
    self
      .loaders
      .push(LoaderNode::new(project, Vec::new(), Some(loader), Some(tempdir), prefix));
    Ok(id)
  }

  /// Flatten `id` and its dependencies into [`MetaElement`]s, once per full name.
  fn collect_element(&mut self, id: ElementId) -> Result<Arc<MetaElement>, LoadError> {
    let element = &self.elements[id.0];
    if let Some((meta, _)) = self.meta_elements.get(&element.full_name) {
      return Ok(Arc::clone(meta));
    }

    let project = &self.loaders[element.loader.0].project;
    let mut meta = MetaElement::new(element, &project.name)?;

    if meta.kind == JUNCTION_KIND
      && let Some(dep) = element.deps.first()
    {
      return Err(LoadError::invalid_data(format!(
        "{}: Junctions do not support dependencies",
        dep.dep.provenance
      )));
    }

    let deps: Vec<(DepType, ElementId)> = element.deps.iter().map(|dep| (dep.dep.dep_type, dep.element)).collect();
    for (dep_type, dep_id) in deps {
      let dep_meta = self.collect_element(dep_id)?;
      if dep_type.is_build() {
        meta.build_dependencies.push(Arc::clone(&dep_meta));
      }
      if dep_type.is_runtime() {
        meta.dependencies.push(dep_meta);
      }
    }

    let meta = Arc::new(meta);
    self
      .meta_elements
      .insert(meta.full_name.clone(), (Arc::clone(&meta), id));
    Ok(meta)
  }
}

#[cfg(test)]
mod tests;
