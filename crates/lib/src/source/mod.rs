//! Source plugins.
//!
//! A source describes where the content of an element comes from. The loader
//! only needs sources to materialize junctions: it asks each source of a
//! junction for its [`Consistency`], fetches it when allowed, and stages it
//! into a temporary directory from which the subproject is loaded.
//!
//! Plugins are looked up by kind in a [`SourceRegistry`]. The built-in kinds
//! are `local` ([`local::LocalSource`]) and `git` ([`git::GitSource`]).

pub mod git;
pub mod local;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::context::Context;
use crate::error::LoadError;
use crate::loader::MetaSource;
use crate::project::Project;

/// How far a source is from being usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Consistency {
  /// The source has no ref, it must be tracked first.
  Inconsistent,
  /// The source has a ref but its content is not available locally.
  Resolved,
  /// The content for the ref is available locally.
  Cached,
}

impl fmt::Display for Consistency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Consistency::Inconsistent => write!(f, "inconsistent"),
      Consistency::Resolved => write!(f, "resolved"),
      Consistency::Cached => write!(f, "cached"),
    }
  }
}

/// Errors raised by source plugins.
#[derive(Debug, Error)]
pub enum SourceError {
  /// Failed to create a directory.
  #[error("failed to create directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] io::Error),

  /// A local path does not exist.
  #[error("path does not exist: {0}")]
  PathNotFound(PathBuf),

  /// Failed to copy content into the staging directory.
  #[error("failed to stage '{path}': {source}")]
  Stage {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The source has no ref to fetch or stage.
  #[error("{kind} source has no ref, track it first")]
  NoRef { kind: String },

  /// Failed to clone a git repository.
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to open an existing git repository.
  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  /// No remote is configured in the mirror.
  #[error("no remote configured for repository")]
  NoRemote,

  /// Failed to connect to the remote.
  #[error("failed to connect to remote '{url}': {source}")]
  Connect {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to fetch from the remote.
  #[error("failed to fetch from '{url}': {source}")]
  Fetch {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// A revision could not be found in the mirror.
  #[error("revision '{rev}' not found in repository")]
  RevisionNotFound { rev: String },

  /// Failed to check out a revision.
  #[error("failed to checkout revision '{rev}': {message}")]
  Checkout { rev: String, message: String },
}

/// A source plugin instance.
pub trait Source {
  /// The kind this source was created for.
  fn kind(&self) -> &str;

  fn consistency(&self) -> Consistency;

  /// Fetch the content for the current ref. May block on the network.
  fn fetch(&mut self) -> Result<(), SourceError>;

  /// Stage the content into `directory`, which exists.
  fn stage(&self, directory: &Path) -> Result<(), SourceError>;

  /// Resolve the tracking branch to a new ref.
  ///
  /// Returns `None` for sources that cannot be tracked.
  fn track(&mut self) -> Result<Option<String>, SourceError> {
    Ok(None)
  }
}

/// Creates a source from its element configuration.
pub type SourceFactory = Box<dyn Fn(&MetaSource, &Project, &Context) -> Result<Box<dyn Source>, LoadError>>;

/// Source factories keyed by kind.
pub struct SourceRegistry {
  factories: HashMap<String, SourceFactory>,
}

impl SourceRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self {
      factories: HashMap::new(),
    }
  }

  /// A registry with the built-in `local` and `git` kinds.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    registry.register("local", local::LocalSource::create);
    registry.register("git", git::GitSource::create);
    registry
  }

  /// Register `factory` for `kind`, replacing any previous registration.
  pub fn register<F>(&mut self, kind: &str, factory: F)
  where
    F: Fn(&MetaSource, &Project, &Context) -> Result<Box<dyn Source>, LoadError> + 'static,
  {
    self.factories.insert(kind.to_string(), Box::new(factory));
  }

  pub fn contains(&self, kind: &str) -> bool {
    self.factories.contains_key(kind)
  }

  /// Instantiate the plugin for `source`.
  pub fn create(&self, source: &MetaSource, project: &Project, context: &Context) -> Result<Box<dyn Source>, LoadError> {
    let factory = self.factories.get(&source.kind).ok_or_else(|| {
      LoadError::invalid_data(format!(
        "{}: Unknown source kind '{}'",
        source.config.provenance(),
        source.kind
      ))
    })?;
    factory(source, project, context)
  }
}

impl Default for SourceRegistry {
  fn default() -> Self {
    Self::with_defaults()
  }
}

impl fmt::Debug for SourceRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
    kinds.sort_unstable();
    f.debug_struct("SourceRegistry").field("kinds", &kinds).finish()
  }
}
