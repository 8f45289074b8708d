//! Load errors.
//!
//! Every failure of the loader, the document tree, the context and the project
//! configuration is a [`LoadError`]. Callers that need to branch on the kind of
//! failure use [`LoadError::reason`], which is a closed set.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// The kind of a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorReason {
  /// A referenced file does not exist.
  MissingFile,
  /// A file is not valid YAML.
  InvalidYaml,
  /// Malformed configuration: unknown keys, wrong types, illegal values.
  InvalidData,
  /// A dependency cycle was found.
  CircularDependency,
  /// Two subprojects define the same junction without a toplevel override.
  ConflictingJunction,
  /// A subproject must be fetched before it can be loaded.
  SubprojectFetchNeeded,
  /// A subproject has no ref.
  SubprojectInconsistent,
  /// A staged subproject has no project configuration.
  InvalidJunction,
  /// A project directory has no `project.conf`.
  MissingProjectConf,
  /// A source plugin failed.
  SourceError,
  /// A filesystem operation failed.
  Io,
}

/// Errors that can occur while loading projects and elements.
#[derive(Debug, Error)]
pub enum LoadError {
  /// A referenced file does not exist.
  #[error("could not find file at {}", path.display())]
  MissingFile { path: PathBuf },

  /// A file could not be parsed as YAML.
  #[error("{file}: malformed YAML: {message}")]
  InvalidYaml { file: String, message: String },

  /// Malformed configuration.
  #[error("{message}")]
  InvalidData { message: String },

  /// A dependency cycle was detected while visiting `element`.
  #[error("circular dependency detected for element: {element}")]
  CircularDependency { element: String },

  /// The same junction is defined by several subprojects.
  #[error("conflicting junction {junction} in subprojects, define junction in {project}")]
  ConflictingJunction { junction: String, project: String },

  /// The sources of a junction are resolved but not fetched.
  #[error("subproject fetch needed for junction: {junction}")]
  SubprojectFetchNeeded { junction: String },

  /// The sources of a junction have no ref.
  #[error("subproject has no ref for junction: {junction}")]
  SubprojectInconsistent { junction: String },

  /// A junction was staged but contains no project at its configured path.
  #[error("could not find the project.conf file for {junction}. Expecting a project at path '{path}'")]
  InvalidJunction {
    junction: String,
    path: String,
    #[source]
    source: Box<LoadError>,
  },

  /// A project directory has no `project.conf`.
  #[error("could not find project.conf in {}", directory.display())]
  MissingProjectConf { directory: PathBuf },

  /// A source plugin failed.
  #[error(transparent)]
  Source(#[from] SourceError),

  /// A filesystem operation failed.
  #[error("{context}: {source}")]
  Io {
    context: String,
    #[source]
    source: io::Error,
  },
}

impl LoadError {
  /// Shorthand for an [`LoadError::InvalidData`] error.
  pub fn invalid_data(message: impl Into<String>) -> Self {
    LoadError::InvalidData {
      message: message.into(),
    }
  }

  /// Wrap an I/O error with a short description of what was attempted.
  pub fn io(context: impl Into<String>, source: io::Error) -> Self {
    LoadError::Io {
      context: context.into(),
      source,
    }
  }

  /// The kind of this error.
  pub fn reason(&self) -> LoadErrorReason {
    match self {
      LoadError::MissingFile { .. } => LoadErrorReason::MissingFile,
      LoadError::InvalidYaml { .. } => LoadErrorReason::InvalidYaml,
      LoadError::InvalidData { .. } => LoadErrorReason::InvalidData,
      LoadError::CircularDependency { .. } => LoadErrorReason::CircularDependency,
      LoadError::ConflictingJunction { .. } => LoadErrorReason::ConflictingJunction,
      LoadError::SubprojectFetchNeeded { .. } => LoadErrorReason::SubprojectFetchNeeded,
      LoadError::SubprojectInconsistent { .. } => LoadErrorReason::SubprojectInconsistent,
      LoadError::InvalidJunction { .. } => LoadErrorReason::InvalidJunction,
      LoadError::MissingProjectConf { .. } => LoadErrorReason::MissingProjectConf,
      LoadError::Source(_) => LoadErrorReason::SourceError,
      LoadError::Io { .. } => LoadErrorReason::Io,
    }
  }

  /// An actionable hint for the user, if there is one.
  pub fn detail(&self) -> Option<String> {
    match self {
      LoadError::SubprojectFetchNeeded { junction } => {
        Some(format!("Try fetching the project with `keel fetch {}`", junction))
      }
      LoadError::SubprojectInconsistent { junction } => {
        Some(format!("Try tracking the junction element with `keel track {}`", junction))
      }
      _ => None,
    }
  }
}
