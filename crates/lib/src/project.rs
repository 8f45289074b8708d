//! Project configuration.
//!
//! A project is a directory with a `project.conf` at its root:
//!
//! ```yaml
//! name: hello
//! element-path: elements
//! ref-storage: project.refs
//! aliases:
//!   upstream: https://git.example.com/
//! options:
//!   arch:
//!     type: arch
//!     default: x86_64
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::consts::{FORMAT_VERSION, PROJECT_CONF, PROJECT_REFS};
use crate::context::Context;
use crate::element::JunctionElement;
use crate::error::LoadError;
use crate::node::Node;
use crate::projectrefs::ProjectRefs;

/// Where the refs of a project's sources are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefStorage {
  /// In the element files, as the `ref` of each source.
  Inline,
  /// In the `project.refs` file of the toplevel project.
  ProjectRefs,
}

impl RefStorage {
  fn parse(value: &str) -> Option<Self> {
    match value {
      "inline" => Some(RefStorage::Inline),
      "project.refs" => Some(RefStorage::ProjectRefs),
      _ => None,
    }
  }
}

impl fmt::Display for RefStorage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RefStorage::Inline => write!(f, "inline"),
      RefStorage::ProjectRefs => write!(f, "project.refs"),
    }
  }
}

/// A loaded project.
#[derive(Debug, Clone)]
pub struct Project {
  pub name: String,
  /// Absolute project directory.
  pub directory: PathBuf,
  /// Absolute directory element filenames are relative to.
  pub element_path: PathBuf,
  pub ref_storage: RefStorage,
  pub format_version: i64,
  /// Whether the project uses a strict build plan.
  pub strict: bool,
  /// The junction this project was loaded through, if it is a subproject.
  pub junction: Option<String>,
  /// Resolved option values, by option name.
  pub options: IndexMap<String, String>,
  /// The project's refs, with `ref-storage: project.refs`.
  pub refs: Option<ProjectRefs>,
  aliases: IndexMap<String, String>,
}

impl Project {
  /// Load the project at `directory`.
  ///
  /// Fails with [`LoadError::MissingProjectConf`] when `directory` has no
  /// `project.conf`. Options are resolved from their declared defaults, then
  /// the `junction` options, then the user's project overrides.
  pub fn load(directory: &Path, context: &Context, junction: Option<&JunctionElement>) -> Result<Self, LoadError> {
    let config = match Node::load(&directory.join(PROJECT_CONF), PROJECT_CONF) {
      Ok(node) => node,
      Err(LoadError::MissingFile { .. }) => {
        return Err(LoadError::MissingProjectConf {
          directory: directory.to_path_buf(),
        });
      }
      Err(e) => return Err(e),
    };

    config.validate(&["name", "element-path", "ref-storage", "format-version", "options", "aliases"])?;

    let directory = dunce::canonicalize(directory)
      .map_err(|e| LoadError::io(format!("failed to resolve project directory {}", directory.display()), e))?;
    let name = config.get_str("name")?.to_string();

    let format_version = config.get_opt_int("format-version")?.unwrap_or(0);
    if format_version > FORMAT_VERSION {
      return Err(LoadError::invalid_data(format!(
        "{}: Project requested format version {}, but only version {} is supported",
        config.provenance_of("format-version"),
        format_version,
        FORMAT_VERSION
      )));
    }

    let element_path = Self::element_path(&config, &directory)?;

    let ref_storage = match config.get_opt_str("ref-storage")? {
      None => RefStorage::Inline,
      Some(value) => RefStorage::parse(value).ok_or_else(|| {
        LoadError::invalid_data(format!(
          "{}: Invalid value '{}' specified for ref-storage, expected inline or project.refs",
          config.provenance_of("ref-storage"),
          value
        ))
      })?,
    };

    let mut aliases = IndexMap::new();
    for (alias, url) in config.get_mapping_or_empty("aliases")?.expect_mapping()? {
      let url = url.as_str().ok_or_else(|| {
        LoadError::invalid_data(format!("{}: Alias '{}' is not a string", url.provenance(), alias))
      })?;
      aliases.insert(alias.clone(), url.to_string());
    }

    let mut options = IndexMap::new();
    for (option, declaration) in config.get_mapping_or_empty("options")?.expect_mapping()? {
      declaration.validate(&["type", "description", "default", "values", "variable"])?;
      let default = declaration.get_opt_str("default")?.unwrap_or_default();
      options.insert(option.clone(), default.to_string());
    }
    if let Some(junction) = junction {
      apply_options(&mut options, junction.options())?;
    }
    if let Some(overrides) = context.overrides(&name)
      && let Some(user_options) = overrides.get_opt_mapping("options")?
    {
      apply_options(&mut options, user_options)?;
    }

    let refs = match ref_storage {
      RefStorage::Inline => None,
      RefStorage::ProjectRefs => {
        let mut refs = ProjectRefs::new(&directory, PROJECT_REFS);
        refs.load()?;
        Some(refs)
      }
    };

    debug!(name, directory = %directory.display(), %ref_storage, "loaded project");

    Ok(Self {
      strict: context.strict(&name)?,
      junction: junction.map(|junction| junction.name().to_string()),
      name,
      directory,
      element_path,
      ref_storage,
      format_version,
      options,
      refs,
      aliases,
    })
  }

  fn element_path(config: &Node, directory: &Path) -> Result<PathBuf, LoadError> {
    let relative = config.get_opt_str("element-path")?.unwrap_or(".");
    if Path::new(relative).is_absolute() {
      return Err(LoadError::invalid_data(format!(
        "{}: element-path must be relative to the project directory",
        config.provenance_of("element-path")
      )));
    }

    let element_path = directory.join(relative);
    if !element_path.is_dir() {
      return Err(LoadError::invalid_data(format!(
        "{}: element-path '{}' is not a directory",
        config.provenance_of("element-path"),
        relative
      )));
    }
    dunce::canonicalize(&element_path)
      .map_err(|e| LoadError::io(format!("failed to resolve element path {}", element_path.display()), e))
  }

  /// Expand a URL alias (`alias:path`) with the project's aliases.
  pub fn translate_url(&self, url: &str) -> String {
    if let Some((alias, body)) = url.split_once(':')
      && let Some(expansion) = self.aliases.get(alias)
    {
      return format!("{}{}", expansion, body);
    }
    url.to_string()
  }
}

fn apply_options(options: &mut IndexMap<String, String>, values: &Node) -> Result<(), LoadError> {
  for (option, value) in values.expect_mapping()? {
    let slot = options.get_mut(option).ok_or_else(|| {
      LoadError::invalid_data(format!("{}: Unknown project option '{}'", value.provenance(), option))
    })?;
    *slot = value
      .as_str()
      .ok_or_else(|| LoadError::invalid_data(format!("{}: Option '{}' is not a string", value.provenance(), option)))?
      .to_string();
  }
  Ok(())
}
