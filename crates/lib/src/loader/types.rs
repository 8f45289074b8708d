//! Element file keys and dependency declarations.

use std::fmt;

use crate::error::LoadError;
use crate::node::{Node, Provenance};

/// Keys and values of element files.
pub struct Symbol;

impl Symbol {
  pub const FILENAME: &'static str = "filename";
  pub const KIND: &'static str = "kind";
  pub const DESCRIPTION: &'static str = "description";
  pub const DEPENDS: &'static str = "depends";
  pub const BUILD_DEPENDS: &'static str = "build-depends";
  pub const RUNTIME_DEPENDS: &'static str = "runtime-depends";
  pub const SOURCES: &'static str = "sources";
  pub const CONFIG: &'static str = "config";
  pub const VARIABLES: &'static str = "variables";
  pub const ENVIRONMENT: &'static str = "environment";
  pub const ENV_NOCACHE: &'static str = "environment-nocache";
  pub const PUBLIC: &'static str = "public";
  pub const SANDBOX: &'static str = "sandbox";
  pub const TYPE: &'static str = "type";
  pub const JUNCTION: &'static str = "junction";
  pub const DIRECTORY: &'static str = "directory";
  pub const BUILD: &'static str = "build";
  pub const RUNTIME: &'static str = "runtime";
  pub const ALL: &'static str = "all";
}

/// Toplevel keys allowed in an element file.
pub const ELEMENT_KEYS: &[&str] = &[
  Symbol::KIND,
  Symbol::DESCRIPTION,
  Symbol::DEPENDS,
  Symbol::BUILD_DEPENDS,
  Symbol::RUNTIME_DEPENDS,
  Symbol::SOURCES,
  Symbol::CONFIG,
  Symbol::VARIABLES,
  Symbol::ENVIRONMENT,
  Symbol::ENV_NOCACHE,
  Symbol::PUBLIC,
  Symbol::SANDBOX,
];

/// Which scopes a dependency applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepType {
  /// Needed to build the element only.
  Build,
  /// Needed when the element is used only.
  Runtime,
  /// Both.
  All,
}

impl DepType {
  pub fn is_build(self) -> bool {
    self != DepType::Runtime
  }

  pub fn is_runtime(self) -> bool {
    self != DepType::Build
  }
}

impl fmt::Display for DepType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DepType::Build => write!(f, "{}", Symbol::BUILD),
      DepType::Runtime => write!(f, "{}", Symbol::RUNTIME),
      DepType::All => write!(f, "{}", Symbol::ALL),
    }
  }
}

/// A dependency as declared in an element file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
  /// Element filename, relative to the element path of its project.
  pub name: String,
  /// The junction the element is found through, `None` for the same project.
  pub junction: Option<String>,
  pub dep_type: DepType,
  pub provenance: Provenance,
}

impl Dependency {
  /// Parse one item of a dependency list.
  ///
  /// `implied` is the type implied by the list (`build-depends`,
  /// `runtime-depends`); in that case the item may not specify a `type`.
  pub fn from_node(item: &Node, implied: Option<DepType>) -> Result<Self, LoadError> {
    let provenance = item.provenance().clone();

    let (name, junction, dep_type) = if let Some(name) = item.as_str() {
      (name.to_string(), None, implied.unwrap_or(DepType::All))
    } else if item.as_mapping().is_some() {
      let dep_type = match implied {
        Some(dep_type) => {
          item.validate(&[Symbol::FILENAME, Symbol::JUNCTION])?;
          dep_type
        }
        None => {
          item.validate(&[Symbol::FILENAME, Symbol::TYPE, Symbol::JUNCTION])?;
          match item.get_opt_str(Symbol::TYPE)? {
            None | Some(Symbol::ALL) => DepType::All,
            Some(Symbol::BUILD) => DepType::Build,
            Some(Symbol::RUNTIME) => DepType::Runtime,
            Some(other) => {
              return Err(LoadError::invalid_data(format!(
                "{}: Dependency type '{}' is not 'build', 'runtime' or 'all'",
                item.provenance_of(Symbol::TYPE),
                other
              )));
            }
          }
        }
      };
      let name = item.get_str(Symbol::FILENAME)?.to_string();
      let junction = item.get_opt_str(Symbol::JUNCTION)?.map(str::to_string);
      (name, junction, dep_type)
    } else {
      return Err(LoadError::invalid_data(format!(
        "{}: Dependency is not specified as a string or a dictionary",
        provenance
      )));
    };

    if junction.is_some() && name.contains(':') {
      return Err(LoadError::invalid_data(format!(
        "{}: Dependency {} contains `:` in its name. `:` characters are not allowed in filename when junction attribute is specified.",
        provenance, name
      )));
    }

    if name.matches(':').count() > 1 {
      return Err(LoadError::invalid_data(format!(
        "{}: Dependency {} contains multiple `:` in its name. Recursive lookups for cross-junction elements is not allowed.",
        provenance, name
      )));
    }

    let (name, junction) = match (junction, name.split_once(':')) {
      (None, Some((junction, element))) => (element.to_string(), Some(junction.to_string())),
      (junction, _) => (name, junction),
    };

    Ok(Self {
      name,
      junction,
      dep_type,
      provenance,
    })
  }
}

impl fmt::Display for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.junction {
      Some(junction) => write!(f, "{}:{}", junction, self.name),
      None => write!(f, "{}", self.name),
    }
  }
}

/// All dependencies declared by an element, in declaration order:
/// `depends`, then `build-depends`, then `runtime-depends`.
pub fn extract_dependencies(node: &Node) -> Result<Vec<Dependency>, LoadError> {
  let mut deps = Vec::new();
  for (key, implied) in [
    (Symbol::DEPENDS, None),
    (Symbol::BUILD_DEPENDS, Some(DepType::Build)),
    (Symbol::RUNTIME_DEPENDS, Some(DepType::Runtime)),
  ] {
    if let Some(items) = node.get_opt_sequence(key)? {
      for item in items {
        deps.push(Dependency::from_node(item, implied)?);
      }
    }
  }
  Ok(deps)
}
