//! Provenance-tracked document trees.
//!
//! Element files, `project.conf`, `project.refs` and the user configuration are
//! all YAML documents. They are loaded into a [`Node`] tree where every value
//! remembers where it came from, so that configuration errors can point at the
//! offending file and key.
//!
//! Scalars are kept as text together with the YAML type they were written
//! with, so that a saved document writes `4` and `true` back unquoted. The
//! typed getters ([`Node::get_bool`], [`Node::get_int`], ...) convert on
//! access and report a [`LoadError::InvalidData`] on a type mismatch.
//!
//! Comments are not part of the tree. A document saved after a change loses
//! them; see [`Node::load_source`] for keeping the original text.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_yaml::Value as Yaml;

use crate::error::LoadError;

/// Ordered mapping of a [`Node`].
pub type Mapping = IndexMap<String, Node>;

/// Where a value was loaded from: a file and a path inside the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
  file: Arc<str>,
  path: String,
}

impl Provenance {
  /// Provenance of the toplevel of `file`.
  pub fn new(file: &str) -> Self {
    Self {
      file: Arc::from(file),
      path: String::new(),
    }
  }

  /// The short name of the file the value was loaded from.
  pub fn file(&self) -> &str {
    &self.file
  }

  /// Path of the value inside its document, e.g. `depends[1].filename`.
  pub fn path(&self) -> &str {
    &self.path
  }

  fn key(&self, key: &str) -> Self {
    let path = if self.path.is_empty() {
      key.to_string()
    } else {
      format!("{}.{}", self.path, key)
    };
    Self {
      file: Arc::clone(&self.file),
      path,
    }
  }

  fn index(&self, index: usize) -> Self {
    Self {
      file: Arc::clone(&self.file),
      path: format!("{}[{}]", self.path, index),
    }
  }
}

impl fmt::Display for Provenance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.path.is_empty() {
      write!(f, "{}", self.file)
    } else {
      write!(f, "{} [{}]", self.file, self.path)
    }
  }
}

/// The YAML type a scalar was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
  String,
  Bool,
  Number,
}

/// The shape of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Scalar(String, ScalarKind),
  Sequence(Vec<Node>),
  Mapping(Mapping),
}

/// A value in a document tree together with its provenance.
///
/// Equality compares values only.
#[derive(Debug, Clone)]
pub struct Node {
  value: Value,
  provenance: Provenance,
}

impl PartialEq for Node {
  fn eq(&self, other: &Self) -> bool {
    self.value == other.value
  }
}

impl Node {
  pub fn new(value: Value, provenance: Provenance) -> Self {
    Self { value, provenance }
  }

  /// An empty mapping.
  pub fn mapping(provenance: Provenance) -> Self {
    Self::new(Value::Mapping(Mapping::new()), provenance)
  }

  /// An empty sequence.
  pub fn sequence(provenance: Provenance) -> Self {
    Self::new(Value::Sequence(Vec::new()), provenance)
  }

  /// A string scalar.
  pub fn scalar(value: impl Into<String>, provenance: Provenance) -> Self {
    Self::new(Value::Scalar(value.into(), ScalarKind::String), provenance)
  }

  /// Load a YAML file.
  ///
  /// `shortname` is used in provenance, usually the project relative path.
  /// An empty document loads as an empty mapping.
  pub fn load(path: &Path, shortname: &str) -> Result<Self, LoadError> {
    Self::load_source(path, shortname).map(|(node, _)| node)
  }

  /// Load a YAML file and also return its text, for callers that write the
  /// document back and want to keep it byte for byte while it is unchanged.
  pub fn load_source(path: &Path, shortname: &str) -> Result<(Self, String), LoadError> {
    let text = match fs::read_to_string(path) {
      Ok(text) => text,
      Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
        return Err(LoadError::MissingFile {
          path: path.to_path_buf(),
        });
      }
      Err(e) => return Err(LoadError::io(format!("failed to read {}", path.display()), e)),
    };

    let node = Self::parse(&text, shortname)?;
    Ok((node, text))
  }

  /// Parse a YAML document whose toplevel must be a mapping.
  pub fn parse(text: &str, shortname: &str) -> Result<Self, LoadError> {
    let yaml: Yaml = serde_yaml::from_str(text).map_err(|e| LoadError::InvalidYaml {
      file: shortname.to_string(),
      message: e.to_string(),
    })?;

    let provenance = Provenance::new(shortname);
    match yaml {
      Yaml::Null => Ok(Self::mapping(provenance)),
      Yaml::Mapping(_) => Self::from_yaml(yaml, provenance),
      _ => Err(LoadError::InvalidYaml {
        file: shortname.to_string(),
        message: "toplevel is not a dictionary".to_string(),
      }),
    }
  }

  fn from_yaml(yaml: Yaml, provenance: Provenance) -> Result<Self, LoadError> {
    let value = match yaml {
      Yaml::Null => Value::Null,
      Yaml::Bool(b) => Value::Scalar(b.to_string(), ScalarKind::Bool),
      Yaml::Number(n) => Value::Scalar(n.to_string(), ScalarKind::Number),
      Yaml::String(s) => Value::Scalar(s, ScalarKind::String),
      Yaml::Sequence(items) => Value::Sequence(
        items
          .into_iter()
          .enumerate()
          .map(|(index, item)| Self::from_yaml(item, provenance.index(index)))
          .collect::<Result<_, _>>()?,
      ),
      Yaml::Mapping(map) => {
        let mut mapping = Mapping::with_capacity(map.len());
        for (key, item) in map {
          let key = match key {
            Yaml::String(s) => s,
            Yaml::Bool(b) => b.to_string(),
            Yaml::Number(n) => n.to_string(),
            other => {
              return Err(LoadError::InvalidYaml {
                file: provenance.file().to_string(),
                message: format!("{}: unsupported dictionary key {:?}", provenance, other),
              });
            }
          };
          let child = Self::from_yaml(item, provenance.key(&key))?;
          mapping.insert(key, child);
        }
        Value::Mapping(mapping)
      }
      Yaml::Tagged(tagged) => {
        let tagged = *tagged;
        return Self::from_yaml(tagged.value, provenance);
      }
    };

    Ok(Self { value, provenance })
  }

  /// Convert back into a plain YAML value.
  pub fn to_yaml(&self) -> Yaml {
    match &self.value {
      Value::Null => Yaml::Null,
      Value::Scalar(s, ScalarKind::String) => Yaml::String(s.clone()),
      Value::Scalar(s, ScalarKind::Bool) => Yaml::Bool(s == "true"),
      Value::Scalar(s, ScalarKind::Number) => match serde_yaml::from_str::<Yaml>(s) {
        Ok(number @ Yaml::Number(_)) => number,
        _ => Yaml::String(s.clone()),
      },
      Value::Sequence(items) => Yaml::Sequence(items.iter().map(Node::to_yaml).collect()),
      Value::Mapping(mapping) => {
        let mut out = serde_yaml::Mapping::with_capacity(mapping.len());
        for (key, value) in mapping {
          out.insert(Yaml::String(key.clone()), value.to_yaml());
        }
        Yaml::Mapping(out)
      }
    }
  }

  /// Write the tree to `path` as YAML.
  pub fn dump(&self, path: &Path) -> Result<(), LoadError> {
    let text = serde_yaml::to_string(&self.to_yaml())
      .map_err(|e| LoadError::invalid_data(format!("{}: failed to serialize: {}", self.provenance, e)))?;
    fs::write(path, text).map_err(|e| LoadError::io(format!("failed to write {}", path.display()), e))
  }

  pub fn value(&self) -> &Value {
    &self.value
  }

  pub fn provenance(&self) -> &Provenance {
    &self.provenance
  }

  /// Provenance of `key` in this mapping, or of the mapping itself when the key is absent.
  pub fn provenance_of(&self, key: &str) -> &Provenance {
    self.get(key).map_or(&self.provenance, Node::provenance)
  }

  pub fn is_null(&self) -> bool {
    matches!(self.value, Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match &self.value {
      Value::Scalar(s, _) => Some(s),
      _ => None,
    }
  }

  pub fn as_mapping(&self) -> Option<&Mapping> {
    match &self.value {
      Value::Mapping(mapping) => Some(mapping),
      _ => None,
    }
  }

  pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
    match &mut self.value {
      Value::Mapping(mapping) => Some(mapping),
      _ => None,
    }
  }

  pub fn as_sequence(&self) -> Option<&[Node]> {
    match &self.value {
      Value::Sequence(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
    match &mut self.value {
      Value::Sequence(items) => Some(items),
      _ => None,
    }
  }

  /// Look up `key` if this node is a mapping.
  pub fn get(&self, key: &str) -> Option<&Node> {
    self.as_mapping()?.get(key)
  }

  pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
    self.as_mapping_mut()?.get_mut(key)
  }

  /// Insert `value` under `key`, the node must be a mapping.
  pub fn insert(&mut self, key: &str, value: Node) -> Result<(), LoadError> {
    let provenance = self.provenance.clone();
    let mapping = self
      .as_mapping_mut()
      .ok_or_else(|| LoadError::invalid_data(format!("{}: Value is not a dictionary", provenance)))?;
    mapping.insert(key.to_string(), value);
    Ok(())
  }

  /// Remove `key` from a mapping, keeping the order of the remaining keys.
  pub fn remove(&mut self, key: &str) -> Option<Node> {
    self.as_mapping_mut()?.shift_remove(key)
  }

  /// Create a child provenance for `key`, for values inserted after loading.
  pub fn child_provenance(&self, key: &str) -> Provenance {
    self.provenance.key(key)
  }

  /// Create a child provenance for a sequence item.
  pub fn item_provenance(&self, index: usize) -> Provenance {
    self.provenance.index(index)
  }

  /// Fail with [`LoadError::InvalidData`] if the mapping has keys outside `allowed`.
  pub fn validate(&self, allowed: &[&str]) -> Result<(), LoadError> {
    for (key, value) in self.expect_mapping()? {
      if !allowed.contains(&key.as_str()) {
        return Err(LoadError::invalid_data(format!(
          "{}: Unexpected key: {}",
          value.provenance, key
        )));
      }
    }
    Ok(())
  }

  /// Fail unless this node is a mapping.
  pub fn expect_mapping(&self) -> Result<&Mapping, LoadError> {
    self
      .as_mapping()
      .ok_or_else(|| LoadError::invalid_data(format!("{}: Value is not a dictionary", self.provenance)))
  }

  fn field(&self, key: &str) -> Result<Option<&Node>, LoadError> {
    Ok(self.expect_mapping()?.get(key).filter(|node| !node.is_null()))
  }

  fn missing(&self, key: &str) -> LoadError {
    LoadError::invalid_data(format!(
      "{}: Dictionary did not contain expected key '{}'",
      self.provenance, key
    ))
  }

  fn type_error(node: &Node, key: &str, expected: &str) -> LoadError {
    LoadError::invalid_data(format!(
      "{}: Value of '{}' is not of the expected type '{}'",
      node.provenance, key, expected
    ))
  }

  pub fn get_str(&self, key: &str) -> Result<&str, LoadError> {
    self.get_opt_str(key)?.ok_or_else(|| self.missing(key))
  }

  pub fn get_opt_str(&self, key: &str) -> Result<Option<&str>, LoadError> {
    match self.field(key)? {
      None => Ok(None),
      Some(node) => node.as_str().map(Some).ok_or_else(|| Self::type_error(node, key, "string")),
    }
  }

  pub fn get_bool(&self, key: &str) -> Result<bool, LoadError> {
    self.get_opt_bool(key)?.ok_or_else(|| self.missing(key))
  }

  pub fn get_opt_bool(&self, key: &str) -> Result<Option<bool>, LoadError> {
    let Some(node) = self.field(key)? else {
      return Ok(None);
    };
    match node.as_str() {
      Some("true" | "True") => Ok(Some(true)),
      Some("false" | "False") => Ok(Some(false)),
      _ => Err(Self::type_error(node, key, "boolean")),
    }
  }

  pub fn get_int(&self, key: &str) -> Result<i64, LoadError> {
    self.get_opt_int(key)?.ok_or_else(|| self.missing(key))
  }

  pub fn get_opt_int(&self, key: &str) -> Result<Option<i64>, LoadError> {
    let Some(node) = self.field(key)? else {
      return Ok(None);
    };
    node
      .as_str()
      .and_then(|s| s.parse::<i64>().ok())
      .map(Some)
      .ok_or_else(|| Self::type_error(node, key, "integer"))
  }

  pub fn get_mapping(&self, key: &str) -> Result<&Node, LoadError> {
    self.get_opt_mapping(key)?.ok_or_else(|| self.missing(key))
  }

  pub fn get_opt_mapping(&self, key: &str) -> Result<Option<&Node>, LoadError> {
    match self.field(key)? {
      None => Ok(None),
      Some(node) if node.as_mapping().is_some() => Ok(Some(node)),
      Some(node) => Err(Self::type_error(node, key, "dictionary")),
    }
  }

  /// A mapping under `key`, or an empty mapping when the key is absent.
  pub fn get_mapping_or_empty(&self, key: &str) -> Result<Node, LoadError> {
    Ok(match self.get_opt_mapping(key)? {
      Some(node) => node.clone(),
      None => Node::mapping(self.child_provenance(key)),
    })
  }

  pub fn get_sequence(&self, key: &str) -> Result<&[Node], LoadError> {
    self.get_opt_sequence(key)?.ok_or_else(|| self.missing(key))
  }

  pub fn get_opt_sequence(&self, key: &str) -> Result<Option<&[Node]>, LoadError> {
    match self.field(key)? {
      None => Ok(None),
      Some(node) => node
        .as_sequence()
        .map(Some)
        .ok_or_else(|| Self::type_error(node, key, "list")),
    }
  }

  pub fn get_sequence_mut(&mut self, key: &str) -> Result<&mut Vec<Node>, LoadError> {
    let provenance = self.provenance.clone();
    let node = self
      .get_mut(key)
      .ok_or_else(|| LoadError::invalid_data(format!("{}: Dictionary did not contain expected key '{}'", provenance, key)))?;
    let item_provenance = node.provenance.clone();
    node
      .as_sequence_mut()
      .ok_or_else(|| LoadError::invalid_data(format!("{}: Value of '{}' is not of the expected type 'list'", item_provenance, key)))
  }

  /// A list of strings under `key`, empty when the key is absent.
  pub fn get_str_list(&self, key: &str) -> Result<Vec<String>, LoadError> {
    let Some(items) = self.get_opt_sequence(key)? else {
      return Ok(Vec::new());
    };
    items
      .iter()
      .map(|item| {
        item
          .as_str()
          .map(str::to_string)
          .ok_or_else(|| Self::type_error(item, key, "string"))
      })
      .collect()
  }

  /// Compose `overrides` on top of this node.
  ///
  /// Mappings are merged key by key, anything else is replaced. Composing a
  /// mapping over a non-mapping (or the reverse) is an error.
  pub fn composite(&mut self, overrides: &Node) -> Result<(), LoadError> {
    if let (Value::Mapping(target), Value::Mapping(source)) = (&mut self.value, &overrides.value) {
      for (key, value) in source {
        match target.get_mut(key) {
          Some(existing) => existing.composite(value)?,
          None => {
            target.insert(key.clone(), value.clone());
          }
        }
      }
      return Ok(());
    }

    let either_mapping = self.as_mapping().is_some() || overrides.as_mapping().is_some();
    if either_mapping && !self.is_null() && !overrides.is_null() {
      return Err(LoadError::invalid_data(format!(
        "{}: Cannot override {} with a value of a different shape",
        overrides.provenance, self.provenance
      )));
    }

    *self = overrides.clone();
    Ok(())
  }
}

impl Serialize for Node {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_yaml().serialize(serializer)
  }
}
