//! The `local` source kind: a file or directory inside the project.
//!
//! ```yaml
//! sources:
//! - kind: local
//!   path: files/subproject
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::{Consistency, Source, SourceError};
use crate::context::Context;
use crate::error::LoadError;
use crate::loader::MetaSource;
use crate::project::Project;

/// Content that lives in the project directory. Always cached.
#[derive(Debug)]
pub struct LocalSource {
  path: PathBuf,
}

impl LocalSource {
  pub fn create(source: &MetaSource, project: &Project, _context: &Context) -> Result<Box<dyn Source>, LoadError> {
    source.config.validate(&["path"])?;
    let path = source.config.get_str("path")?;
    Ok(Box::new(Self {
      path: project.directory.join(path),
    }))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Source for LocalSource {
  fn kind(&self) -> &str {
    "local"
  }

  fn consistency(&self) -> Consistency {
    Consistency::Cached
  }

  fn fetch(&mut self) -> Result<(), SourceError> {
    Ok(())
  }

  fn stage(&self, directory: &Path) -> Result<(), SourceError> {
    if !self.path.exists() {
      return Err(SourceError::PathNotFound(self.path.clone()));
    }

    debug!(from = %self.path.display(), to = %directory.display(), "staging local source");

    if self.path.is_file() {
      let name = self.path.file_name().unwrap_or(self.path.as_os_str());
      return copy_file(&self.path, &directory.join(name));
    }

    for entry in WalkDir::new(&self.path).sort_by_file_name() {
      let entry = entry.map_err(|e| SourceError::Stage {
        path: self.path.clone(),
        source: io::Error::from(e),
      })?;

      let rel_path = entry.path().strip_prefix(&self.path).unwrap_or(entry.path());
      if rel_path.as_os_str().is_empty() {
        continue;
      }

      let target = directory.join(rel_path);
      if entry.file_type().is_dir() {
        fs::create_dir_all(&target).map_err(|e| SourceError::CreateDir(target.clone(), e))?;
      } else {
        copy_file(entry.path(), &target)?;
      }
    }

    Ok(())
  }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), SourceError> {
  if let Some(parent) = to.parent() {
    fs::create_dir_all(parent).map_err(|e| SourceError::CreateDir(parent.to_path_buf(), e))?;
  }
  fs::copy(from, to).map_err(|e| SourceError::Stage {
    path: from.to_path_buf(),
    source: e,
  })?;
  Ok(())
}
