//! The `git` source kind.
//!
//! ```yaml
//! sources:
//! - kind: git
//!   url: upstream:base.git
//!   track: main
//!   ref: 4b3d5e7...
//! ```
//!
//! Repositories are mirrored as bare clones under
//! `<sourcedir>/git/<sanitized url>` so that several elements can share a
//! mirror and later fetches are incremental. Staging writes the tree of the
//! ref straight out of the mirror's object database.

use std::fs;
use std::path::{Path, PathBuf};

use gix::objs::tree::EntryKind;
use gix::remote::Direction;
use tracing::{debug, info};

use super::{Consistency, Source, SourceError};
use crate::context::Context;
use crate::error::LoadError;
use crate::loader::MetaSource;
use crate::project::{Project, RefStorage};

#[derive(Debug)]
pub struct GitSource {
  url: String,
  reference: Option<String>,
  track: Option<String>,
  mirror: PathBuf,
}

impl GitSource {
  pub fn create(source: &MetaSource, project: &Project, context: &Context) -> Result<Box<dyn Source>, LoadError> {
    Ok(Box::new(Self::new(source, project, context)?))
  }

  pub fn new(source: &MetaSource, project: &Project, context: &Context) -> Result<Self, LoadError> {
    let config = &source.config;
    config.validate(&["url", "ref", "track"])?;

    let url = project.translate_url(config.get_str("url")?);
    let reference = match project.ref_storage {
      RefStorage::Inline => config.get_opt_str("ref")?.map(str::to_string),
      RefStorage::ProjectRefs => {
        let stored = project
          .refs
          .as_ref()
          .and_then(|refs| refs.lookup_ref(&project.name, &source.element_name, source.element_index));
        match stored {
          Some(node) => node.get_opt_str("ref")?.map(str::to_string),
          None => None,
        }
      }
    };

    let mirror = context.sourcedir.join("git").join(mirror_name(&url));
    Ok(Self {
      url,
      reference,
      track: config.get_opt_str("track")?.map(str::to_string),
      mirror,
    })
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn mirror(&self) -> &Path {
    &self.mirror
  }

  fn has_ref(&self, reference: &str) -> bool {
    if !self.mirror.exists() {
      return false;
    }
    gix::open(&self.mirror)
      .ok()
      .is_some_and(|repo| repo.rev_parse_single(reference).is_ok())
  }

  /// Clone the mirror, or fetch into it if it already exists.
  fn update_mirror(&self) -> Result<gix::Repository, SourceError> {
    if self.mirror.exists() {
      debug!(path = %self.mirror.display(), "opening existing mirror");
      let repo = gix::open(&self.mirror).map_err(|e| SourceError::Open {
        path: self.mirror.clone(),
        source: Box::new(e),
      })?;
      fetch_updates(&repo, &self.url)?;
      return Ok(repo);
    }

    if let Some(parent) = self.mirror.parent() {
      fs::create_dir_all(parent).map_err(|e| SourceError::CreateDir(parent.to_path_buf(), e))?;
    }
    info!(url = %self.url, path = %self.mirror.display(), "cloning repository");
    clone_mirror(&self.url, &self.mirror)
  }
}

impl Source for GitSource {
  fn kind(&self) -> &str {
    "git"
  }

  fn consistency(&self) -> Consistency {
    match &self.reference {
      None => Consistency::Inconsistent,
      Some(reference) if self.has_ref(reference) => Consistency::Cached,
      Some(_) => Consistency::Resolved,
    }
  }

  fn fetch(&mut self) -> Result<(), SourceError> {
    let reference = self.reference.clone().ok_or_else(|| SourceError::NoRef {
      kind: "git".to_string(),
    })?;

    let repo = self.update_mirror()?;
    repo
      .rev_parse_single(reference.as_str())
      .map_err(|_| SourceError::RevisionNotFound { rev: reference })?;
    Ok(())
  }

  fn stage(&self, directory: &Path) -> Result<(), SourceError> {
    let reference = self.reference.as_deref().ok_or_else(|| SourceError::NoRef {
      kind: "git".to_string(),
    })?;
    let checkout = |message: String| SourceError::Checkout {
      rev: reference.to_string(),
      message,
    };

    let repo = gix::open(&self.mirror).map_err(|e| SourceError::Open {
      path: self.mirror.clone(),
      source: Box::new(e),
    })?;
    let id = repo
      .rev_parse_single(reference)
      .map_err(|_| SourceError::RevisionNotFound {
        rev: reference.to_string(),
      })?;
    let tree = id
      .object()
      .map_err(|e| checkout(e.to_string()))?
      .peel_to_tree()
      .map_err(|e| checkout(e.to_string()))?;

    let mut recorder = gix::traverse::tree::Recorder::default();
    tree
      .traverse()
      .breadthfirst(&mut recorder)
      .map_err(|e| checkout(e.to_string()))?;

    debug!(rev = reference, entries = recorder.records.len(), to = %directory.display(), "staging git tree");

    for entry in recorder.records {
      let path = directory.join(gix::path::from_bstr(&entry.filepath));
      match entry.mode.kind() {
        EntryKind::Tree => {
          fs::create_dir_all(&path).map_err(|e| SourceError::CreateDir(path.clone(), e))?;
        }
        EntryKind::Blob | EntryKind::BlobExecutable => {
          let object = repo.find_object(entry.oid).map_err(|e| checkout(e.to_string()))?;
          if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SourceError::CreateDir(parent.to_path_buf(), e))?;
          }
          fs::write(&path, &object.data).map_err(|e| SourceError::Stage {
            path: path.clone(),
            source: e,
          })?;
          if entry.mode.kind() == EntryKind::BlobExecutable {
            set_executable(&path).map_err(|e| SourceError::Stage {
              path: path.clone(),
              source: e,
            })?;
          }
        }
        // Symlinks and submodules are not staged
        EntryKind::Link | EntryKind::Commit => {}
      }
    }

    Ok(())
  }

  fn track(&mut self) -> Result<Option<String>, SourceError> {
    let Some(track) = self.track.clone() else {
      return Ok(None);
    };

    let repo = self.update_mirror()?;
    let id = [format!("refs/remotes/origin/{}", track), format!("refs/heads/{}", track)]
      .iter()
      .find_map(|spec| repo.rev_parse_single(spec.as_str()).ok())
      .ok_or(SourceError::RevisionNotFound { rev: track })?;

    let commit = id.to_string();
    debug!(url = %self.url, rev = %commit, "tracked new ref");
    self.reference = Some(commit.clone());
    Ok(Some(commit))
  }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> std::io::Result<()> {
  Ok(())
}

/// Directory name of the mirror for `url`.
fn mirror_name(url: &str) -> String {
  url
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
    .collect()
}

fn clone_mirror(url: &str, dest: &Path) -> Result<gix::Repository, SourceError> {
  let mut prepared = gix::prepare_clone_bare(url, dest).map_err(|e| SourceError::Clone {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  let (repo, _outcome) = prepared
    .fetch_only(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| SourceError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(repo)
}

fn fetch_updates(repo: &gix::Repository, url: &str) -> Result<(), SourceError> {
  debug!(url, "fetching updates");

  let remote = repo
    .find_default_remote(Direction::Fetch)
    .ok_or(SourceError::NoRemote)?
    .map_err(|e| SourceError::Connect {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let connection = remote.connect(Direction::Fetch).map_err(|e| SourceError::Connect {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| SourceError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| SourceError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}
