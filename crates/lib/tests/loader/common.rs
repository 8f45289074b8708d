//! Shared helpers for loader integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use keel_lib::{Context, Project};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Path to a fixture project.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Isolated copy of a fixture project with its own build and source directories.
pub struct TestEnv {
  pub temp: TempDir,
  pub context: Context,
}

impl TestEnv {
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    copy_tree(&fixture_path(name), &temp.path().join("project"));
    let context = Context::from_yaml(&format!(
      "sourcedir: '{}'\nbuilddir: '{}'\n",
      temp.path().join("sources").display(),
      temp.path().join("build").display()
    ))
    .unwrap();
    Self { temp, context }
  }

  pub fn project_dir(&self) -> PathBuf {
    self.temp.path().join("project")
  }

  pub fn builddir(&self) -> PathBuf {
    self.temp.path().join("build")
  }

  pub fn project(&self) -> Project {
    Project::load(&self.project_dir(), &self.context, None).unwrap()
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.project_dir().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  /// Number of entries left in the build directory.
  pub fn builddir_entries(&self) -> usize {
    match fs::read_dir(self.builddir()) {
      Ok(entries) => entries.count(),
      Err(_) => 0,
    }
  }
}

fn copy_tree(from: &Path, to: &Path) {
  for entry in WalkDir::new(from) {
    let entry = entry.unwrap();
    let target = to.join(entry.path().strip_prefix(from).unwrap());
    if entry.file_type().is_dir() {
      fs::create_dir_all(&target).unwrap();
    } else {
      fs::copy(entry.path(), &target).unwrap();
    }
  }
}
