mod fetch;
mod show;
mod track;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::debug;

use keel_lib::{Context, Project};

pub use fetch::cmd_fetch;
pub use show::cmd_show;
pub use track::cmd_track;

/// The user context and the toplevel project a command works on.
pub struct Session {
  pub context: Context,
  pub directory: PathBuf,
}

impl Session {
  pub fn open(directory: &Path, config: Option<&Path>) -> Result<Self> {
    let directory = dunce::canonicalize(directory)
      .with_context(|| format!("Project directory not found: {}", directory.display()))?;
    let context = Context::load(config).context("Failed to load user configuration")?;
    debug!(directory = %directory.display(), config = ?context.config_origin, "opened session");
    Ok(Self { context, directory })
  }

  pub fn project(&self) -> Result<Project> {
    Project::load(&self.directory, &self.context, None)
      .with_context(|| format!("Failed to load project in {}", self.directory.display()))
  }
}
