//! Invocation context.
//!
//! The [`Context`] holds the user preferences for one invocation: where
//! sources, builds, artifacts and logs live, scheduler tunables, logging
//! preferences and per-project overrides. It is loaded from the embedded
//! defaults with the user configuration file composed on top.
//!
//! # Configuration Format
//!
//! ```yaml
//! builddir: ~/.cache/keel/build
//! scheduler:
//!   on-error: continue
//!   fetchers: 4
//! projects:
//!   hello:
//!     strict: false
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::LoadError;
use crate::node::Node;
use crate::platform::paths::{cache_dir, expand_user, user_config_file};

/// What the scheduler does when a build fails in non interactive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
  Continue,
  Quit,
}

impl ErrorAction {
  const VALID: [&'static str; 2] = ["continue", "quit"];

  fn parse(value: &str) -> Option<Self> {
    match value {
      "continue" => Some(ErrorAction::Continue),
      "quit" => Some(ErrorAction::Quit),
      _ => None,
    }
  }
}

impl fmt::Display for ErrorAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorAction::Continue => write!(f, "continue"),
      ErrorAction::Quit => write!(f, "quit"),
    }
  }
}

/// User preferences and configuration for one invocation.
#[derive(Debug)]
pub struct Context {
  /// The configuration file that was used, `None` for the defaults.
  pub config_origin: Option<PathBuf>,

  /// Where source mirrors are stored.
  pub sourcedir: PathBuf,
  /// Where build sandboxes and subproject checkouts are created.
  pub builddir: PathBuf,
  /// The local artifact cache.
  pub artifactdir: PathBuf,
  /// Where build logs are written.
  pub logdir: PathBuf,

  pub artifact_pull: Option<String>,
  pub artifact_push: Option<String>,
  pub artifact_push_port: u16,

  pub log_key_length: usize,
  pub log_debug: bool,
  pub log_verbose: bool,
  pub log_error_lines: usize,
  pub log_message_lines: usize,
  pub log_element_format: String,

  pub sched_fetchers: usize,
  pub sched_builders: usize,
  pub sched_pushers: usize,
  pub sched_network_retries: usize,
  pub sched_error_action: ErrorAction,

  /// Set from the command line, overrides the per-project `strict` setting.
  pub strict_build_plan: Option<bool>,

  /// Whether junction sources may be fetched while loading.
  pub fetch_subprojects: bool,

  project_overrides: Node,
  cache_key: OnceCell<String>,
}

fn default_config() -> String {
  let cache = cache_dir();
  format!(
    r#"
sourcedir: '{sources}'
builddir: '{build}'
artifactdir: '{artifacts}'
logdir: '{logs}'

scheduler:
  on-error: quit
  fetchers: 10
  builders: 4
  pushers: 4
  network-retries: 2

artifacts:
  pull-url: ''
  push-url: ''
  push-port: 22

logging:
  key-length: 8
  verbose: true
  debug: false
  error-lines: 20
  message-lines: 20
  element-format: '%{{state: >12}} %{{key}} %{{name}}'
"#,
    sources = cache.join("sources").display(),
    build = cache.join("build").display(),
    artifacts = cache.join("artifacts").display(),
    logs = cache.join("logs").display(),
  )
}

fn get_count(node: &Node, key: &str) -> Result<usize, LoadError> {
  let value = node.get_int(key)?;
  usize::try_from(value).map_err(|_| {
    LoadError::invalid_data(format!(
      "{}: {} must be a non-negative integer",
      node.provenance_of(key),
      key
    ))
  })
}

impl Context {
  /// Load the context.
  ///
  /// If `config` is `None`, `$XDG_CONFIG_HOME/keel.conf` is used when it exists,
  /// otherwise only the defaults apply.
  pub fn load(config: Option<&Path>) -> Result<Self, LoadError> {
    let config = match config {
      Some(path) => Some(path.to_path_buf()),
      None => Some(user_config_file()).filter(|path| path.exists()),
    };

    let mut defaults = Node::parse(&default_config(), "default configuration")?;
    let mut origin = None;

    if let Some(path) = config {
      debug!(path = %path.display(), "loading user configuration");
      let user = Node::load(&path, &path.display().to_string())?;
      defaults.composite(&user)?;
      origin = Some(dunce::canonicalize(&path).unwrap_or(path));
    }

    Self::from_node(&defaults, origin)
  }

  /// Load the context from configuration text composed over the defaults.
  pub fn from_yaml(text: &str) -> Result<Self, LoadError> {
    let mut defaults = Node::parse(&default_config(), "default configuration")?;
    let user = Node::parse(text, "user configuration")?;
    defaults.composite(&user)?;
    Self::from_node(&defaults, None)
  }

  fn from_node(node: &Node, config_origin: Option<PathBuf>) -> Result<Self, LoadError> {
    node.validate(&[
      "sourcedir",
      "builddir",
      "artifactdir",
      "logdir",
      "scheduler",
      "artifacts",
      "logging",
      "projects",
    ])?;

    let artifacts = node.get_mapping("artifacts")?;
    artifacts.validate(&["pull-url", "push-url", "push-port"])?;
    let push_port = artifacts.get_int("push-port")?;
    let artifact_push_port = u16::try_from(push_port).map_err(|_| {
      LoadError::invalid_data(format!(
        "{}: push-port must be a valid port number",
        artifacts.provenance_of("push-port")
      ))
    })?;

    let logging = node.get_mapping("logging")?;
    logging.validate(&[
      "key-length",
      "verbose",
      "error-lines",
      "message-lines",
      "debug",
      "element-format",
    ])?;

    let scheduler = node.get_mapping("scheduler")?;
    scheduler.validate(&["on-error", "fetchers", "builders", "pushers", "network-retries"])?;
    let on_error = scheduler.get_str("on-error")?;
    let sched_error_action = ErrorAction::parse(on_error).ok_or_else(|| {
      LoadError::invalid_data(format!(
        "{}: on-error should be one of: {}",
        scheduler.provenance_of("on-error"),
        ErrorAction::VALID.join(", ")
      ))
    })?;

    // Shallow validation, consumers of the overrides validate the rest
    let project_overrides = node.get_mapping_or_empty("projects")?;
    for overrides in project_overrides.expect_mapping()?.values() {
      overrides.validate(&["artifacts", "options", "strict"])?;
    }

    let non_empty = |value: Option<&str>| value.filter(|s| !s.is_empty()).map(str::to_string);

    Ok(Self {
      config_origin,
      sourcedir: expand_user(node.get_str("sourcedir")?),
      builddir: expand_user(node.get_str("builddir")?),
      artifactdir: expand_user(node.get_str("artifactdir")?),
      logdir: expand_user(node.get_str("logdir")?),
      artifact_pull: non_empty(artifacts.get_opt_str("pull-url")?),
      artifact_push: non_empty(artifacts.get_opt_str("push-url")?),
      artifact_push_port,
      log_key_length: get_count(logging, "key-length")?,
      log_debug: logging.get_bool("debug")?,
      log_verbose: logging.get_bool("verbose")?,
      log_error_lines: get_count(logging, "error-lines")?,
      log_message_lines: get_count(logging, "message-lines")?,
      log_element_format: logging.get_str("element-format")?.to_string(),
      sched_fetchers: get_count(scheduler, "fetchers")?,
      sched_builders: get_count(scheduler, "builders")?,
      sched_pushers: get_count(scheduler, "pushers")?,
      sched_network_retries: get_count(scheduler, "network-retries")?,
      sched_error_action,
      strict_build_plan: None,
      fetch_subprojects: false,
      project_overrides,
      cache_key: OnceCell::new(),
    })
  }

  /// The override mapping for `project`, if the user configured one.
  pub fn overrides(&self, project: &str) -> Option<&Node> {
    self.project_overrides.get(project)
  }

  /// Whether `project` uses a strict build plan.
  pub fn strict(&self, project: &str) -> Result<bool, LoadError> {
    if let Some(strict) = self.strict_build_plan {
      return Ok(strict);
    }

    match self.overrides(project) {
      Some(overrides) => Ok(overrides.get_opt_bool("strict")?.unwrap_or(true)),
      None => Ok(true),
    }
  }

  /// Hex digest of everything in the context that alters a build.
  pub fn cache_key(&self) -> &str {
    self.cache_key.get_or_init(|| {
      let unique = serde_json::json!({});
      let mut hasher = Sha256::new();
      hasher.update(unique.to_string().as_bytes());
      hex::encode(hasher.finalize())
    })
  }
}
