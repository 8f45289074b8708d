/// Application name, used for XDG directories and the default config file.
pub const APP_NAME: &str = "keel";

/// Name of the project configuration file at the root of every project.
pub const PROJECT_CONF: &str = "project.conf";

/// Name of the central source reference file of a project.
pub const PROJECT_REFS: &str = "project.refs";

/// Name of the user configuration file inside the XDG config directory.
pub const USER_CONFIG: &str = "keel.conf";

/// Element kind of junction elements.
pub const JUNCTION_KIND: &str = "junction";

/// Highest `format-version` of `project.conf` this version understands.
pub const FORMAT_VERSION: i64 = 1;
