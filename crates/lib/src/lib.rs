//! keel-lib: element loading for keel
//!
//! This crate loads the element files of a project into a dependency graph:
//! - `Node`: provenance-tracked YAML documents
//! - `Loader`: recursive element loading across junctioned subprojects
//! - `MetaElement`: the flattened, shared element graph handed to a build engine
//! - `Context` and `Project`: user and project configuration
//! - `Source`: the plugin contract used to materialize subprojects

pub mod consts;
pub mod context;
pub mod element;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod node;
pub mod platform;
pub mod project;
pub mod projectrefs;
pub mod source;
pub mod track;

pub use context::Context;
pub use error::{LoadError, LoadErrorReason};
pub use loader::{Loader, MetaElement, MetaSource};
pub use node::Node;
pub use project::Project;
