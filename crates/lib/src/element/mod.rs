//! Element plugins.
//!
//! The loader instantiates only junctions itself; every other kind is left
//! to the build engine consuming the [`MetaElement`](crate::loader::MetaElement) graph.

pub mod junction;

pub use junction::JunctionElement;
