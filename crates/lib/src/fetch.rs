//! Fetching the sources of loaded elements.

use tracing::{debug, info};

use crate::context::Context;
use crate::error::LoadError;
use crate::loader::{Loader, dependency_order};
use crate::project::Project;
use crate::source::{Consistency, SourceError, SourceRegistry};

#[derive(Debug, Default)]
pub struct FetchResult {
  /// Fetched sources, as `full-name[index]`.
  pub fetched: Vec<String>,
  /// Sources that were already cached.
  pub cached: usize,
}

/// Fetch the sources of `elements` and of everything they depend on.
///
/// Junctions crossed while loading are fetched only when
/// `context.fetch_subprojects` is set. A source without a ref fails with
/// [`SourceError::NoRef`].
pub fn fetch_elements(
  context: &Context,
  project: Project,
  elements: &[String],
  registry: SourceRegistry,
) -> Result<FetchResult, LoadError> {
  let mut loader = Loader::new(context, project, elements.iter().cloned())?.with_sources(registry);
  let result = fetch_loaded(&mut loader);
  loader.cleanup();
  result
}

fn fetch_loaded(loader: &mut Loader<'_>) -> Result<FetchResult, LoadError> {
  let targets = loader.load(false)?;
  let mut result = FetchResult::default();

  for element in dependency_order(&targets) {
    for (index, mut source) in loader.element_sources(&element.full_name)?.into_iter().enumerate() {
      match source.consistency() {
        Consistency::Cached => {
          debug!(element = %element.full_name, index, "source already cached");
          result.cached += 1;
        }
        Consistency::Resolved => {
          info!(element = %element.full_name, index, kind = source.kind(), "fetching source");
          source.fetch()?;
          result.fetched.push(format!("{}[{}]", element.full_name, index));
        }
        Consistency::Inconsistent => {
          return Err(
            SourceError::NoRef {
              kind: source.kind().to_string(),
            }
            .into(),
          );
        }
      }
    }
  }

  Ok(result)
}
