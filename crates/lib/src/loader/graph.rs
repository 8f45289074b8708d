//! Graph passes over loaded elements: cycle detection and dependency sorting.
//!
//! Both passes work on the element arena directly. Dependencies are resolved
//! to element ids while loading, so the passes cross project boundaries
//! without going back through the junction loaders.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::element::{LoadDependency, LoadElement};
use super::types::DepType;
use super::ElementId;
use crate::error::LoadError;

/// Traversal state of the cycle check, keyed by full name.
#[derive(Debug, Default)]
struct TraversalState {
  on_path: HashSet<String>,
  validated: HashSet<String>,
}

/// Fail with [`LoadError::CircularDependency`] if any element reachable from
/// `targets` depends on itself.
///
/// The targets are treated as the dependencies of a synthetic root, so that
/// several targets share one traversal.
pub(crate) fn check_circular_deps(elements: &[LoadElement], targets: &[ElementId]) -> Result<(), LoadError> {
  let mut state = TraversalState::default();
  for target in targets {
    visit(elements, *target, &mut state)?;
  }
  Ok(())
}

fn visit(elements: &[LoadElement], id: ElementId, state: &mut TraversalState) -> Result<(), LoadError> {
  let element = &elements[id.0];

  if state.validated.contains(&element.full_name) {
    return Ok(());
  }

  if state.on_path.contains(&element.full_name) {
    return Err(LoadError::CircularDependency {
      element: element.name.clone(),
    });
  }

  state.on_path.insert(element.full_name.clone());
  for dep in &element.deps {
    visit(elements, dep.element, state)?;
  }
  state.on_path.remove(&element.full_name);

  state.validated.insert(element.full_name.clone());
  Ok(())
}

/// Sort the direct dependencies of `id` and everything below it.
///
/// Dependencies which another direct dependency needs come first. Otherwise
/// runtime-only dependencies come last, then dependencies are ordered by name,
/// local ones before junctioned ones, then by junction name, then by
/// declaration order.
pub(crate) fn sort_dependencies(elements: &mut [LoadElement], id: ElementId, visited: &mut HashSet<String>) {
  if visited.contains(&elements[id.0].full_name) {
    return;
  }

  let dep_ids: Vec<ElementId> = elements[id.0].deps.iter().map(|dep| dep.element).collect();
  for dep in &dep_ids {
    sort_dependencies(elements, *dep, visited);
  }
  for dep in &dep_ids {
    ensure_dep_cache(elements, *dep);
  }

  let order = dependency_order(elements, &elements[id.0].deps);
  let mut slots: Vec<Option<LoadDependency>> = std::mem::take(&mut elements[id.0].deps).into_iter().map(Some).collect();
  elements[id.0].deps = order.into_iter().filter_map(|index| slots[index].take()).collect();

  visited.insert(elements[id.0].full_name.clone());
}

/// Compute the set of full names `id` transitively depends on.
pub(crate) fn ensure_dep_cache(elements: &mut [LoadElement], id: ElementId) {
  if elements[id.0].dep_cache().is_some() {
    return;
  }

  let dep_ids: Vec<ElementId> = elements[id.0].deps.iter().map(|dep| dep.element).collect();
  let mut cache = HashSet::new();
  for dep in dep_ids {
    ensure_dep_cache(elements, dep);
    let dep_element = &elements[dep.0];
    cache.insert(dep_element.full_name.clone());
    if let Some(transitive) = dep_element.dep_cache() {
      cache.extend(transitive.iter().cloned());
    }
  }

  elements[id.0].set_dep_cache(cache);
}

/// Indices of `deps` in sorted order.
///
/// A topological order of the direct dependencies where, among the
/// dependencies whose prerequisites are already placed, the smallest by
/// [`tie_break`] is placed next.
fn dependency_order(elements: &[LoadElement], deps: &[LoadDependency]) -> Vec<usize> {
  let count = deps.len();
  let prerequisites: Vec<Vec<usize>> = (0..count)
    .map(|i| {
      let element = &elements[deps[i].element.0];
      (0..count)
        .filter(|&j| j != i && element.depends(&elements[deps[j].element.0]))
        .collect()
    })
    .collect();

  let mut placed = vec![false; count];
  let mut order = Vec::with_capacity(count);
  while order.len() < count {
    let next = (0..count)
      .filter(|&i| !placed[i] && prerequisites[i].iter().all(|&j| placed[j]))
      .min_by(|&a, &b| tie_break(&deps[a], &deps[b]).then(a.cmp(&b)));

    let Some(next) = next else {
      break;
    };
    placed[next] = true;
    order.push(next);
  }

  debug_assert_eq!(order.len(), count, "dependency cycle survived the circular check");
  order
}

fn tie_break(a: &LoadDependency, b: &LoadDependency) -> Ordering {
  let runtime_only = |dep: &LoadDependency| dep.dep.dep_type == DepType::Runtime;

  runtime_only(a)
    .cmp(&runtime_only(b))
    .then_with(|| a.dep.name.cmp(&b.dep.name))
    .then_with(|| a.dep.junction.cmp(&b.dep.junction))
}
