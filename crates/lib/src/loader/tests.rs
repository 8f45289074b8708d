use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempDir;
use tracing_test::traced_test;

use super::*;
use crate::error::LoadErrorReason;
use crate::node::Provenance;
use crate::source::{Source, SourceError};

struct Fixture {
  temp: TempDir,
  context: Context,
}

impl Fixture {
  /// A toplevel project in `project/`, `files` are relative to the temp root.
  fn new(files: &[(&str, &str)]) -> Self {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("project/project.conf", "name: top\n")]);
    write_tree(temp.path(), files);
    let context = Context::from_yaml(&format!(
      "sourcedir: '{}'\nbuilddir: '{}'\n",
      temp.path().join("sources").display(),
      temp.path().join("build").display()
    ))
    .unwrap();
    Self { temp, context }
  }

  fn project(&self) -> Project {
    Project::load(&self.temp.path().join("project"), &self.context, None).unwrap()
  }

  fn loader(&self, targets: &[&str]) -> Loader<'_> {
    Loader::new(&self.context, self.project(), targets.iter().copied()).unwrap()
  }

  fn load(&self, targets: &[&str]) -> Result<Vec<Arc<MetaElement>>, LoadError> {
    let mut loader = self.loader(targets);
    let result = loader.load(false);
    loader.cleanup();
    result
  }

  fn builddir(&self) -> PathBuf {
    self.temp.path().join("build")
  }
}

fn write_tree(root: &Path, files: &[(&str, &str)]) {
  for (path, content) in files {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }
}

fn names(deps: &[Arc<MetaElement>]) -> Vec<&str> {
  deps.iter().map(|dep| dep.full_name.as_str()).collect()
}

/// A junction to `dir`, a directory of the project the junction lives in.
fn local_junction(dir: &str) -> String {
  format!("kind: junction\nsources:\n- kind: local\n  path: {}\n", dir)
}

const BASE_PROJECT: &[(&str, &str)] = &[
  ("project/base/project.conf", "name: base\noptions:\n  arch:\n    type: arch\n    default: x86_64\n"),
  ("project/base/lib.bst", "kind: manual\n"),
];

#[test]
fn diamond_shares_one_element() {
  let fixture = Fixture::new(&[
    ("project/app.bst", "kind: manual\ndepends:\n- c.bst\n- b.bst\n"),
    ("project/b.bst", "kind: manual\ndepends:\n- d.bst\n"),
    ("project/c.bst", "kind: manual\ndepends:\n- d.bst\n"),
    ("project/d.bst", "kind: manual\n"),
  ]);

  let targets = fixture.load(&["app.bst"]).unwrap();
  assert_eq!(targets.len(), 1);
  let app = &targets[0];
  assert_eq!(app.project, "top");
  assert_eq!(names(&app.build_dependencies), vec!["b.bst", "c.bst"]);
  assert_eq!(names(&app.dependencies), vec!["b.bst", "c.bst"]);

  let b = &app.dependencies[0];
  let c = &app.dependencies[1];
  assert!(Arc::ptr_eq(&b.dependencies[0], &c.dependencies[0]));
  assert!(Arc::ptr_eq(&app.build_dependencies[0], b));
}

#[test]
fn dependency_types_split_build_and_runtime() {
  let fixture = Fixture::new(&[
    (
      "project/app.bst",
      "kind: manual\nbuild-depends:\n- tool.bst\nruntime-depends:\n- data.bst\ndepends:\n- lib.bst\n",
    ),
    ("project/tool.bst", "kind: manual\n"),
    ("project/data.bst", "kind: manual\n"),
    ("project/lib.bst", "kind: manual\n"),
  ]);

  let app = &fixture.load(&["app.bst"]).unwrap()[0];
  assert_eq!(names(&app.build_dependencies), vec!["lib.bst", "tool.bst"]);
  assert_eq!(names(&app.dependencies), vec!["lib.bst", "data.bst"]);
}

#[test]
fn cycle_fails() {
  let fixture = Fixture::new(&[
    ("project/a.bst", "kind: manual\ndepends:\n- b.bst\n"),
    ("project/b.bst", "kind: manual\ndepends:\n- a.bst\n"),
  ]);
  let err = fixture.load(&["a.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::CircularDependency);
}

#[test]
fn missing_target_fails() {
  let fixture = Fixture::new(&[]);
  let err = fixture.load(&["nope.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::MissingFile);
}

#[test]
fn missing_dependency_fails() {
  let fixture = Fixture::new(&[("project/app.bst", "kind: manual\ndepends:\n- nope.bst\n")]);
  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::MissingFile);
}

#[test]
fn element_without_kind_fails() {
  let fixture = Fixture::new(&[("project/app.bst", "description: no kind\n")]);
  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::InvalidData);
}

#[test]
fn absolute_target_is_rejected() {
  let fixture = Fixture::new(&[]);
  let Err(err) = Loader::new(&fixture.context, fixture.project(), ["/abs/app.bst"]) else {
    panic!("absolute target accepted");
  };
  assert_eq!(err.reason(), LoadErrorReason::InvalidData);
  assert!(err.to_string().contains("was not specified as a relative path"));
}

#[test]
fn shared_targets_load_once() {
  let fixture = Fixture::new(&[
    ("project/a.bst", "kind: manual\ndepends:\n- shared.bst\n"),
    ("project/b.bst", "kind: manual\ndepends:\n- shared.bst\n"),
    ("project/shared.bst", "kind: manual\n"),
  ]);

  let targets = fixture.load(&["a.bst", "b.bst", "a.bst"]).unwrap();
  assert_eq!(targets.len(), 3);
  assert!(Arc::ptr_eq(&targets[0], &targets[2]));
  assert!(Arc::ptr_eq(&targets[0].dependencies[0], &targets[1].dependencies[0]));
}

#[test]
fn ticker_sees_every_file_once() {
  let fixture = Fixture::new(&[
    ("project/app.bst", "kind: manual\ndepends:\n- lib.bst\n- other.bst\n"),
    ("project/lib.bst", "kind: manual\n"),
    ("project/other.bst", "kind: manual\ndepends:\n- lib.bst\n"),
  ]);

  let ticks = RefCell::new(Vec::new());
  let mut loader = fixture.loader(&["app.bst"]);
  loader.set_ticker(|filename, message| {
    assert!(message.is_none());
    ticks.borrow_mut().push(filename.to_string());
  });
  loader.load(false).unwrap();
  drop(loader);

  assert_eq!(*ticks.borrow(), vec!["app.bst", "lib.bst", "other.bst"]);
}

#[test]
fn junctioned_dependency_loads_subproject() {
  let mut files: Vec<(&str, &str)> = BASE_PROJECT.to_vec();
  let junction = local_junction("base");
  files.push(("project/base.bst", junction.as_str()));
  files.push(("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"));
  let fixture = Fixture::new(&files);

  let mut loader = fixture.loader(&["app.bst"]);
  let app = loader.load(false).unwrap().remove(0);

  let lib = &app.dependencies[0];
  assert_eq!(lib.full_name, "base.bst:lib.bst");
  assert_eq!(lib.name, "lib.bst");
  assert_eq!(lib.project, "base");

  let sub = loader.junction_loader(LoaderId::ROOT, "base.bst").unwrap();
  assert_eq!(loader.parent(sub), Some(LoaderId::ROOT));
  assert_eq!(loader.project(sub).junction.as_deref(), Some("base.bst"));
  let tempdir = loader.tempdir(sub).unwrap().to_path_buf();
  assert!(tempdir.starts_with(fixture.builddir()));
  assert!(tempdir.join("project.conf").exists());
  assert!(
    tempdir
      .file_name()
      .unwrap()
      .to_string_lossy()
      .starts_with("base-")
  );

  loader.cleanup();
  assert!(!tempdir.exists());
  assert!(loader.tempdir(sub).is_none());
  loader.cleanup();
  assert!(fixture.builddir().exists());
}

#[test]
#[traced_test]
fn cleanup_keeps_directories_outside_builddir() {
  let mut files: Vec<(&str, &str)> = BASE_PROJECT.to_vec();
  let junction = local_junction("base");
  files.push(("project/base.bst", junction.as_str()));
  files.push(("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"));
  let fixture = Fixture::new(&files);

  let mut loader = fixture.loader(&["app.bst"]);
  loader.load(false).unwrap();
  let sub = loader.junction_loader(LoaderId::ROOT, "base.bst").unwrap();
  let staged = loader.tempdir(sub).unwrap().to_path_buf();

  let outside = fixture.temp.path().join("project/base");
  loader.loaders[sub.0].tempdir = Some(outside.clone());
  loader.cleanup();

  assert!(outside.join("project.conf").exists());
  assert!(logs_contain("not removing directory outside of the build directory"));
  fs::remove_dir_all(staged).unwrap();
}

#[test]
fn get_element_for_dep_follows_junctions() {
  let mut files: Vec<(&str, &str)> = BASE_PROJECT.to_vec();
  let junction = local_junction("base");
  files.push(("project/base.bst", junction.as_str()));
  files.push(("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n- local.bst\n"));
  files.push(("project/local.bst", "kind: manual\n"));
  let fixture = Fixture::new(&files);

  let mut loader = fixture.loader(&["app.bst"]);
  loader.load(false).unwrap();

  let app = loader.find_element(LoaderId::ROOT, "app.bst").unwrap();
  let deps: Vec<Dependency> = loader.element(app).deps.iter().map(|dep| dep.dep.clone()).collect();
  let resolved: Vec<&str> = deps
    .iter()
    .map(|dep| loader.get_element_for_dep(LoaderId::ROOT, dep).unwrap().full_name.as_str())
    .collect();
  assert_eq!(resolved, vec!["base.bst:lib.bst", "local.bst"]);

  let local = loader.find_element(LoaderId::ROOT, "local.bst").unwrap();
  assert!(!loader.depends(local, app));
  assert!(loader.depends(app, local));
  loader.cleanup();
}

#[test]
fn junction_options_apply_to_subproject() {
  let mut files: Vec<(&str, &str)> = BASE_PROJECT.to_vec();
  let junction = format!("{}config:\n  options:\n    arch: aarch64\n", local_junction("base"));
  files.push(("project/base.bst", junction.as_str()));
  files.push(("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"));
  let fixture = Fixture::new(&files);

  let mut loader = fixture.loader(&["app.bst"]);
  loader.load(false).unwrap();
  let sub = loader.junction_loader(LoaderId::ROOT, "base.bst").unwrap();
  assert_eq!(loader.project(sub).options.get("arch").map(String::as_str), Some("aarch64"));
  loader.cleanup();
}

#[test]
fn parent_junction_overrides_subproject_junction() {
  let fixture = Fixture::new(&[
    ("project/base/project.conf", "name: base\n"),
    ("project/base/lib.bst", "kind: manual\n"),
    ("project/base.bst", local_junction("base").as_str()),
    ("project/mid.bst", local_junction("mid").as_str()),
    ("project/mid/project.conf", "name: mid\n"),
    ("project/mid/base.bst", local_junction("stale").as_str()),
    ("project/mid/stale/project.conf", "name: stale\n"),
    ("project/mid/stale/lib.bst", "kind: manual\n"),
    ("project/mid/tool.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"),
    ("project/app.bst", "kind: manual\ndepends:\n- mid.bst:tool.bst\n"),
  ]);

  let app = &fixture.load(&["app.bst"]).unwrap()[0];
  let tool = &app.dependencies[0];
  assert_eq!(tool.full_name, "mid.bst:tool.bst");
  assert_eq!(tool.project, "mid");

  let lib = &tool.dependencies[0];
  assert_eq!(lib.project, "base");
  assert_eq!(lib.full_name, "base.bst:lib.bst");
}

#[test]
fn sibling_subprojects_with_same_junction_conflict() {
  let fixture = Fixture::new(&[
    ("project/a.bst", local_junction("a").as_str()),
    ("project/a/project.conf", "name: a\n"),
    ("project/a/c.bst", local_junction("c").as_str()),
    ("project/a/c/project.conf", "name: c\n"),
    ("project/a/c/y.bst", "kind: manual\n"),
    ("project/a/x.bst", "kind: manual\ndepends:\n- c.bst:y.bst\n"),
    ("project/b.bst", local_junction("b").as_str()),
    ("project/b/project.conf", "name: b\n"),
    ("project/b/c.bst", local_junction("c").as_str()),
    ("project/b/c/project.conf", "name: c\n"),
    ("project/b/c/y.bst", "kind: manual\n"),
    ("project/b/x.bst", "kind: manual\ndepends:\n- c.bst:y.bst\n"),
    ("project/app.bst", "kind: manual\ndepends:\n- a.bst:x.bst\n- b.bst:x.bst\n"),
  ]);

  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::ConflictingJunction);
  assert_eq!(
    err.to_string(),
    "conflicting junction c.bst in subprojects, define junction in top"
  );
}

#[test]
fn junction_only_in_subproject_resolves_there() {
  let fixture = Fixture::new(&[
    ("project/a.bst", local_junction("a").as_str()),
    ("project/a/project.conf", "name: a\n"),
    ("project/a/c.bst", local_junction("c").as_str()),
    ("project/a/c/project.conf", "name: c\n"),
    ("project/a/c/y.bst", "kind: manual\n"),
    ("project/a/x.bst", "kind: manual\ndepends:\n- c.bst:y.bst\n"),
    ("project/app.bst", "kind: manual\ndepends:\n- a.bst:x.bst\n"),
  ]);

  let app = &fixture.load(&["app.bst"]).unwrap()[0];
  let y = &app.dependencies[0].dependencies[0];
  assert_eq!(y.full_name, "a.bst:c.bst:y.bst");
  assert_eq!(y.project, "c");
}

#[test]
fn missing_toplevel_junction_fails() {
  let fixture = Fixture::new(&[("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n")]);
  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::MissingFile);
}

#[test]
fn depending_on_junction_fails() {
  let mut files: Vec<(&str, &str)> = BASE_PROJECT.to_vec();
  let junction = local_junction("base");
  files.push(("project/base.bst", junction.as_str()));
  files.push(("project/app.bst", "kind: manual\ndepends:\n- base.bst\n"));
  let fixture = Fixture::new(&files);

  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::InvalidData);
  assert!(err.to_string().contains("Cannot depend on junction"));
}

#[test]
fn junction_with_dependencies_fails() {
  let mut files: Vec<(&str, &str)> = BASE_PROJECT.to_vec();
  let junction = format!("{}depends:\n- other.bst\n", local_junction("base"));
  files.push(("project/base.bst", junction.as_str()));
  files.push(("project/other.bst", "kind: manual\n"));
  files.push(("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"));
  let fixture = Fixture::new(&files);

  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::InvalidData);
  assert!(err.to_string().contains("Junctions do not support dependencies"));
}

#[test]
fn non_junction_used_as_junction_fails() {
  let fixture = Fixture::new(&[
    ("project/base.bst", "kind: manual\n"),
    ("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"),
  ]);
  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.to_string(), "base.bst: Expected junction but element kind is manual");
}

#[test]
fn cyclic_non_junction_used_as_junction_fails() {
  let fixture = Fixture::new(&[
    ("project/base.bst", "kind: manual\ndepends:\n- other.bst\n"),
    ("project/other.bst", "kind: manual\ndepends:\n- base.bst\n"),
    ("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"),
  ]);
  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::InvalidData);
  assert_eq!(err.to_string(), "base.bst: Expected junction but element kind is manual");
}

#[test]
fn junction_without_project_conf_fails() {
  let fixture = Fixture::new(&[
    ("project/empty/readme", "nothing here\n"),
    ("project/base.bst", local_junction("empty").as_str()),
    ("project/app.bst", "kind: manual\ndepends:\n- base.bst:lib.bst\n"),
  ]);

  let err = fixture.load(&["app.bst"]).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::InvalidJunction);
  assert!(err.to_string().contains("Expecting a project at path '.'"));
}

#[test]
fn junction_target_redirects_to_nested_subproject() {
  let fixture = Fixture::new(&[
    ("project/mid.bst", local_junction("mid").as_str()),
    ("project/mid/project.conf", "name: mid\n"),
    ("project/mid/base.bst", local_junction("base").as_str()),
    ("project/mid/base/project.conf", "name: base\n"),
    ("project/mid/base/lib.bst", "kind: manual\n"),
    ("project/alias.bst", "kind: junction\nconfig:\n  target: mid.bst:base.bst\n"),
    ("project/app.bst", "kind: manual\ndepends:\n- alias.bst:lib.bst\n"),
  ]);

  let mut loader = fixture.loader(&["app.bst"]);
  let app = loader.load(false).unwrap().remove(0);
  let lib = &app.dependencies[0];
  assert_eq!(lib.project, "base");
  assert_eq!(lib.full_name, "mid.bst:base.bst:lib.bst");

  let mid = loader.junction_loader(LoaderId::ROOT, "mid.bst").unwrap();
  assert_eq!(
    loader.junction_loader(LoaderId::ROOT, "alias.bst"),
    loader.junction_loader(mid, "base.bst")
  );
  loader.cleanup();
}

/// A source whose consistency is configured with `state`, staging a
/// project with a single `lib.bst`.
struct FakeSource {
  state: Consistency,
  fetched: Arc<AtomicBool>,
}

impl Source for FakeSource {
  fn kind(&self) -> &str {
    "fake"
  }

  fn consistency(&self) -> Consistency {
    self.state
  }

  fn fetch(&mut self) -> Result<(), SourceError> {
    self.fetched.store(true, Ordering::SeqCst);
    self.state = Consistency::Cached;
    Ok(())
  }

  fn stage(&self, directory: &Path) -> Result<(), SourceError> {
    write_tree(directory, &[("project.conf", "name: fake\n"), ("lib.bst", "kind: manual\n")]);
    Ok(())
  }
}

fn fake_registry(fetched: Arc<AtomicBool>) -> SourceRegistry {
  let mut registry = SourceRegistry::with_defaults();
  registry.register("fake", move |source, _, _| {
    let state = match source.config.get_str("state")? {
      "inconsistent" => Consistency::Inconsistent,
      "resolved" => Consistency::Resolved,
      _ => Consistency::Cached,
    };
    let source: Box<dyn Source> = Box::new(FakeSource {
      state,
      fetched: Arc::clone(&fetched),
    });
    Ok(source)
  });
  registry
}

fn fake_fixture(state: &str) -> Fixture {
  let junction = format!("kind: junction\nsources:\n- kind: fake\n  state: {}\n", state);
  Fixture::new(&[
    ("project/fake.bst", junction.as_str()),
    ("project/app.bst", "kind: manual\ndepends:\n- fake.bst:lib.bst\n"),
  ])
}

#[test]
fn resolved_junction_needs_fetch() {
  let fixture = fake_fixture("resolved");
  let fetched = Arc::new(AtomicBool::new(false));
  let mut loader = fixture.loader(&["app.bst"]).with_sources(fake_registry(Arc::clone(&fetched)));

  let err = loader.load(false).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::SubprojectFetchNeeded);
  assert_eq!(err.detail().unwrap(), "Try fetching the project with `keel fetch fake.bst`");
  assert!(!fetched.load(Ordering::SeqCst));
  loader.cleanup();
}

#[test]
fn inconsistent_junction_needs_track() {
  let fixture = fake_fixture("inconsistent");
  let fetched = Arc::new(AtomicBool::new(false));
  let mut loader = fixture.loader(&["app.bst"]).with_sources(fake_registry(fetched));

  let err = loader.load(false).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::SubprojectInconsistent);
  loader.cleanup();
}

#[test]
fn resolved_junction_is_fetched_when_allowed() {
  let mut fixture = fake_fixture("resolved");
  fixture.context.fetch_subprojects = true;
  let fetched = Arc::new(AtomicBool::new(false));
  let ticks = RefCell::new(Vec::new());

  let mut loader = fixture.loader(&["app.bst"]).with_sources(fake_registry(Arc::clone(&fetched)));
  loader.set_ticker(|filename, message| {
    if let Some(message) = message {
      ticks.borrow_mut().push(format!("{}: {}", filename, message));
    }
  });
  let app = loader.load(false).unwrap().remove(0);
  loader.cleanup();
  drop(loader);

  assert!(fetched.load(Ordering::SeqCst));
  assert_eq!(app.dependencies[0].project, "fake");
  assert_eq!(*ticks.borrow(), vec!["fake.bst: Fetching subproject from fake source"]);
}

#[test]
fn save_requires_rewritable_load() {
  let fixture = Fixture::new(&[("project/app.bst", "kind: manual\nvariables:\n  prefix: /usr\n")]);

  let mut loader = fixture.loader(&["app.bst"]);
  loader.load(false).unwrap();
  let err = loader.element_node_mut("app.bst").unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::InvalidData);
  assert!(loader.save_element("app.bst").is_err());

  let mut loader = fixture.loader(&["app.bst"]);
  loader.load(true).unwrap();
  let node = loader.element_node_mut("app.bst").unwrap();
  node
    .get_mut("variables")
    .unwrap()
    .insert("prefix", Node::scalar("/opt", Provenance::new("app.bst")))
    .unwrap();
  loader.save_element("app.bst").unwrap();

  let saved = Node::load(&fixture.temp.path().join("project/app.bst"), "app.bst").unwrap();
  assert_eq!(saved.get_mapping("variables").unwrap().get_str("prefix").unwrap(), "/opt");
  assert_eq!(saved.get_str("kind").unwrap(), "manual");
}

#[test]
fn save_keeps_scalar_types() {
  let fixture = Fixture::new(&[(
    "project/app.bst",
    "kind: manual\nvariables:\n  jobs: 4\n  strict: true\n  prefix: /usr\n",
  )]);

  let mut loader = fixture.loader(&["app.bst"]);
  loader.load(true).unwrap();
  loader
    .element_node_mut("app.bst")
    .unwrap()
    .get_mut("variables")
    .unwrap()
    .insert("prefix", Node::scalar("/opt", Provenance::new("app.bst")))
    .unwrap();
  loader.save_element("app.bst").unwrap();

  let path = fixture.temp.path().join("project/app.bst");
  assert_eq!(
    fs::read_to_string(&path).unwrap(),
    "kind: manual\nvariables:\n  jobs: 4\n  strict: true\n  prefix: /opt\n"
  );
  let variables = Node::load(&path, "app.bst").unwrap().get_mapping("variables").unwrap().clone();
  assert_eq!(variables.get_int("jobs").unwrap(), 4);
  assert!(variables.get_bool("strict").unwrap());
}

#[test]
fn saving_unchanged_element_keeps_file() {
  let text = "# hello\nkind: manual\nvariables: {jobs: 4}\n";
  let fixture = Fixture::new(&[("project/app.bst", text)]);

  let mut loader = fixture.loader(&["app.bst"]);
  loader.load(true).unwrap();
  loader.save_element("app.bst").unwrap();

  assert_eq!(fs::read_to_string(fixture.temp.path().join("project/app.bst")).unwrap(), text);
}
