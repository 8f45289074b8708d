use std::sync::Arc;

use keel_lib::loader::{LoaderId, dependency_order};
use keel_lib::{LoadErrorReason, Loader};

use super::common::TestEnv;

#[test]
fn nested_project_loads_through_junction() {
  let env = TestEnv::from_fixture("nested");
  let mut loader = Loader::new(&env.context, env.project(), ["hello.bst"]).unwrap();
  let targets = loader.load(false).unwrap();

  let hello = &targets[0];
  assert_eq!(hello.project, "app");
  assert_eq!(hello.kind, "autotools");
  assert_eq!(hello.variables.get_str("prefix").unwrap(), "/usr");
  assert_eq!(hello.sources.len(), 1);
  assert_eq!(hello.sources[0].directory.as_deref(), Some("src"));

  let build: Vec<&str> = hello.build_dependencies.iter().map(|e| e.full_name.as_str()).collect();
  assert_eq!(build, vec!["base.bst:runtime.bst", "tools/make.bst"]);
  let runtime: Vec<&str> = hello.dependencies.iter().map(|e| e.full_name.as_str()).collect();
  assert_eq!(runtime, vec!["base.bst:runtime.bst"]);

  let make = &hello.build_dependencies[1];
  assert!(make.build_dependencies.is_empty());
  assert!(Arc::ptr_eq(&make.dependencies[0], &hello.dependencies[0]));
  assert_eq!(make.dependencies[0].project, "base");

  let base = loader.junction_loader(LoaderId::ROOT, "base.bst").unwrap();
  assert_eq!(loader.project(base).options["arch"], "aarch64");

  loader.cleanup();
  assert_eq!(env.builddir_entries(), 0);
}

#[test]
fn dependency_order_lists_dependencies_first() {
  let env = TestEnv::from_fixture("nested");
  let mut loader = Loader::new(&env.context, env.project(), ["hello.bst", "tools/make.bst"]).unwrap();
  let targets = loader.load(false).unwrap();
  loader.cleanup();

  let order: Vec<String> = dependency_order(&targets).iter().map(|e| e.full_name.clone()).collect();
  assert_eq!(order, vec!["base.bst:runtime.bst", "tools/make.bst", "hello.bst"]);
}

#[test]
fn graph_serializes_to_json() {
  let env = TestEnv::from_fixture("nested");
  let mut loader = Loader::new(&env.context, env.project(), ["hello.bst"]).unwrap();
  let targets = loader.load(false).unwrap();
  loader.cleanup();

  let json = serde_json::to_value(&*targets[0]).unwrap();
  assert_eq!(json["full_name"], "hello.bst");
  assert_eq!(json["build_dependencies"], serde_json::json!(["base.bst:runtime.bst", "tools/make.bst"]));
  assert_eq!(json["sources"][0]["kind"], "local");
  assert_eq!(json["sources"][0]["config"]["path"], "files/hello");
}

#[test]
fn user_overrides_beat_junction_options() {
  let mut env = TestEnv::from_fixture("nested");
  env.context = keel_lib::Context::from_yaml(&format!(
    "builddir: '{}'\nprojects:\n  base:\n    options:\n      arch: x86_64\n",
    env.builddir().display()
  ))
  .unwrap();

  let mut loader = Loader::new(&env.context, env.project(), ["hello.bst"]).unwrap();
  loader.load(false).unwrap();
  let base = loader.junction_loader(LoaderId::ROOT, "base.bst").unwrap();
  assert_eq!(loader.project(base).options["arch"], "x86_64");
  loader.cleanup();
}

#[test]
fn broken_subproject_is_cleaned_up() {
  let env = TestEnv::from_fixture("nested");
  env.write_file("subprojects/base/runtime.bst", "kind: import\ndepends:\n- missing.bst\n");

  let mut loader = Loader::new(&env.context, env.project(), ["hello.bst"]).unwrap();
  let err = loader.load(false).unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::MissingFile);

  assert_eq!(env.builddir_entries(), 1);
  loader.cleanup();
  assert_eq!(env.builddir_entries(), 0);
}

#[test]
fn junction_cycle_across_projects_fails() {
  let env = TestEnv::from_fixture("nested");
  env.write_file("subprojects/base/runtime.bst", "kind: import\ndepends:\n- loop.bst\n");
  env.write_file("subprojects/base/loop.bst", "kind: import\ndepends:\n- runtime.bst\n");

  let mut loader = Loader::new(&env.context, env.project(), ["hello.bst"]).unwrap();
  let err = loader.load(false).unwrap_err();
  loader.cleanup();
  assert_eq!(err.reason(), LoadErrorReason::CircularDependency);
}
