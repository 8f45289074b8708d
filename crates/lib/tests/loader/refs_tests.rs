use keel_lib::LoadErrorReason;
use keel_lib::projectrefs::ProjectRefs;

use super::common::TestEnv;

#[test]
fn refs_file_survives_save_and_reload() {
  let env = TestEnv::from_fixture("nested");
  env.write_file("project.refs", "projects:\n  app:\n    hello.bst:\n    - ref: 1234abcd\n");

  let mut refs = ProjectRefs::new(&env.project_dir(), "project.refs");
  refs.load().unwrap();
  let stored = refs.lookup_ref("app", "hello.bst", 0).unwrap();
  assert_eq!(stored.get_str("ref").unwrap(), "1234abcd");
  assert!(refs.lookup_ref("app", "hello.bst", 1).is_none());

  refs
    .lookup_ref_for_write("base", "runtime.bst", 0)
    .unwrap()
    .insert("ref", keel_lib::Node::scalar("feedbeef", keel_lib::node::Provenance::new("project.refs")))
    .unwrap();
  refs.save().unwrap();

  let mut reloaded = ProjectRefs::new(&env.project_dir(), "project.refs");
  reloaded.load().unwrap();
  assert_eq!(
    reloaded.lookup_ref("base", "runtime.bst", 0).unwrap().get_str("ref").unwrap(),
    "feedbeef"
  );
  assert_eq!(
    reloaded.lookup_ref("app", "hello.bst", 0).unwrap().get_str("ref").unwrap(),
    "1234abcd"
  );
}

#[test]
fn refs_file_with_unknown_key_is_rejected() {
  let env = TestEnv::from_fixture("nested");
  env.write_file("project.refs", "projects: {}\nextra: 1\n");

  let mut refs = ProjectRefs::new(&env.project_dir(), "project.refs");
  let err = refs.load().unwrap_err();
  assert_eq!(err.reason(), LoadErrorReason::InvalidData);
}
