//! Integration tests for the read-only commands: deps, status and rules.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn deps_lists_root_and_dependencies() {
  let env = TestEnv::project(&[("foo", "^1.0.0")]);
  env.write_package("node_modules/foo", "foo", "1.1.0", &[]);

  env
    .bundler_cmd()
    .arg("deps")
    .assert()
    .success()
    .stdout(predicate::str::contains("2 package(s)"))
    .stdout(predicate::str::contains("app@1.0.0 (root)"))
    .stdout(predicate::str::contains("foo@1.1.0"));
}

#[test]
fn deps_fails_on_unsatisfied_range() {
  let env = TestEnv::project(&[("foo", "^2.0.0")]);
  env.write_package("node_modules/foo", "foo", "1.1.0", &[]);

  env
    .bundler_cmd()
    .arg("deps")
    .assert()
    .failure()
    .stderr(predicate::str::contains("foo@^2.0.0"))
    .stderr(predicate::str::contains("installed: 1.1.0"));
}

#[test]
fn status_tracks_changes() {
  let env = TestEnv::project(&[]);
  env.write_file("src/index.js", "1");

  env
    .bundler_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("To rebuild: 1"));

  env.bundler_cmd().arg("build").assert().success();
  env
    .bundler_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("Everything is up to date"));

  env.write_file("src/index.js", "2");
  env
    .bundler_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("app@1.0.0"));
}

#[test]
fn rules_prints_concatenated_chains() {
  let env = TestEnv::project(&[]);
  env.write_config(
    r#"{ "rules": [
      { "pattern": "**/*.css", "loaders": ["css"] },
      { "pattern": "src/**", "loaders": ["remove-hash"] }
    ] }"#,
  );

  env
    .bundler_cmd()
    .args(["rules", "src/app.css", "src/logo.png", "README.md"])
    .assert()
    .success()
    .stdout(predicate::str::contains("src/app.css → css [utf-8] | remove-hash [binary]"))
    .stdout(predicate::str::contains("src/logo.png → remove-hash [binary]"))
    .stdout(predicate::str::contains("README.md → (copied verbatim)"));
}

#[test]
fn unknown_loader_is_a_configuration_error() {
  let env = TestEnv::project(&[]);
  env.write_config(r#"{ "rules": [{ "pattern": "**/*.ts", "loaders": ["typescript"] }] }"#);

  env
    .bundler_cmd()
    .args(["rules", "src/a.ts"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown loader 'typescript'"));
}

#[test]
fn malformed_config_is_reported() {
  let env = TestEnv::project(&[]);
  env.write_config("{ nope");

  env
    .bundler_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("bundler.json"));
}
