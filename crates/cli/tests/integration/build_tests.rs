//! Build command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

const CSS_RULES: &str = r#"{
  "rules": [
    { "pattern": "**/*.css", "loaders": [{ "loader": "css", "options": { "keep-content": false } }] },
    { "pattern": "**/*.json", "exclude": ["**/package.json"], "loaders": ["json"] }
  ]
}"#;

#[test]
fn build_copies_and_transforms() {
  let env = TestEnv::project(&[]);
  env.write_config(CSS_RULES);
  env.write_file("src/index.js", "console.log(1);");
  env.write_file("src/widget.css", ".w {}");
  env.write_file("src/data.json", r#"{"a":1}"#);

  env
    .bundler_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete"));

  assert_eq!(
    std::fs::read_to_string(env.output_path("index.js")).unwrap(),
    "console.log(1);"
  );
  assert!(env.output_path("widget.css.js").exists());
  assert!(!env.output_path("widget.css").exists());
  assert!(env.output_path("data.json.js").exists());
  assert!(env.output_path("package.json").exists());
}

#[test]
fn build_places_dependencies_under_node_modules() {
  let env = TestEnv::project(&[("foo", "^1.0.0")]);
  env.write_package("node_modules/foo@1.0.0", "foo", "1.0.0", &[]);
  env.write_package("node_modules/foo@1.2.0", "foo", "1.2.0", &[]);
  env.write_file("node_modules/foo@1.2.0/index.js", "module.exports = 1;");

  env.bundler_cmd().arg("build").assert().success();

  assert!(env.output_path("node_modules/foo@1.2.0/index.js").exists());
  assert!(!env.output_path("node_modules/foo@1.0.0").exists());
}

#[test]
fn second_build_is_incremental() {
  let env = TestEnv::project(&[]);
  env.write_file("src/index.js", "1");

  env.bundler_cmd().arg("build").assert().success();

  env
    .bundler_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Incremental build"))
    .stdout(predicate::str::contains("Packages processed: 0"));
}

#[test]
fn full_flag_reprocesses_everything() {
  let env = TestEnv::project(&[]);
  env.write_file("src/index.js", "1");

  env.bundler_cmd().arg("build").assert().success();

  env
    .bundler_cmd()
    .args(["build", "--full"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Incremental build").not())
    .stdout(predicate::str::contains("Packages processed: 1"));
}

#[test]
fn failing_loader_reports_every_error_and_exits_nonzero() {
  let env = TestEnv::project(&[]);
  env.write_config(r#"{ "rules": [{ "pattern": "**/*.json", "loaders": ["json"] }] }"#);
  env.write_file("src/a.json", "{ broken");
  env.write_file("src/b.json", "also broken");
  env.write_file("src/c.js", "fine");

  env
    .bundler_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("src/a.json"))
    .stderr(predicate::str::contains("src/b.json"))
    .stderr(predicate::str::contains("in 'json'"))
    .stderr(predicate::str::contains("2 file(s)"));

  assert!(env.output_path("c.js").exists());
  let manifest: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(env.output_path(".bundler-manifest.json")).unwrap()).unwrap();
  assert!(manifest["packages"].as_object().unwrap().is_empty());
}

#[test]
fn warnings_point_to_report() {
  let env = TestEnv::project(&[]);
  env.write_config(r#"{ "rules": [{ "pattern": "**/*.vue", "loaders": ["sfc"] }] }"#);
  env.write_file("src/c.vue", "<script>x</script><style scoped>a {}</style>");

  env
    .bundler_cmd()
    .args(["build", "--report-file", "report.json"])
    .assert()
    .success()
    .stderr(predicate::str::contains("There are errors/warnings for some loaders"))
    .stderr(predicate::str::contains("report.json"));

  let report = std::fs::read_to_string(env.temp.path().join("report.json")).unwrap();
  assert!(report.contains("Scoped styles are not supported"));
}

#[test]
fn output_override_is_honored() {
  let env = TestEnv::project(&[]);
  env.write_file("src/index.js", "1");

  env.bundler_cmd().args(["build", "--output", "dist"]).assert().success();

  assert!(env.temp.path().join("dist/index.js").exists());
  assert!(env.temp.path().join("dist/.bundler-manifest.json").exists());
}

#[test]
fn json_output_is_parseable() {
  let env = TestEnv::project(&[]);
  env.write_file("src/index.js", "1");

  let output = env
    .bundler_cmd()
    .args(["--output-format", "json", "build"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["success"], true);
  assert_eq!(json["processed"][0], "app@1.0.0");
}

#[test]
fn clean_removes_output() {
  let env = TestEnv::project(&[]);
  env.write_file("src/index.js", "1");

  env.bundler_cmd().arg("build").assert().success();
  env
    .bundler_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed"));

  assert!(!env.output_path("index.js").exists());
  env
    .bundler_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to clean"));
}
