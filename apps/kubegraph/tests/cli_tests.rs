//! Integration tests for manifest discovery, loading and the CLI commands.

use kubegraph::cli::{
    cmd_render, cmd_status, cmd_validate, collect_manifest_paths, file_key, load_workspace,
};
use kubegraph::config::{Config, LogFormat, ScanConfig};
use kubegraph_core::{KubegraphError, NodeId, RelationType};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
        - name: web
          image: nginx:1.25
"#;

const SERVICE: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
  ports:
    - port: 80
"#;

const BAD_SERVICE: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: broken
spec:
  selector:
    app: web
  ports:
    - port: 70000
"#;

fn write(dir: &Path, relative: &str, text: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(&path, text).expect("write");
    path
}

fn workspace() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "apps/deployment.yaml", DEPLOYMENT);
    write(dir.path(), "apps/nested/service.yml", SERVICE);
    write(dir.path(), "apps/README.md", "# not a manifest\n");
    dir
}

// =============================================================================
// DISCOVERY
// =============================================================================

#[test]
fn directories_are_scanned_recursively_by_extension() {
    let dir = workspace();
    let paths = collect_manifest_paths(&[dir.path().join("apps")], &ScanConfig::default())
        .expect("collect");

    let names: Vec<String> = paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["deployment.yaml", "service.yml"]);
}

#[test]
fn non_recursive_scan_stays_at_top_level() {
    let dir = workspace();
    let scan = ScanConfig {
        recursive: false,
        ..ScanConfig::default()
    };
    let paths = collect_manifest_paths(&[dir.path().join("apps")], &scan).expect("collect");
    assert_eq!(paths.len(), 1);
}

#[test]
fn explicit_files_are_taken_once() {
    let dir = workspace();
    let readme = dir.path().join("apps/README.md");
    let deployment = dir.path().join("apps/deployment.yaml");
    let paths = collect_manifest_paths(
        &[readme.clone(), deployment.clone(), deployment.clone()],
        &ScanConfig::default(),
    )
    .expect("collect");
    assert_eq!(paths, vec![readme, deployment]);
}

#[test]
fn missing_path_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let result = collect_manifest_paths(&[dir.path().join("nope")], &ScanConfig::default());
    assert!(matches!(result, Err(KubegraphError::IoError(_))));
}

// =============================================================================
// LOADING
// =============================================================================

#[test]
fn workspace_load_links_files_and_records_digests() {
    let dir = workspace();
    let (graph, report) =
        load_workspace(&[dir.path().join("apps")], &ScanConfig::default()).expect("load");

    assert_eq!(report.parsed, 2);
    assert_eq!(graph.node_count(), 2);
    assert!(graph.contains_edge(
        &NodeId::from("service/default/web"),
        &NodeId::from("deployment/default/web"),
        RelationType::Selector,
    ));

    let key = file_key(&dir.path().join("apps/deployment.yaml"));
    let record = graph.file(&key).expect("record");
    assert!(!record.dirty);
    assert_eq!(record.content, DEPLOYMENT);
    assert_eq!(record.sha.as_deref().map(str::len), Some(64));
}

#[test]
fn malformed_files_are_skipped_not_fatal() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "bad.yaml", "kind: [unclosed\n");
    write(dir.path(), "svc.yaml", SERVICE);

    let (graph, report) = load_workspace(&[dir.path().to_path_buf()], &ScanConfig::default())
        .expect("load");
    assert_eq!(graph.node_count(), 1);
    assert_eq!(report.parsed, 1);
    assert_eq!(report.skipped_malformed, 1);
}

// =============================================================================
// COMMANDS
// =============================================================================

#[test]
fn validate_passes_clean_workspace() {
    let dir = workspace();
    let passed = cmd_validate(&[dir.path().join("apps")], &ScanConfig::default(), true, false)
        .expect("validate");
    assert!(passed);
}

#[test]
fn validate_fails_on_errors() {
    let dir = workspace();
    write(dir.path(), "apps/broken.yaml", BAD_SERVICE);
    let passed = cmd_validate(&[dir.path().join("apps")], &ScanConfig::default(), false, false)
        .expect("validate");
    assert!(!passed);
}

#[test]
fn fail_on_warnings_turns_warnings_into_failure() {
    let dir = TempDir::new().expect("tempdir");
    // A Service whose selector reaches no workload only warns.
    write(dir.path(), "svc.yaml", SERVICE);
    let paths = [dir.path().to_path_buf()];

    assert!(cmd_validate(&paths, &ScanConfig::default(), true, false).expect("lenient"));
    assert!(!cmd_validate(&paths, &ScanConfig::default(), true, true).expect("strict"));
}

#[test]
fn render_writes_regenerated_manifest() {
    let dir = workspace();
    let source = dir.path().join("apps/deployment.yaml");
    let output = dir.path().join("rendered.yaml");

    cmd_render(
        &[dir.path().join("apps")],
        &ScanConfig::default(),
        &source,
        Some(&output),
        true,
    )
    .expect("render");

    let text = fs::read_to_string(&output).expect("read");
    let reparsed = kubegraph_core::Converter::parse(&text, "rendered.yaml");
    assert_eq!(reparsed.nodes.len(), 1);
    assert_eq!(reparsed.nodes[0].id.as_str(), "deployment/default/web");
    assert!(text.contains("apiVersion: apps/v1"));
}

#[test]
fn render_rejects_unloaded_file() {
    let dir = workspace();
    let result = cmd_render(
        &[dir.path().join("apps")],
        &ScanConfig::default(),
        Path::new("elsewhere.yaml"),
        None,
        true,
    );
    assert!(matches!(result, Err(KubegraphError::IoError(_))));
}

#[test]
fn status_runs_in_both_modes() {
    let dir = workspace();
    let paths = [dir.path().join("apps")];
    cmd_status(&paths, &ScanConfig::default(), true).expect("json");
    cmd_status(&paths, &ScanConfig::default(), false).expect("text");
}

// =============================================================================
// CONFIG FILES
// =============================================================================

#[test]
fn explicit_config_file_is_loaded() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        dir.path(),
        "kubegraph.toml",
        "[scan]\nextensions = [\"yaml\"]\nrecursive = false\n\n[log]\nformat = \"json\"\n",
    );

    let config = Config::load(Some(&path)).expect("load");
    assert_eq!(config.scan.extensions, vec!["yaml"]);
    assert!(!config.scan.recursive);
    assert_eq!(config.log.format, LogFormat::Json);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let result = Config::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(KubegraphError::IoError(_))));
}

#[test]
fn malformed_config_is_a_deserialization_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(dir.path(), "kubegraph.toml", "[scan\n");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(KubegraphError::DeserializationError(_))
    ));
}
