//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands, plus the
//! file-system side of the engine: finding manifests, reading them and
//! writing regenerated text.

use crate::config::ScanConfig;
use kubegraph_core::{
    Converter, Graph, GraphSummary, KubegraphError, ParseReport, Severity, Validator,
    content_digest, graph_to_json,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of one manifest file (16 MB).
const MAX_MANIFEST_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path) -> Result<(), KubegraphError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        KubegraphError::IoError(format!("Cannot read metadata of '{}': {}", path.display(), e))
    })?;

    if metadata.len() > MAX_MANIFEST_FILE_SIZE {
        return Err(KubegraphError::IoError(format!(
            "File '{}' is {} bytes, more than the {} byte limit",
            path.display(),
            metadata.len(),
            MAX_MANIFEST_FILE_SIZE
        )));
    }
    Ok(())
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, KubegraphError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        KubegraphError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(KubegraphError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| KubegraphError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// MANIFEST DISCOVERY AND LOADING
// =============================================================================

/// Expand files and directories into the manifest files to load.
///
/// Files named explicitly are always taken. Directories contribute files
/// with a manifest extension, in path order.
pub fn collect_manifest_paths(
    paths: &[PathBuf],
    scan: &ScanConfig,
) -> Result<Vec<PathBuf>, KubegraphError> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut in_dir = Vec::new();
            walk_dir(path, scan, &mut in_dir)?;
            in_dir.sort();
            found.extend(in_dir);
        } else if path.is_file() {
            found.push(path.clone());
        } else {
            return Err(KubegraphError::IoError(format!(
                "Path '{}' does not exist",
                path.display()
            )));
        }
    }

    let mut unique = Vec::with_capacity(found.len());
    for path in found {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    Ok(unique)
}

fn walk_dir(dir: &Path, scan: &ScanConfig, out: &mut Vec<PathBuf>) -> Result<(), KubegraphError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        KubegraphError::IoError(format!("Cannot read directory '{}': {}", dir.display(), e))
    })?;

    for entry in entries {
        let path = entry
            .map_err(|e| KubegraphError::IoError(e.to_string()))?
            .path();
        if path.is_dir() {
            if scan.recursive {
                walk_dir(&path, scan, out)?;
            }
        } else if scan.matches(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Key a file is tracked under in the graph.
pub fn file_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Load every manifest under `paths` into a fresh store and infer edges.
///
/// Each file's version token is the digest of its text.
pub fn load_workspace(
    paths: &[PathBuf],
    scan: &ScanConfig,
) -> Result<(Graph, ParseReport), KubegraphError> {
    let mut graph = Graph::new();
    let mut report = ParseReport::default();

    for path in collect_manifest_paths(paths, scan)? {
        validate_file_size(&path)?;
        let text = std::fs::read_to_string(&path).map_err(|e| {
            KubegraphError::IoError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        let sha = content_digest(&text);
        let file_report = Converter::ingest(&mut graph, &text, &file_key(&path), Some(sha));
        report.absorb(&file_report);
    }

    Converter::infer_edges(&mut graph);
    tracing::info!(
        files = graph.files().count(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        skipped = report.skipped(),
        "workspace loaded"
    );
    Ok((graph, report))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), KubegraphError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| KubegraphError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// GRAPH COMMAND
// =============================================================================

/// Print the graph snapshot.
pub fn cmd_graph(paths: &[PathBuf], scan: &ScanConfig) -> Result<(), KubegraphError> {
    let (graph, _) = load_workspace(paths, scan)?;
    println!("{}", graph_to_json(&graph)?);
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Validate and print findings. Returns whether the run passed.
pub fn cmd_validate(
    paths: &[PathBuf],
    scan: &ScanConfig,
    json_mode: bool,
    fail_on_warnings: bool,
) -> Result<bool, KubegraphError> {
    let (graph, _) = load_workspace(paths, scan)?;
    let findings = Validator::run(&graph);

    let errors = findings.count(Severity::Error);
    let warnings = findings.count(Severity::Warning);
    let passed = errors == 0 && (!fail_on_warnings || warnings == 0);

    if json_mode {
        print_json(&serde_json::json!({
            "valid": findings.is_valid(),
            "passed": passed,
            "errors": errors,
            "warnings": warnings,
            "findings": findings,
        }))?;
        return Ok(passed);
    }

    for finding in findings.iter() {
        if finding.file_path.is_empty() {
            println!("{}", finding);
        } else {
            println!("{}: {}", finding.file_path, finding);
        }
    }
    println!(
        "{} node(s) checked: {} error(s), {} warning(s)",
        graph.node_count(),
        errors,
        warnings
    );

    Ok(passed)
}

// =============================================================================
// RENDER COMMAND
// =============================================================================

/// Regenerate one loaded file, to stdout or to `output`.
pub fn cmd_render(
    paths: &[PathBuf],
    scan: &ScanConfig,
    file: &Path,
    output: Option<&Path>,
    quiet: bool,
) -> Result<(), KubegraphError> {
    let (graph, _) = load_workspace(paths, scan)?;
    let key = file_key(file);
    if graph.file(&key).is_none() {
        return Err(KubegraphError::IoError(format!(
            "File '{}' is not among the loaded manifests",
            key
        )));
    }

    let text = Converter::to_manifest_text(&graph, &key)?;

    match output {
        Some(output) => {
            let target = validate_output_path(output)?;
            std::fs::write(&target, &text).map_err(|e| {
                KubegraphError::IoError(format!("Cannot write '{}': {}", target.display(), e))
            })?;
            if !quiet {
                eprintln!("Wrote {} ({} bytes)", target.display(), text.len());
            }
        }
        None => print!("{}", text),
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph status.
pub fn cmd_status(
    paths: &[PathBuf],
    scan: &ScanConfig,
    json_mode: bool,
) -> Result<(), KubegraphError> {
    let (graph, report) = load_workspace(paths, scan)?;
    let summary = GraphSummary::from_graph(&graph);

    if json_mode {
        return print_json(&serde_json::json!({
            "summary": summary,
            "parse": report,
        }));
    }

    println!("kubegraph Status");
    println!("================");
    println!("Files:     {}", summary.file_count);
    println!("Nodes:     {}", summary.node_count);
    println!("Edges:     {}", summary.edge_count);
    println!(
        "Documents: {} parsed, {} skipped",
        report.parsed,
        report.skipped()
    );

    if !summary.kinds.is_empty() {
        println!();
        println!("Kinds:");
        for (kind, count) in &summary.kinds {
            println!("  {:<24} {}", kind, count);
        }
    }
    if !summary.relations.is_empty() {
        println!();
        println!("Relations:");
        for (relation, count) in &summary.relations {
            println!("  {:<24} {}", relation, count);
        }
    }

    Ok(())
}
