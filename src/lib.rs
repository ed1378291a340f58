//! Shared library for the hostbridge harness.
//!
//! The crate exposes common types (invocation records, spec catalogs, the
//! bridge contract) and utilities used by the helper binaries. Public
//! functions here form the contract that the binaries depend on: bundle root
//! discovery, helper binary resolution, catalog path defaults, and JSON
//! parsing helpers that mirror the record-check expectations.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub mod boundary;
pub mod bridge;
pub mod coverage;
pub mod emit_support;
pub mod host;
pub mod spec;
pub mod validation;
mod schema_loader;

pub use boundary::{
    BridgeInfo, CallInfo, HostInfo, InvocationRecord, OperationContext, OutcomeInfo,
    RECORD_SCHEMA_VERSION, RecordReadError, RecordSchema, detect_host_info,
    read_invocation_records,
};
pub use bridge::{BridgeRegistry, CapabilityBridge, FoundationModels, InvokeError};
pub use coverage::{
    CoverageEntry, build_operation_coverage_map, filter_coverage_records,
    validate_coverage_against_index,
};
pub use host::HostContext;
pub use spec::{
    BridgeSpec, BridgeTag, CatalogKey, OperationDecl, OperationId, OperationSnapshot, ParamDecl,
    SpecCatalog, SpecIndex, SpecKey, SpecRepository, ValueKind, load_catalog_from_path,
};
pub use validation::{KNOWN_STATUSES, validate_record_values, validate_registry};

const ROOT_SENTINEL: &str = "schema/specs.json";
const MANIFEST: &str = "Cargo.toml";
const SYNCED_BIN_DIR: &str = "bin";

/// Returns true when `candidate` looks like the bundle root.
///
/// Root detection is intentionally strict: helpers rely on the shipped
/// catalog and manifest to avoid walking past the workspace boundary.
fn is_bundle_root(candidate: &Path) -> bool {
    candidate.join(ROOT_SENTINEL).is_file() && candidate.join(MANIFEST).is_file()
}

/// Verifies that an explicit `HOSTBRIDGE_ROOT` hint points at a valid bundle.
fn bundle_root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.is_empty() {
        return None;
    }
    let hint_path = PathBuf::from(hint);
    if !hint_path.exists() || !is_bundle_root(&hint_path) {
        return None;
    }
    fs::canonicalize(hint_path).ok()
}

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if is_bundle_root(&dir) {
            return Some(dir);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the bundle root using the harness contract.
///
/// Search order: honor `HOSTBRIDGE_ROOT` if it points at a real bundle, fall
/// back to climbing up from the current executable, then use the build-time
/// hint. Callers can treat failure as fatal because the binaries cannot run
/// without the catalog layout.
pub fn find_bundle_root() -> Result<PathBuf> {
    if let Ok(env_root) = env::var("HOSTBRIDGE_ROOT") {
        if let Some(root) = bundle_root_from_hint(&env_root) {
            return Ok(root);
        }
    }

    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            if let Some(root) = search_upwards(exe_dir) {
                return Ok(root);
            }
        }
    }

    if let Some(hint) = option_env!("HOSTBRIDGE_ROOT_HINT") {
        if let Some(root) = bundle_root_from_hint(hint) {
            return Ok(root);
        }
    }

    bail!(
        "Unable to locate hostbridge bundle root. Set HOSTBRIDGE_ROOT to the cloned repository."
    );
}

/// Path of the shipped spec catalog within a bundle.
pub fn default_catalog_path(bundle_root: &Path) -> PathBuf {
    bundle_root.join(ROOT_SENTINEL)
}

/// Path of the invocation record schema within a bundle.
pub fn resolve_record_schema_path(bundle_root: &Path) -> PathBuf {
    bundle_root.join("schema/invocation_record.schema.json")
}

/// Resolve another helper binary within the same bundle.
///
/// Prefers the synced `bin/` artifacts when present, then falls back to
/// Cargo build outputs. `HOSTBRIDGE_PREFER_TARGET` flips the order so local
/// builds win during development.
pub fn resolve_helper_binary(bundle_root: &Path, name: &str) -> Result<PathBuf> {
    let prefer_target = env::var("HOSTBRIDGE_PREFER_TARGET")
        .ok()
        .map(|v| !v.trim().is_empty() && v != "0")
        .unwrap_or(false);

    let target_release = bundle_root.join("target").join("release").join(name);
    let target_debug = bundle_root.join("target").join("debug").join(name);
    let synced = bundle_root.join(SYNCED_BIN_DIR).join(name);

    let mut candidates: Vec<PathBuf> = if prefer_target {
        vec![target_release.clone(), target_debug.clone(), synced.clone()]
    } else {
        vec![synced.clone(), target_release.clone(), target_debug.clone()]
    };

    // Always include the remaining fallbacks to avoid missing an executable
    // when env-based ordering changes.
    candidates.push(target_release);
    candidates.push(target_debug);
    candidates.push(synced);

    for candidate in candidates {
        if helper_is_executable(&candidate) {
            return Ok(candidate);
        }
    }

    bail!(
        "Unable to locate helper '{name}' under {}. Run 'cargo build --bins' first.",
        bundle_root.display()
    )
}

/// Returns true when a file exists and has any execute bit set.
pub fn helper_is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            return meta.permissions().mode() & 0o111 != 0;
        }
        false
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Find an executable by name somewhere on PATH.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    for dir in env::split_paths(&paths) {
        let candidate = dir.join(name);
        if helper_is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Split comma- or whitespace-delimited configuration lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an hbir stream from stdin, accepting either NDJSON or a JSON array.
///
/// The parser mirrors the record-check contract: empty input is an error,
/// single records or arrays are accepted, and NDJSON streams are parsed
/// line-by-line so partial writes do not break the whole run.
pub fn parse_record_stream(input: &str) -> Result<Vec<InvocationRecord>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("No input provided on stdin");
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<_>, _>>()
                .context("Unable to parse JSON array of invocation records"),
            Value::Object(_) => serde_json::from_value(value)
                .map(|record| vec![record])
                .context("Unable to parse invocation record"),
            _ => bail!("Unsupported JSON input; expected object or array"),
        };
    }

    let mut records = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: InvocationRecord = serde_json::from_str(line)
            .with_context(|| format!("Unable to parse invocation record from line {}", idx + 1))?;
        records.push(record);
    }

    if records.is_empty() {
        bail!("No invocation records found in input stream");
    }

    Ok(records)
}
