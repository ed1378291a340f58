//! Serializable types for the `hbir-v1` invocation record.
//!
//! Shared between the dispatch path, the emit/check binaries, and the test
//! suite. The structures mirror `schema/invocation_record.schema.json` so
//! helpers can round-trip JSON without re-parsing ad-hoc maps. When attaching
//! operation context, callers are expected to use snapshots from the spec
//! catalog resolved at runtime.

use crate::spec::{BridgeTag, CatalogKey, OperationId, OperationSnapshot, SpecKey};
use crate::schema_loader::{SchemaLoadOptions, SchemaLoadResult, load_json_schema};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

/// Version const carried by every record this crate emits.
pub const RECORD_SCHEMA_VERSION: &str = "hbir-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Full invocation record captured for a single bridge call.
///
/// This struct encodes the hbir-v1 contract: host metadata captured at
/// dispatch time plus the bridge/call/result blocks. `specs_schema_version`
/// names the catalog snapshot the embedded operation snapshot was resolved
/// against.
pub struct InvocationRecord {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs_schema_version: Option<CatalogKey>,
    pub host: HostInfo,
    pub bridge: BridgeInfo,
    pub call: CallInfo,
    pub result: OutcomeInfo,
    pub operation_context: OperationContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Environment metadata describing the embedding host.
///
/// All fields are optional except `os` and `host_tag`, which always carry a
/// platform description so downstream consumers can correlate records with
/// host characteristics.
pub struct HostInfo {
    #[serde(default)]
    pub embedder: Option<String>,
    #[serde(default)]
    pub context_id: Option<String>,
    pub os: String,
    pub host_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Identifiers that tie the record back to a registered bridge.
pub struct BridgeInfo {
    pub tag: BridgeTag,
    pub spec: SpecKey,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// The marshaled call as the embedding runtime issued it.
///
/// `args` defaults to an empty object to match the schema requirement that
/// the field always be a JSON object (never `null`).
pub struct CallInfo {
    pub operation: OperationId,
    #[serde(default = "empty_object")]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Normalized outcome of the call.
pub struct OutcomeInfo {
    pub status: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Operation signature captured alongside the record.
///
/// Snapshots denormalize catalog metadata so records remain self-describing
/// even if the catalog evolves after the run.
pub struct OperationContext {
    pub operation: OperationSnapshot,
}

impl InvocationRecord {
    /// Convenience accessor for the operation id recorded in the context
    /// snapshot.
    pub fn operation_id(&self) -> &OperationId {
        &self.operation_context.operation.id
    }
}

/// Errors that can occur while reading NDJSON record streams.
#[derive(Debug)]
pub enum RecordReadError {
    Io(std::io::Error),
    Parse {
        line: usize,
        error: serde_json::Error,
    },
}

impl fmt::Display for RecordReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordReadError::Io(err) => write!(f, "failed to read NDJSON stream: {err}"),
            RecordReadError::Parse { line, error } => {
                write!(f, "line {line}: unable to parse invocation record ({error})")
            }
        }
    }
}

impl std::error::Error for RecordReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordReadError::Io(err) => Some(err),
            RecordReadError::Parse { error, .. } => Some(error),
        }
    }
}

/// Read hbir-v1 invocation records from an NDJSON stream.
///
/// Lines containing only whitespace are skipped. Errors include the 1-based
/// line number where parsing failed to simplify diagnostics for callers.
pub fn read_invocation_records<R: BufRead>(
    reader: R,
) -> Result<Vec<InvocationRecord>, RecordReadError> {
    let mut records = Vec::new();
    let mut line_buf = String::new();
    let mut reader = reader;
    let mut line_number = 0usize;

    loop {
        line_buf.clear();
        let bytes = reader
            .read_line(&mut line_buf)
            .map_err(RecordReadError::Io)?;
        if bytes == 0 {
            break;
        }
        line_number += 1;
        let trimmed = line_buf.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<InvocationRecord>(trimmed).map_err(|error| {
            RecordReadError::Parse {
                line: line_number,
                error,
            }
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Compiled validator for the invocation record contract.
pub struct RecordSchema {
    loaded: SchemaLoadResult,
}

impl RecordSchema {
    /// Load and compile `schema/invocation_record.json`, rejecting
    /// unexpected record versions.
    pub fn load(path: &Path) -> Result<Self> {
        let allowed = BTreeSet::from_iter([RECORD_SCHEMA_VERSION.to_string()]);
        let loaded = load_json_schema(
            path,
            SchemaLoadOptions {
                allowed_versions: Some(&allowed),
                ..Default::default()
            },
        )?;
        Ok(Self { loaded })
    }

    pub fn version(&self) -> &str {
        &self.loaded.schema_version
    }

    /// Validate one serialized record, collecting every schema violation.
    pub fn validate(&self, value: &Value) -> Result<()> {
        if let Err(errors) = self.loaded.compiled.validate(value) {
            let details = errors
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            bail!("invocation record failed schema validation:\n{details}");
        }
        Ok(())
    }
}

/// Capture a `HostInfo` snapshot for the current process.
///
/// Environment overrides take precedence so embedders can label records;
/// `uname` supplies the platform description on unix with a portable
/// fallback elsewhere.
pub fn detect_host_info() -> HostInfo {
    let os = uname_description().unwrap_or_else(fallback_os_info);
    let os_name = uname_sysname().unwrap_or_else(fallback_os_name);
    let host_tag = resolve_host_tag(&os_name, env_non_empty("HOSTBRIDGE_HOST_TAG"));

    HostInfo {
        embedder: env_non_empty("HOSTBRIDGE_EMBEDDER"),
        context_id: env_non_empty("HOSTBRIDGE_CONTEXT"),
        os,
        host_tag,
    }
}

#[cfg(unix)]
fn uname_fields() -> Option<(String, String, String)> {
    use std::ffi::CStr;

    let mut buf: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut buf) } != 0 {
        return None;
    }
    let field = |ptr: *const libc::c_char| -> String {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    };
    Some((
        field(buf.sysname.as_ptr()),
        field(buf.release.as_ptr()),
        field(buf.machine.as_ptr()),
    ))
}

#[cfg(not(unix))]
fn uname_fields() -> Option<(String, String, String)> {
    None
}

fn uname_description() -> Option<String> {
    let (sysname, release, machine) = uname_fields()?;
    let description = format!("{sysname} {release} {machine}");
    if description.trim().is_empty() {
        None
    } else {
        Some(description)
    }
}

fn uname_sysname() -> Option<String> {
    let (sysname, _, _) = uname_fields()?;
    if sysname.is_empty() { None } else { Some(sysname) }
}

fn fallback_os_info() -> String {
    format!("{} {}", env::consts::OS, env::consts::ARCH)
}

fn fallback_os_name() -> String {
    match env::consts::OS {
        "macos" => "Darwin".to_string(),
        "linux" => "Linux".to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn resolve_host_tag(os_name: &str, env_tag: Option<String>) -> String {
    if let Some(tag) = env_tag {
        return tag;
    }
    match os_name {
        "Darwin" => "local-macos".to_string(),
        "Linux" => "local-linux".to_string(),
        _ => "local-unknown".to_string(),
    }
}

pub(crate) fn env_non_empty(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn empty_object() -> Value {
    // The hbir schema requires `args` to be a JSON object; default to an
    // empty map so callers never emit `null`.
    Value::Object(Default::default())
}
