use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::spec::{OperationDecl, OperationId, SpecIndex, SpecKey};
use crate::validation::KNOWN_STATUSES;

#[derive(Default, Clone)]
/// Builder for result values that enforces "single source of truth" rules.
///
/// The CLI is allowed to specify either a JSON file or an inline value;
/// mixing both is a contract violation because it makes emitted records
/// ambiguous.
pub struct ValueArgs {
    value_file: Option<PathBuf>,
    inline: Option<String>,
}

impl ValueArgs {
    pub fn set_value_file(&mut self, path: PathBuf) -> Result<()> {
        if self.value_file.is_some() {
            bail!("--value-file provided multiple times");
        }
        self.value_file = Some(path);
        Ok(())
    }

    pub fn set_inline(&mut self, raw: String) -> Result<()> {
        if self.inline.is_some() {
            bail!("--value-json provided multiple times");
        }
        self.inline = Some(raw);
        Ok(())
    }

    pub fn build(self) -> Result<Option<Value>> {
        match (self.value_file, self.inline) {
            (Some(_), Some(_)) => {
                bail!("--value-file cannot be combined with --value-json")
            }
            (Some(path), None) => {
                if !path.is_file() {
                    bail!("Value file not found: {}", path.display());
                }
                read_json_file(&path).map(Some)
            }
            (None, Some(raw)) => {
                let value: Value =
                    serde_json::from_str(&raw).context("Invalid JSON for --value-json")?;
                Ok(Some(value))
            }
            (None, None) => Ok(None),
        }
    }
}

#[derive(Default, Clone)]
/// Merge-friendly JSON object builder used for call arguments.
pub struct JsonObjectBuilder {
    sources: Vec<JsonValueSource>,
}

impl JsonObjectBuilder {
    pub fn merge_json_string(&mut self, raw: &str, label: &str) -> Result<()> {
        let value: Value =
            serde_json::from_str(raw).with_context(|| format!("Invalid JSON for {label}"))?;
        self.push_object(value, label)
    }

    pub fn merge_json_file(&mut self, path: &Path, label: &str) -> Result<()> {
        if !path.is_file() {
            bail!("{label} file not found: {}", path.display());
        }
        let value = read_json_file(path)?;
        self.push_object(value, label)
    }

    fn push_object(&mut self, value: Value, label: &str) -> Result<()> {
        match value {
            Value::Object(map) => {
                self.sources.push(JsonValueSource::MergeObject(map));
                Ok(())
            }
            _ => bail!("{label} must be a JSON object"),
        }
    }

    pub fn insert_string(&mut self, key: String, value: String) {
        self.sources.push(JsonValueSource::SetField {
            key,
            value: Value::String(value),
        });
    }

    pub fn insert_json_value(&mut self, key: String, raw: String, label: &str) -> Result<()> {
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON for {label} value {key}"))?;
        self.sources.push(JsonValueSource::SetField { key, value });
        Ok(())
    }

    /// Later sources win on key collisions, matching CLI flag order.
    pub fn build(&self) -> Value {
        let mut map: Map<String, Value> = Map::new();
        for source in &self.sources {
            match source {
                JsonValueSource::MergeObject(obj) => {
                    for (key, value) in obj {
                        map.insert(key.clone(), value.clone());
                    }
                }
                JsonValueSource::SetField { key, value } => {
                    map.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Object(map)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[derive(Clone)]
enum JsonValueSource {
    MergeObject(Map<String, Value>),
    SetField { key: String, value: Value },
}

fn read_json_file(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).context("File contained invalid JSON")
}

pub fn validate_status(status: &str) -> Result<()> {
    if KNOWN_STATUSES.contains(&status) {
        return Ok(());
    }
    bail!("Unknown status: {status} (expected success|rejected|error)")
}

/// Enforce the pairing between status and error fields.
///
/// Success records must not carry error metadata; rejected/error records
/// must name a code so downstream consumers can classify without parsing
/// detail text.
pub fn check_outcome_consistency(
    status: &str,
    error_code: Option<&str>,
    error_detail: Option<&str>,
) -> Result<()> {
    match status {
        "success" => {
            if error_code.is_some() || error_detail.is_some() {
                bail!("success records must not carry error_code/error_detail");
            }
        }
        _ => {
            if error_code.is_none() {
                bail!("{status} records must carry an error_code");
            }
        }
    }
    Ok(())
}

/// Resolve and validate a spec/operation reference against the catalog.
pub fn validate_operation_ref<'a>(
    specs: &'a SpecIndex,
    spec_key: &SpecKey,
    operation: &OperationId,
) -> Result<&'a OperationDecl> {
    let Some(spec) = specs.spec(spec_key) else {
        bail!(
            "Unknown spec key: {}. Expected one of the keys in schema/specs.json.",
            spec_key.0
        );
    };
    spec.operation(operation).ok_or_else(|| {
        anyhow::anyhow!(
            "Spec {} declares no operation named '{}'",
            spec_key.0,
            operation.0
        )
    })
}
