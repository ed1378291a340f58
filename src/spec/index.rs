//! Indexed view of a spec catalog instance.
//!
//! The index enforces the expected catalog schema version and provides fast
//! lookup by spec key and operation id. It is intentionally strict about
//! duplicates and unknown value kinds so helper binaries cannot silently
//! consume mismatched catalogs.

use crate::schema_loader::{SchemaLoadOptions, load_json_schema};
use crate::spec::identity::{CatalogKey, OperationId, SpecKey};
use crate::spec::model::{BridgeSpec, OperationDecl, SpecCatalog, load_catalog_from_path};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

// The harness currently ships a single catalog; reject unexpected versions
// rather than risk emitting records with mismatched metadata.
const DEFAULT_SCHEMA_VERSION: &str = "host_specs_v1";

#[derive(Debug)]
/// Spec catalog plus a derived index keyed by spec key.
pub struct SpecIndex {
    catalog_key: CatalogKey,
    catalog: SpecCatalog,
    by_key: BTreeMap<SpecKey, BridgeSpec>,
}

impl SpecIndex {
    /// Load and validate the catalog from disk.
    ///
    /// Validates against the catalog JSON Schema, checks the catalog key, and
    /// builds a deterministic BTreeMap for keyed lookups.
    pub fn load(path: &Path) -> Result<Self> {
        validate_against_schema(path)?;

        let catalog =
            load_catalog_from_path(path).with_context(|| format!("loading {}", path.display()))?;
        validate_catalog_key(&catalog.key)?;
        let by_key = build_index(&catalog)?;
        Ok(Self {
            catalog_key: catalog.key.clone(),
            catalog,
            by_key,
        })
    }

    /// The catalog key declared in the loaded file.
    pub fn key(&self) -> &CatalogKey {
        &self.catalog_key
    }

    /// Resolve a spec by key.
    ///
    /// Returns `None` instead of erroring; callers surface errors with the
    /// CLI context that referenced the missing key.
    pub fn spec(&self, key: &SpecKey) -> Option<&BridgeSpec> {
        self.by_key.get(key)
    }

    /// Resolve an operation declaration inside a spec.
    pub fn operation(&self, key: &SpecKey, id: &OperationId) -> Option<&OperationDecl> {
        self.spec(key)?.operation(id)
    }

    /// Iterates spec keys in stable order.
    pub fn keys(&self) -> impl Iterator<Item = &SpecKey> {
        self.by_key.keys()
    }

    /// Access the underlying catalog (scope, docs, etc.).
    pub fn catalog(&self) -> &SpecCatalog {
        &self.catalog
    }
}

fn validate_catalog_key(key: &CatalogKey) -> Result<()> {
    if key.0.is_empty() {
        bail!("catalog schema_version must not be empty");
    }

    if !key
        .0
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        bail!(
            "catalog schema_version must match ^[A-Za-z0-9_.-]+$, got {}",
            key.0
        );
    }

    let allowed = allowed_schema_versions();
    if !allowed.contains(&key.0) {
        bail!(
            "catalog schema_version '{}' not in allowed set {:?}",
            key.0,
            allowed
        );
    }

    Ok(())
}

fn allowed_schema_versions() -> BTreeSet<String> {
    BTreeSet::from_iter([default_catalog_schema_version()])
}

fn default_catalog_schema_version() -> String {
    catalog_schema_version_from_disk().unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string())
}

fn catalog_schema_version_from_disk() -> Option<String> {
    let path = canonical_catalog_schema_path();
    let file = File::open(path).ok()?;
    let value: Value = serde_json::from_reader(BufReader::new(file)).ok()?;
    value
        .pointer("/properties/schema_version/const")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn canonical_catalog_schema_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schema/spec_catalog.schema.json")
}

fn build_index(catalog: &SpecCatalog) -> Result<BTreeMap<SpecKey, BridgeSpec>> {
    if catalog.specs.is_empty() {
        bail!("catalog contains no specs");
    }

    let kind_ids: BTreeSet<String> = catalog.scope.kinds.keys().cloned().collect();
    if kind_ids.is_empty() {
        bail!("catalog scope must define at least one value kind");
    }

    let doc_keys: BTreeSet<String> = catalog.docs.keys().cloned().collect();

    let mut map = BTreeMap::new();
    for spec in &catalog.specs {
        if spec.id.0.trim().is_empty() {
            bail!("encountered spec with no id");
        }
        if map.contains_key(&spec.id) {
            bail!("duplicate spec key {}", spec.id.0);
        }
        if spec.operations.is_empty() {
            bail!("spec {} declares no operations", spec.id.0);
        }

        let mut op_ids: BTreeSet<&str> = BTreeSet::new();
        for op in &spec.operations {
            if op.id.0.trim().is_empty() {
                bail!("spec {} declares an operation with no id", spec.id.0);
            }
            if !op_ids.insert(op.id.as_str()) {
                bail!("spec {} declares duplicate operation {}", spec.id.0, op.id.0);
            }

            let mut param_names: BTreeSet<&str> = BTreeSet::new();
            for param in &op.params {
                if !param_names.insert(param.name.as_str()) {
                    bail!(
                        "operation {}.{} declares duplicate parameter '{}'",
                        spec.id.0,
                        op.id.0,
                        param.name
                    );
                }
                if !kind_ids.contains(param.kind.as_str()) {
                    bail!(
                        "operation {}.{} parameter '{}' references unknown kind {}",
                        spec.id.0,
                        op.id.0,
                        param.name,
                        param.kind.as_str()
                    );
                }
            }
            if !kind_ids.contains(op.returns.as_str()) {
                bail!(
                    "operation {}.{} returns unknown kind {}",
                    spec.id.0,
                    op.id.0,
                    op.returns.as_str()
                );
            }
        }

        for source in &spec.sources {
            if !doc_keys.contains(&source.doc) {
                bail!("spec {} references unknown doc '{}'", spec.id.0, source.doc);
            }
        }
        map.insert(spec.id.clone(), spec.clone());
    }
    Ok(map)
}

fn validate_against_schema(catalog_path: &Path) -> Result<()> {
    let catalog_file = File::open(catalog_path)
        .with_context(|| format!("opening catalog {}", catalog_path.display()))?;
    let catalog_value: Value = serde_json::from_reader(BufReader::new(catalog_file))
        .with_context(|| format!("parsing catalog {}", catalog_path.display()))?;

    let catalog_version = catalog_value
        .get("schema_version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let schema_path = resolve_catalog_schema_path(catalog_path);
    let allowed = allowed_schema_versions();
    let schema = load_json_schema(
        &schema_path,
        SchemaLoadOptions {
            allowed_versions: Some(&allowed),
            expected_version: Some(&catalog_version),
            patch_schema_version_const: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("loading catalog schema {}", schema_path.display()))?;

    if let Err(errors) = schema.compiled.validate(&catalog_value) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!(
            "spec catalog {} failed schema validation:\n{}",
            catalog_path.display(),
            details
        );
    }
    Ok(())
}

fn resolve_catalog_schema_path(catalog_path: &Path) -> PathBuf {
    if let Some(base) = catalog_path.parent().and_then(|p| p.parent()) {
        let candidate = base.join("schema/spec_catalog.schema.json");
        if candidate.exists() {
            return candidate;
        }
    }

    canonical_catalog_schema_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_catalog(value: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp catalog");
        write!(file, "{value}").unwrap();
        file
    }

    fn sample_catalog() -> Value {
        json!({
            "schema_version": "host_specs_v1",
            "scope": {
                "description": "fixture",
                "kinds": {"string": "text", "number": "double"}
            },
            "docs": {},
            "specs": [{
                "id": "sample_v1",
                "description": "fixture",
                "operations": [
                    {
                        "id": "echo",
                        "description": "fixture op",
                        "params": [{"name": "text", "kind": "string"}],
                        "returns": "string"
                    },
                    {
                        "id": "double",
                        "description": "fixture op",
                        "params": [{"name": "x", "kind": "number"}],
                        "returns": "number"
                    }
                ]
            }]
        })
    }

    #[test]
    fn loads_and_indexes_sample_catalog() {
        let file = write_catalog(&sample_catalog());
        let index = SpecIndex::load(file.path()).expect("sample catalog loads");
        assert_eq!(index.key().0, "host_specs_v1");

        let key = SpecKey("sample_v1".to_string());
        assert!(index.spec(&key).is_some());
        assert!(
            index
                .operation(&key, &OperationId("echo".to_string()))
                .is_some()
        );
        assert!(
            index
                .operation(&key, &OperationId("missing".to_string()))
                .is_none()
        );
        assert_eq!(index.keys().count(), 1);
    }

    #[test]
    fn rejects_duplicate_operation_ids() {
        let mut catalog = sample_catalog();
        let ops = catalog
            .pointer_mut("/specs/0/operations")
            .and_then(Value::as_array_mut)
            .unwrap();
        let dup = ops[0].clone();
        ops.push(dup);

        let file = write_catalog(&catalog);
        let err = SpecIndex::load(file.path()).expect_err("duplicate op should fail");
        assert!(err.to_string().contains("duplicate operation"));
    }

    #[test]
    fn rejects_unknown_value_kind() {
        let mut catalog = sample_catalog();
        *catalog
            .pointer_mut("/specs/0/operations/0/params/0/kind")
            .unwrap() = json!("blob");

        let file = write_catalog(&catalog);
        let err = SpecIndex::load(file.path()).expect_err("unknown kind should fail");
        assert!(err.to_string().contains("unknown kind"));
    }

    #[test]
    fn rejects_unexpected_catalog_version() {
        let mut catalog = sample_catalog();
        *catalog.get_mut("schema_version").unwrap() = json!("future_specs_v9");

        let file = write_catalog(&catalog);
        let err = SpecIndex::load(file.path()).expect_err("unknown version should fail");
        assert!(err.to_string().contains("future_specs_v9"));
    }
}
