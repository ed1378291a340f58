//! Deserializable representation of `schema/specs.json`.
//!
//! The types mirror the catalog schema so helpers and tests can reason about
//! spec metadata without ad-hoc JSON handling. Use `SpecIndex` for validation
//! and keyed lookup; use these structs when the full catalog surface is
//! required (docs, scope, value-kind glossary).

use crate::spec::identity::{
    CatalogKey, OperationId, OperationSnapshot, ParamDecl, SpecKey, ValueKind,
};
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
/// Full spec catalog as stored on disk.
pub struct SpecCatalog {
    #[serde(rename = "schema_version")]
    pub key: CatalogKey,
    pub scope: Scope,
    pub docs: BTreeMap<String, DocRef>,
    pub specs: Vec<BridgeSpec>,
}

#[derive(Clone, Debug, Deserialize)]
/// Top-level catalog scope: what this snapshot covers and which value kinds
/// its operations may use.
pub struct Scope {
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub kinds: BTreeMap<String, String>,
    #[serde(default)]
    pub limitations: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
/// Document reference pulled into the catalog for traceability.
pub struct DocRef {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_hint: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
/// One versioned capability interface: the operation set a bridge declaring
/// this spec key must implement in full.
pub struct BridgeSpec {
    pub id: SpecKey,
    pub description: String,
    pub operations: Vec<OperationDecl>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sources: Vec<SpecSource>,
}

#[derive(Clone, Debug, Deserialize)]
/// Declared signature of a single operation.
pub struct OperationDecl {
    pub id: OperationId,
    pub description: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    pub returns: ValueKind,
}

#[derive(Clone, Debug, Deserialize)]
/// Source citations for a spec.
pub struct SpecSource {
    pub doc: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub url_hint: Option<String>,
}

impl BridgeSpec {
    /// Resolve an operation declaration by id.
    pub fn operation(&self, id: &OperationId) -> Option<&OperationDecl> {
        self.operations.iter().find(|op| &op.id == id)
    }

    /// Operation ids declared by this spec, in catalog order.
    pub fn operation_ids(&self) -> Vec<OperationId> {
        self.operations.iter().map(|op| op.id.clone()).collect()
    }
}

impl OperationDecl {
    /// Create the compact snapshot embedded in invocation records.
    pub fn snapshot(&self) -> OperationSnapshot {
        OperationSnapshot {
            id: self.id.clone(),
            params: self.params.clone(),
            returns: self.returns.clone(),
        }
    }
}

/// Read and parse a spec catalog from disk without additional validation.
pub fn load_catalog_from_path(path: &Path) -> Result<SpecCatalog> {
    let data = fs::read_to_string(path)?;
    let catalog: SpecCatalog = serde_json::from_str(&data)?;
    Ok(catalog)
}
