use anyhow::Result;
use hostbridge::{
    BridgeRegistry, HostContext, RecordSchema, SpecIndex, default_catalog_path, find_bundle_root,
    resolve_record_schema_path,
};
use std::path::PathBuf;

pub fn bundle_root() -> PathBuf {
    find_bundle_root().expect("tests require the bundle root")
}

pub fn shipped_index() -> SpecIndex {
    let catalog_path = default_catalog_path(&bundle_root());
    SpecIndex::load(&catalog_path).expect("shipped catalog loads")
}

pub fn shipped_record_schema() -> RecordSchema {
    let schema_path = resolve_record_schema_path(&bundle_root());
    RecordSchema::load(&schema_path).expect("record schema loads")
}

pub fn default_context() -> Result<HostContext> {
    let registry = BridgeRegistry::with_defaults()?;
    HostContext::new(registry, shipped_index())
}

pub fn golden_snippet_path() -> PathBuf {
    bundle_root().join("tests/mocks/hbir-golden-snippet.ndjson")
}
