//! Holds one or more spec catalogs for lookup by key.
//!
//! The repository lets callers resolve spec metadata using the catalog key
//! stored in invocation records, keeping catalog selection explicit even when
//! multiple versions are loaded.

use crate::spec::identity::{CatalogKey, OperationId, SpecKey};
use crate::spec::model::{OperationDecl, SpecCatalog};
use std::collections::BTreeMap;

#[derive(Default)]
/// In-memory store for spec catalogs keyed by `CatalogKey`.
pub struct SpecRepository {
    catalogs: BTreeMap<CatalogKey, SpecCatalog>,
}

impl SpecRepository {
    /// Register a catalog for later lookup.
    pub fn register(&mut self, catalog: SpecCatalog) {
        self.catalogs.insert(catalog.key.clone(), catalog);
    }

    /// Fetch a catalog by key, if present.
    pub fn get(&self, key: &CatalogKey) -> Option<&SpecCatalog> {
        self.catalogs.get(key)
    }

    /// Resolve an operation declaration inside a registered catalog.
    pub fn find_operation(
        &self,
        key: &CatalogKey,
        spec: &SpecKey,
        operation: &OperationId,
    ) -> Option<&OperationDecl> {
        self.get(key)?
            .specs
            .iter()
            .find(|candidate| &candidate.id == spec)?
            .operation(operation)
    }
}
