//! Spec catalog wiring.
//!
//! This module wraps the JSON catalog under `schema/specs.json` so helpers
//! can load a validated snapshot and expose consistent identifiers. Types
//! here mirror the schema fields; callers use `SpecIndex` for fast lookups
//! and `SpecRepository` when multiple catalogs are registered.

pub mod identity;
pub mod index;
pub mod model;
pub mod repository;

pub use identity::{
    BridgeTag, CatalogKey, OperationId, OperationSnapshot, ParamDecl, SpecKey, ValueKind,
};
pub use index::SpecIndex;
pub use model::{BridgeSpec, DocRef, OperationDecl, Scope, SpecCatalog, SpecSource};
pub use repository::SpecRepository;

pub use model::load_catalog_from_path;
