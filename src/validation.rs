//! Validation helpers for cross-checking bridges and emitted records.
//!
//! Used by guard-rail tests and the record checker to ensure registered
//! bridges only reference known spec keys, implement their declared surface
//! in full, and that stored records remain in sync with the current catalog
//! snapshot.

use crate::bridge::BridgeRegistry;
use crate::spec::{OperationId, SpecIndex, SpecKey};
use serde_json::Value;
use std::collections::BTreeSet;

/// Allowed values for the record `result.status` field.
pub const KNOWN_STATUSES: &[&str] = &["success", "rejected", "error"];

/// Cross-check every registered bridge against the spec catalog.
///
/// Returns a list of errors rather than short-circuiting so callers can
/// surface multiple registration issues at once.
pub fn validate_registry(index: &SpecIndex, registry: &BridgeRegistry) -> Vec<String> {
    let mut errors = Vec::new();
    for (tag, bridge) in registry.iter() {
        let spec_key = bridge.spec_key();
        let Some(spec) = index.spec(&spec_key) else {
            errors.push(format!(
                "bridge '{}' declares unknown spec '{}'",
                tag.0, spec_key.0
            ));
            continue;
        };

        let declared: BTreeSet<OperationId> = spec.operation_ids().into_iter().collect();
        let implemented: BTreeSet<OperationId> = bridge.operations().into_iter().collect();

        for op in implemented.difference(&declared) {
            errors.push(format!(
                "bridge '{}' implements operation '{}' not declared by spec '{}'",
                tag.0, op.0, spec_key.0
            ));
        }
        for op in declared.difference(&implemented) {
            errors.push(format!(
                "bridge '{}' is missing operation '{}' declared by spec '{}'",
                tag.0, op.0, spec_key.0
            ));
        }
    }
    errors
}

/// Cross-check serialized records against the catalog snapshot.
///
/// Works on raw JSON values so the checker can report catalog drift even for
/// records that no longer deserialize into the current structs.
pub fn validate_record_values(index: &SpecIndex, values: &[Value]) -> Vec<String> {
    let mut errors = Vec::new();
    for (idx, value) in values.iter().enumerate() {
        let label = format!("record #{}", idx + 1);

        let spec_key = value
            .pointer("/bridge/spec")
            .and_then(Value::as_str)
            .map(|s| SpecKey(s.to_string()));
        let Some(spec_key) = spec_key else {
            errors.push(format!("{label}: missing bridge.spec"));
            continue;
        };
        let Some(spec) = index.spec(&spec_key) else {
            errors.push(format!(
                "{label}: references unknown spec '{}'",
                spec_key.0
            ));
            continue;
        };

        let mut seen = BTreeSet::new();
        for pointer in ["/call/operation", "/operation_context/operation/id"] {
            let Some(op) = value.pointer(pointer).and_then(Value::as_str) else {
                errors.push(format!("{label}: missing {pointer}"));
                continue;
            };
            // Avoid reporting the same unknown operation twice when it
            // appears in both the call and context sections.
            if !seen.insert(op.to_string()) {
                continue;
            }
            if spec.operation(&OperationId(op.to_string())).is_none() {
                errors.push(format!(
                    "{label}: references unknown operation '{}' in spec '{}'",
                    op, spec_key.0
                ));
            }
        }

        match value.pointer("/result/status").and_then(Value::as_str) {
            Some(status) if KNOWN_STATUSES.contains(&status) => {}
            Some(status) => {
                errors.push(format!("{label}: unknown result status '{status}'"));
            }
            None => errors.push(format!("{label}: missing result.status")),
        }
    }
    errors
}
