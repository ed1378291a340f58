//! Coverage accounting between the spec catalog and observed records.
//!
//! Helpers here build an operation→record mapping used by the checker and
//! tests to identify declared operations that have never been exercised.
//! Coverage intentionally ignores records emitted by test embedders so only
//! actionable entries surface.

use crate::boundary::InvocationRecord;
use crate::spec::SpecIndex;
use anyhow::{Result, anyhow, bail};
use serde::Serialize;
use std::collections::BTreeMap;

// Records emitted by test harness embedders should not count toward coverage.
const IGNORED_EMBEDDERS: &[&str] = &["hostbridge-tests", "hostbridge-fixture"];

#[derive(Debug, Clone, Serialize)]
/// Whether an operation has one or more records plus the statuses observed.
pub struct CoverageEntry {
    pub exercised: bool,
    pub statuses: Vec<String>,
}

/// Build a mapping of `spec.operation` to record coverage.
///
/// Rejects unknown spec/operation references so drift between records and
/// the catalog surfaces immediately. Duplicate statuses per operation are
/// deduplicated but kept stable for deterministic output.
pub fn build_operation_coverage_map(
    index: &SpecIndex,
    records: &[InvocationRecord],
) -> Result<BTreeMap<String, CoverageEntry>> {
    let mut map: BTreeMap<String, CoverageEntry> = BTreeMap::new();
    for key in index.keys() {
        let spec = index
            .spec(key)
            .ok_or_else(|| anyhow!("index is missing spec '{}'", key.0))?;
        for op in &spec.operations {
            map.insert(
                coverage_key(&key.0, &op.id.0),
                CoverageEntry {
                    exercised: false,
                    statuses: Vec::new(),
                },
            );
        }
    }

    for record in records {
        let spec_key = &record.bridge.spec;
        let operation = &record.call.operation;
        if index.operation(spec_key, operation).is_none() {
            bail!(
                "record for bridge '{}' references unknown operation '{}.{}'",
                record.bridge.tag.0,
                spec_key.0,
                operation.0
            );
        }
        let entry = map
            .get_mut(&coverage_key(&spec_key.0, &operation.0))
            .ok_or_else(|| {
                anyhow!(
                    "coverage map missing entry for '{}.{}'",
                    spec_key.0,
                    operation.0
                )
            })?;

        entry.exercised = true;
        if !entry.statuses.contains(&record.result.status) {
            entry.statuses.push(record.result.status.clone());
            entry.statuses.sort();
        }
    }

    Ok(map)
}

/// Sanity-check that the coverage map contains every declared operation.
pub fn validate_coverage_against_index(
    coverage: &BTreeMap<String, CoverageEntry>,
    index: &SpecIndex,
) -> Result<()> {
    for key in index.keys() {
        let spec = index
            .spec(key)
            .ok_or_else(|| anyhow!("index is missing spec '{}'", key.0))?;
        for op in &spec.operations {
            if !coverage.contains_key(&coverage_key(&key.0, &op.id.0)) {
                bail!("coverage map missing entry for '{}.{}'", key.0, op.id.0);
            }
        }
    }
    Ok(())
}

/// Filter out records that should not affect coverage reporting.
pub fn filter_coverage_records(records: &[InvocationRecord]) -> Vec<InvocationRecord> {
    records
        .iter()
        .cloned()
        .filter(|record| match &record.host.embedder {
            Some(embedder) => !IGNORED_EMBEDDERS.contains(&embedder.as_str()),
            None => true,
        })
        .collect()
}

fn coverage_key(spec: &str, operation: &str) -> String {
    format!("{spec}.{operation}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BridgeInfo, CallInfo, HostInfo, OperationContext, OutcomeInfo};
    use crate::spec::{
        BridgeTag, OperationId, OperationSnapshot, SpecKey, ValueKind,
    };
    use serde_json::json;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn shipped_index() -> SpecIndex {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schema/specs.json");
        SpecIndex::load(&path).expect("shipped catalog loads")
    }

    fn sample_record(operation: &str, status: &str, embedder: Option<&str>) -> InvocationRecord {
        InvocationRecord {
            schema_version: crate::boundary::RECORD_SCHEMA_VERSION.to_string(),
            specs_schema_version: Some(crate::spec::CatalogKey("host_specs_v1".to_string())),
            host: HostInfo {
                embedder: embedder.map(str::to_string),
                context_id: None,
                os: "Linux 6.1.0 x86_64".to_string(),
                host_tag: "local-linux".to_string(),
            },
            bridge: BridgeInfo {
                tag: BridgeTag("foundation_models".to_string()),
                spec: SpecKey("foundation_models_v1".to_string()),
                version: "1".to_string(),
            },
            call: CallInfo {
                operation: OperationId(operation.to_string()),
                args: json!({}),
            },
            result: OutcomeInfo {
                status: status.to_string(),
                value: None,
                error_code: None,
                error_detail: None,
            },
            operation_context: OperationContext {
                operation: OperationSnapshot {
                    id: OperationId(operation.to_string()),
                    params: Vec::new(),
                    returns: ValueKind::String,
                },
            },
        }
    }

    #[test]
    fn coverage_map_tracks_exercised_operations() {
        let index = shipped_index();
        let records = vec![
            sample_record("greet", "success", None),
            sample_record("greet", "rejected", None),
        ];

        let coverage = build_operation_coverage_map(&index, &records).expect("coverage builds");
        validate_coverage_against_index(&coverage, &index).expect("coverage complete");

        let greet = &coverage["foundation_models_v1.greet"];
        assert!(greet.exercised);
        assert_eq!(greet.statuses, vec!["rejected", "success"]);

        let add = &coverage["foundation_models_v1.add"];
        assert!(!add.exercised);
        assert!(add.statuses.is_empty());
    }

    #[test]
    fn coverage_rejects_unknown_operations() {
        let index = shipped_index();
        let records = vec![sample_record("shout", "success", None)];
        let err =
            build_operation_coverage_map(&index, &records).expect_err("unknown op should fail");
        assert!(err.to_string().contains("shout"));
    }

    #[test]
    fn filter_coverage_records_ignores_test_embedders() {
        let records = vec![
            sample_record("greet", "success", Some("hostbridge-tests")),
            sample_record("greet", "success", Some("production-app")),
            sample_record("add", "success", None),
        ];
        let filtered = filter_coverage_records(&records);
        assert_eq!(filtered.len(), 2);
        assert!(
            filtered
                .iter()
                .all(|r| r.host.embedder.as_deref() != Some("hostbridge-tests"))
        );
    }

    #[test]
    fn coverage_works_against_fixture_catalogs() {
        let mut file = NamedTempFile::new().expect("temp catalog");
        let catalog = json!({
            "schema_version": "host_specs_v1",
            "scope": {"description": "fixture", "kinds": {"string": "text"}},
            "docs": {},
            "specs": [{
                "id": "sample_v1",
                "description": "fixture",
                "operations": [{
                    "id": "echo",
                    "description": "fixture op",
                    "params": [{"name": "text", "kind": "string"}],
                    "returns": "string"
                }]
            }]
        });
        write!(file, "{catalog}").unwrap();
        let index = SpecIndex::load(file.path()).expect("fixture catalog loads");

        let coverage = build_operation_coverage_map(&index, &[]).expect("empty coverage builds");
        assert_eq!(coverage.len(), 1);
        assert!(!coverage["sample_v1.echo"].exercised);
    }
}
