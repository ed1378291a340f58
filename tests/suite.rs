// Centralized integration suite for the bridge harness; exercises catalog
// validation, dispatch semantics, record contracts, and helper utilities so
// changes surface in one place.
mod support;

use anyhow::Result;
use hostbridge::{
    BridgeRegistry, BridgeTag, CapabilityBridge, FoundationModels, HostContext, OperationId,
    SpecIndex, SpecKey, SpecRepository, build_operation_coverage_map, filter_coverage_records,
    load_catalog_from_path, parse_record_stream, read_invocation_records, split_list,
    validate_coverage_against_index, validate_record_values, validate_registry,
};
use serde_json::{Value, json};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::sync::Arc;
use std::thread;
use support::{
    bundle_root, default_context, golden_snippet_path, shipped_index, shipped_record_schema,
};
use tempfile::{NamedTempFile, TempDir};

fn foundation_tag() -> BridgeTag {
    BridgeTag(FoundationModels::TAG.to_string())
}

fn op(name: &str) -> OperationId {
    OperationId(name.to_string())
}

// Ensures the shipped catalog loads, schema-validates, and agrees with the
// default registry before any dispatch happens.
#[test]
fn shipped_catalog_matches_default_registry() -> Result<()> {
    let index = shipped_index();
    assert_eq!(index.key().0, "host_specs_v1");

    let spec_key = SpecKey(FoundationModels::SPEC_KEY.to_string());
    let spec = index.spec(&spec_key).expect("foundation spec present");
    assert_eq!(spec.operations.len(), 2);
    assert!(spec.operation(&op("greet")).is_some());
    assert!(spec.operation(&op("add")).is_some());

    let registry = BridgeRegistry::with_defaults()?;
    let errors = validate_registry(&index, &registry);
    assert!(errors.is_empty(), "registry drift: {errors:?}");

    let coverage = build_operation_coverage_map(&index, &[])?;
    validate_coverage_against_index(&coverage, &index)?;
    assert!(coverage.contains_key("foundation_models_v1.greet"));
    assert!(coverage.contains_key("foundation_models_v1.add"));
    Ok(())
}

// Dispatched records must satisfy the record schema and the catalog
// cross-checks without adjustment.
#[test]
fn dispatch_records_validate_against_schema() -> Result<()> {
    let context = default_context()?;
    let schema = shipped_record_schema();
    assert_eq!(schema.version(), "hbir-v1");

    let records = vec![
        context.dispatch(&foundation_tag(), &op("greet"), &json!({"name": "World"}))?,
        context.dispatch(&foundation_tag(), &op("add"), &json!({"a": 2.0, "b": 3.0}))?,
        context.dispatch(&foundation_tag(), &op("add"), &json!({"a": 1.0}))?,
    ];

    let mut values = Vec::new();
    for record in &records {
        let value = serde_json::to_value(record)?;
        schema.validate(&value)?;
        values.push(value);
    }

    let errors = validate_record_values(context.specs(), &values);
    assert!(errors.is_empty(), "record drift: {errors:?}");

    assert_eq!(records[0].result.status, "success");
    assert_eq!(
        records[0].result.value,
        Some(json!("Hello World from FoundationModels!"))
    );
    assert_eq!(records[1].result.value.as_ref().and_then(Value::as_f64), Some(5.0));
    assert_eq!(records[2].result.status, "rejected");
    assert_eq!(
        records[2].result.error_code.as_deref(),
        Some("ARGUMENT_PARSING_ERROR")
    );
    Ok(())
}

// Greeting contract: prefix, suffix, and verbatim name embedding for
// ordinary, empty, and awkward inputs.
#[test]
fn greeting_embeds_any_name_verbatim() {
    let bridge = FoundationModels::new();
    let names = [
        "World",
        "",
        " ",
        "name with spaces",
        "tab\tand\nnewline",
        "unicode: 日本語 ♥",
        "\"quoted\"",
    ];
    for name in names {
        let greeting = bridge.greet(name);
        assert!(greeting.starts_with("Hello "), "greeting: {greeting:?}");
        assert!(
            greeting.ends_with(" from FoundationModels!"),
            "greeting: {greeting:?}"
        );
        assert!(greeting.contains(name), "greeting: {greeting:?}");
    }
    assert_eq!(bridge.greet(""), "Hello  from FoundationModels!");
}

// Addition contract: plain IEEE-754 semantics, commutativity, identity, and
// pass-through for non-finite values.
#[test]
fn addition_follows_ieee_semantics() {
    let bridge = FoundationModels::new();
    assert_eq!(bridge.add(2.0, 3.0), 5.0);
    assert_eq!(bridge.add(-1.5, 1.5), 0.0);

    let pairs = [(0.1, 0.2), (-7.25, 3.5), (1e300, 1e300), (0.0, -0.0)];
    for (a, b) in pairs {
        let forward = bridge.add(a, b);
        let backward = bridge.add(b, a);
        assert!(
            forward == backward || (forward.is_nan() && backward.is_nan()),
            "commutativity for ({a}, {b})"
        );
        assert_eq!(bridge.add(a, 0.0), a);
    }

    assert!(bridge.add(f64::NAN, 0.0).is_nan());
    assert_eq!(bridge.add(f64::NEG_INFINITY, -1.0), f64::NEG_INFINITY);
}

// One shared context serving many threads must produce identical results for
// identical inputs; the bridge holds no state between calls.
#[test]
fn concurrent_dispatch_is_referentially_transparent() -> Result<()> {
    let context = Arc::new(default_context()?);
    let expected = context
        .dispatch(&foundation_tag(), &op("add"), &json!({"a": 0.1, "b": 0.2}))?
        .result
        .value;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let context = Arc::clone(&context);
        let expected = expected.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let record = context
                    .dispatch(&foundation_tag(), &op("add"), &json!({"a": 0.1, "b": 0.2}))
                    .expect("dispatch succeeds");
                assert_eq!(record.result.status, "success");
                assert_eq!(record.result.value, expected);

                let greeting = context
                    .dispatch(&foundation_tag(), &op("greet"), &json!({"name": "World"}))
                    .expect("dispatch succeeds");
                assert_eq!(
                    greeting.result.value,
                    Some(json!("Hello World from FoundationModels!"))
                );
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
    Ok(())
}

// The golden fixture is the stored-contract regression net: every record
// must parse, schema-validate, and resolve against the shipped catalog.
#[test]
fn golden_snippet_passes_schema_and_catalog_checks() -> Result<()> {
    let file = File::open(golden_snippet_path())?;
    let records = read_invocation_records(BufReader::new(file)).expect("fixture parses");
    assert_eq!(records.len(), 10);

    let schema = shipped_record_schema();
    let index = shipped_index();
    let mut values = Vec::new();
    for record in &records {
        let value = serde_json::to_value(record)?;
        schema.validate(&value)?;
        values.push(value);
    }
    let errors = validate_record_values(&index, &values);
    assert!(errors.is_empty(), "fixture drift: {errors:?}");

    let counted = filter_coverage_records(&records);
    assert!(counted.len() < records.len(), "fixture embedder filtered");
    let coverage = build_operation_coverage_map(&index, &counted)?;
    assert!(coverage["foundation_models_v1.greet"].exercised);
    assert!(coverage["foundation_models_v1.add"].exercised);
    Ok(())
}

// parse_record_stream accepts the three documented shapes and rejects empty
// input loudly.
#[test]
fn record_stream_accepts_object_array_and_ndjson() -> Result<()> {
    let ndjson = fs::read_to_string(golden_snippet_path())?;
    let from_ndjson = parse_record_stream(&ndjson)?;
    assert_eq!(from_ndjson.len(), 10);

    let first_line = ndjson.lines().next().expect("fixture has lines");
    let single = parse_record_stream(first_line)?;
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].call.operation.as_str(), "greet");

    let array = format!("[{}]", ndjson.lines().collect::<Vec<_>>().join(","));
    let from_array = parse_record_stream(&array)?;
    assert_eq!(from_array.len(), 10);

    assert!(parse_record_stream("   ").is_err());
    assert!(parse_record_stream("42").is_err());
    Ok(())
}

// Malformed catalogs must fail loading with actionable diagnostics rather
// than producing a partially-indexed snapshot.
#[test]
fn malformed_catalogs_are_rejected() {
    let write = |value: &Value| -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp catalog");
        write!(file, "{value}").unwrap();
        file
    };

    let missing_kinds = write(&json!({
        "schema_version": "host_specs_v1",
        "scope": {"description": "fixture"},
        "docs": {},
        "specs": [{
            "id": "sample_v1",
            "description": "fixture",
            "operations": [{"id": "noop", "description": "op", "returns": "string"}]
        }]
    }));
    assert!(SpecIndex::load(missing_kinds.path()).is_err());

    let empty_specs = write(&json!({
        "schema_version": "host_specs_v1",
        "scope": {"description": "fixture", "kinds": {"string": "text"}},
        "docs": {},
        "specs": []
    }));
    assert!(SpecIndex::load(empty_specs.path()).is_err());

    let duplicate_specs = write(&json!({
        "schema_version": "host_specs_v1",
        "scope": {"description": "fixture", "kinds": {"string": "text"}},
        "docs": {},
        "specs": [
            {
                "id": "sample_v1",
                "description": "fixture",
                "operations": [{"id": "noop", "description": "op", "returns": "string"}]
            },
            {
                "id": "sample_v1",
                "description": "fixture again",
                "operations": [{"id": "noop", "description": "op", "returns": "string"}]
            }
        ]
    }));
    let err = SpecIndex::load(duplicate_specs.path()).expect_err("duplicate spec keys fail");
    assert!(err.to_string().contains("duplicate spec key"));

    let unsourced_doc = write(&json!({
        "schema_version": "host_specs_v1",
        "scope": {"description": "fixture", "kinds": {"string": "text"}},
        "docs": {},
        "specs": [{
            "id": "sample_v1",
            "description": "fixture",
            "operations": [{"id": "noop", "description": "op", "returns": "string"}],
            "sources": [{"doc": "missing_doc"}]
        }]
    }));
    let err = SpecIndex::load(unsourced_doc.path()).expect_err("unknown doc fails");
    assert!(err.to_string().contains("missing_doc"));
}

// Catalog edits that break a bridge's declared surface must be caught when
// the context is constructed, not at dispatch time.
#[test]
fn context_construction_catches_catalog_drift() -> Result<()> {
    let catalog_value = json!({
        "schema_version": "host_specs_v1",
        "scope": {
            "description": "fixture",
            "kinds": {"string": "text", "number": "double"}
        },
        "docs": {},
        "specs": [{
            "id": "foundation_models_v1",
            "description": "narrowed surface",
            "operations": [{
                "id": "greet",
                "description": "only greet survives",
                "params": [{"name": "name", "kind": "string"}],
                "returns": "string"
            }]
        }]
    });
    let mut file = NamedTempFile::new()?;
    write!(file, "{catalog_value}")?;
    let narrowed = SpecIndex::load(file.path())?;

    let registry = BridgeRegistry::with_defaults()?;
    let err = HostContext::new(registry, narrowed).expect_err("missing add should fail");
    assert!(err.to_string().contains("implements operation 'add'"));
    Ok(())
}

// Construction of the bridge itself never fails and keeps a stable identity.
#[test]
fn bridge_identity_is_stable_across_instances() {
    for _ in 0..3 {
        let bridge = FoundationModels::new();
        assert_eq!(bridge.tag(), FoundationModels::TAG);
        assert!(!bridge.tag().is_empty());
        assert_eq!(bridge.spec_key().0, FoundationModels::SPEC_KEY);
    }

    let shared: Arc<dyn CapabilityBridge> = Arc::new(FoundationModels::new());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let shared = Arc::clone(&shared);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                assert_eq!(shared.tag(), "foundation_models");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}

// Bundle-root discovery honors the HOSTBRIDGE_ROOT layout contract.
#[test]
fn bundle_root_contains_the_shipped_contracts() {
    let root = bundle_root();
    assert!(root.join("schema/specs.json").is_file());
    assert!(root.join("schema/spec_catalog.schema.json").is_file());
    assert!(root.join("schema/invocation_record.schema.json").is_file());
    assert!(root.join("Cargo.toml").is_file());

    // A directory that lacks the sentinel files is never accepted as a root.
    let decoy = TempDir::new().expect("temp dir");
    fs::create_dir_all(decoy.path().join("schema")).unwrap();
    assert!(!decoy.path().join("schema/specs.json").exists());
}

// Records carry their catalog key, so a repository with multiple snapshots
// can resolve every golden record's signature without guessing versions.
#[test]
fn repository_resolves_record_context_by_catalog_key() -> Result<()> {
    let mut repository = SpecRepository::default();
    let catalog = load_catalog_from_path(&bundle_root().join("schema/specs.json"))?;
    repository.register(catalog);

    let file = File::open(golden_snippet_path())?;
    let records = read_invocation_records(BufReader::new(file)).expect("fixture parses");
    for record in &records {
        let key = record
            .specs_schema_version
            .as_ref()
            .expect("fixture records carry a catalog key");
        let decl = repository
            .find_operation(key, &record.bridge.spec, &record.call.operation)
            .expect("fixture operations resolve");
        assert_eq!(decl.id, record.operation_context.operation.id);
        assert_eq!(decl.params, record.operation_context.operation.params);
    }
    Ok(())
}

#[test]
fn split_list_handles_commas_and_whitespace() {
    assert_eq!(split_list("a,b c"), vec!["a", "b", "c"]);
    assert_eq!(split_list("  one  "), vec!["one"]);
    assert!(split_list(" , ,, ").is_empty());
}
