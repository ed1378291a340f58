//! Plain-text checker that validates invocation-record NDJSON streams.
//!
//! This binary intentionally stays text-only so it can sit in pipelines like
//! `bridge --invoke ... | bridge --check`. It leans on the shared record
//! reader and schema wrapper so it understands the exact record contract
//! without rolling bespoke parsers.

use anyhow::{Context, Result, bail};
use hostbridge::{
    InvocationRecord, KNOWN_STATUSES, RecordSchema, SpecIndex, build_operation_coverage_map,
    default_catalog_path, filter_coverage_records, find_bundle_root, parse_record_stream,
    resolve_record_schema_path, split_list, validate_record_values,
};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fmt;
use std::io::{self, IsTerminal, Read};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let only = parse_cli_filter()?;
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!(
            "record-check expects invocation-record NDJSON on stdin (e.g. bridge --invoke ... | bridge --check)"
        );
    }

    let bundle_root = find_bundle_root()?;
    let schema_path = resolve_record_schema_path(&bundle_root);
    let record_schema = RecordSchema::load(&schema_path)
        .with_context(|| format!("loading record schema from {}", schema_path.display()))?;
    let catalog_path = default_catalog_path(&bundle_root);
    let specs = SpecIndex::load(&catalog_path)
        .with_context(|| format!("loading spec catalog from {}", catalog_path.display()))?;

    let mut input = String::new();
    stdin
        .lock()
        .read_to_string(&mut input)
        .context("reading record stream from stdin")?;
    let records = parse_record_stream(&input)?;

    let errors = check_records(&records, &record_schema, &specs)?;

    let rendered: Vec<InvocationRecord> = match &only {
        Some(statuses) => records
            .iter()
            .filter(|record| statuses.contains(&record.result.status))
            .cloned()
            .collect(),
        None => records.clone(),
    };

    let mut output = String::new();
    render_check_output(&rendered, &errors, &specs, &mut output)
        .map_err(|err| anyhow::anyhow!("rendering summary failed: {err}"))?;
    print!("{output}");

    if !errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Parse the optional `--only STATUS_LIST` render filter.
///
/// Filtering affects which records are rendered, never which records are
/// validated; the checker still fails on drift in hidden records.
fn parse_cli_filter() -> Result<Option<Vec<String>>> {
    let mut only = None;
    let mut args = env::args().skip(1);
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--only" => {
                let Some(raw) = args.next() else {
                    bail!("Missing value for --only");
                };
                let statuses = split_list(&raw);
                if statuses.is_empty() {
                    bail!("--only requires at least one status");
                }
                for status in &statuses {
                    if !KNOWN_STATUSES.contains(&status.as_str()) {
                        bail!("Unknown status in --only: {status} (expected success|rejected|error)");
                    }
                }
                only = Some(statuses);
            }
            "-h" | "--help" => usage_and_exit(),
            other => bail!("Unknown flag: {other}"),
        }
    }
    Ok(only)
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: record-check [--only STATUS_LIST] < records.ndjson\n\nReads invocation-record NDJSON (or a JSON array) from stdin, validates every\nrecord against the schema and spec catalog, and prints a summary.\n--only filters which records are rendered (comma/space separated statuses)."
    );
    std::process::exit(1);
}

/// Validate each record against the schema and the catalog snapshot.
///
/// Collects every violation instead of stopping at the first so one run
/// surfaces all drift in a stored stream.
fn check_records(
    records: &[InvocationRecord],
    record_schema: &RecordSchema,
    specs: &SpecIndex,
) -> Result<Vec<String>> {
    let mut errors = Vec::new();
    let mut values = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        let value = serde_json::to_value(record)
            .with_context(|| format!("serializing record #{}", idx + 1))?;
        if let Err(err) = record_schema.validate(&value) {
            errors.push(format!("record #{}: {err:#}", idx + 1));
        }
        values.push(value);
    }

    errors.extend(validate_record_values(specs, &values));
    Ok(errors)
}

#[derive(Debug, Default)]
struct CheckStats {
    total_records: usize,
    distinct_operations: usize,
    statuses: BTreeMap<String, usize>,
    unexercised: Vec<String>,
}

fn summarize_records(records: &[InvocationRecord], specs: &SpecIndex) -> CheckStats {
    let mut stats = CheckStats {
        total_records: records.len(),
        ..Default::default()
    };
    stats.distinct_operations = records
        .iter()
        .map(|record| record.call.operation.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    for record in records {
        *stats
            .statuses
            .entry(record.result.status.clone())
            .or_insert(0) += 1;
    }

    let counted = filter_coverage_records(records);
    if let Ok(coverage) = build_operation_coverage_map(specs, &counted) {
        stats.unexercised = coverage
            .iter()
            .filter(|(_, entry)| !entry.exercised)
            .map(|(key, _)| key.clone())
            .collect();
    }

    stats
}

fn render_check_output(
    records: &[InvocationRecord],
    errors: &[String],
    specs: &SpecIndex,
    writer: &mut impl fmt::Write,
) -> fmt::Result {
    let stats = summarize_records(records, specs);
    render_summary(&stats, writer)?;
    writeln!(writer)?;

    for (idx, record) in records.iter().enumerate() {
        render_record(idx + 1, record, writer)?;
    }

    if !errors.is_empty() {
        writeln!(writer, "validation errors")?;
        writeln!(writer, "=================")?;
        for error in errors {
            writeln!(writer, "  {error}")?;
        }
    }
    Ok(())
}

fn render_summary(stats: &CheckStats, writer: &mut impl fmt::Write) -> fmt::Result {
    writeln!(writer, "record-check summary")?;
    writeln!(writer, "====================")?;
    writeln!(writer, "total records      : {}", stats.total_records)?;
    writeln!(writer, "distinct operations: {}", stats.distinct_operations)?;
    writeln!(
        writer,
        "statuses           : {}",
        format_counts(&stats.statuses, "none")
    )?;
    if stats.unexercised.is_empty() {
        writeln!(writer, "coverage           : all declared operations exercised")?;
    } else {
        writeln!(
            writer,
            "coverage gaps      : {}",
            stats.unexercised.join(", ")
        )?;
    }
    Ok(())
}

fn render_record(
    idx: usize,
    record: &InvocationRecord,
    writer: &mut impl fmt::Write,
) -> fmt::Result {
    writeln!(
        writer,
        "[#{}] {:<8} bridge={} op={}",
        idx, record.result.status, record.bridge.tag.0, record.call.operation.0
    )?;
    let snapshot = &record.operation_context.operation;
    let params: Vec<String> = snapshot
        .params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.kind.as_str()))
        .collect();
    writeln!(
        writer,
        "  signature: {}({}) -> {}",
        snapshot.id.0,
        params.join(", "),
        snapshot.returns.as_str()
    )?;
    if let Some(detail) = record
        .result
        .error_detail
        .as_deref()
        .map(str::trim)
        .filter(|detail| !detail.is_empty())
    {
        writeln!(writer, "  detail:    {detail}")?;
    }
    writeln!(writer)?;
    Ok(())
}

fn format_counts(map: &BTreeMap<String, usize>, empty_label: &str) -> String {
    if map.is_empty() {
        return empty_label.to_string();
    }
    map.iter()
        .map(|(key, count)| format!("{key}={count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
