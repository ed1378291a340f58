//! Translates embedder CLI inputs into an hbir-v1 invocation record.
//!
//! This binary is the authoritative serializer for out-of-process embedders:
//! runtimes that host a bridge themselves but want their calls recorded in
//! the same envelope the in-process dispatcher emits. It validates spec and
//! operation ids against the shipped catalog, captures host context, and
//! prints a single JSON record to stdout.

use anyhow::{Context, Result, bail};
use hostbridge::emit_support::{
    JsonObjectBuilder, ValueArgs, check_outcome_consistency, validate_operation_ref,
    validate_status,
};
use hostbridge::{
    BridgeInfo, BridgeTag, CallInfo, InvocationRecord, OperationContext, OperationId, OutcomeInfo,
    RECORD_SCHEMA_VERSION, SpecIndex, SpecKey, default_catalog_path, detect_host_info,
    find_bundle_root,
};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    let bundle_root = find_bundle_root()?;

    let catalog_path = default_catalog_path(&bundle_root);
    let specs = SpecIndex::load(&catalog_path).with_context(|| {
        format!("loading spec catalog from {}", catalog_path.display())
    })?;

    validate_tag(&args.tag)?;
    let spec_key = SpecKey(args.spec.clone());
    let operation = OperationId(args.operation.clone());
    let decl = validate_operation_ref(&specs, &spec_key, &operation)?;

    validate_status(&args.status)?;
    check_outcome_consistency(
        &args.status,
        args.error_code.as_deref(),
        args.error_detail.as_deref(),
    )?;

    let value = args.value.build()?;
    if args.status != "success" && value.is_some() {
        bail!("Only success records may carry a result value");
    }

    let call_args = args.call_args.build();

    let mut host = detect_host_info();
    if let Some(embedder) = args.embedder {
        host.embedder = Some(embedder);
    }
    if let Some(context_id) = args.context_id {
        host.context_id = Some(context_id);
    }

    let record = InvocationRecord {
        schema_version: RECORD_SCHEMA_VERSION.to_string(),
        specs_schema_version: Some(specs.key().clone()),
        host,
        bridge: BridgeInfo {
            tag: BridgeTag(args.tag),
            spec: spec_key,
            version: args.bridge_version,
        },
        call: CallInfo {
            operation,
            args: call_args,
        },
        result: OutcomeInfo {
            status: args.status,
            value,
            error_code: args.error_code,
            error_detail: args.error_detail,
        },
        operation_context: OperationContext {
            operation: decl.snapshot(),
        },
    };

    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

/// Parsed command-line arguments for a single record emission.
///
/// Fields mirror the hbir envelope; most values are required because
/// embedders are expected to normalize outcomes themselves before calling
/// this binary.
struct CliArgs {
    tag: String,
    spec: String,
    bridge_version: String,
    operation: String,
    status: String,
    error_code: Option<String>,
    error_detail: Option<String>,
    embedder: Option<String>,
    context_id: Option<String>,
    value: ValueArgs,
    call_args: JsonObjectBuilder,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut tag = None;
        let mut spec = None;
        let mut bridge_version = None;
        let mut operation = None;
        let mut status = None;
        let mut error_code = None;
        let mut error_detail = None;
        let mut embedder = None;
        let mut context_id = None;
        let mut value = ValueArgs::default();
        let mut call_args = JsonObjectBuilder::default();

        let mut args = env::args().skip(1);
        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--tag" => set_once(&mut tag, next_value(&mut args, "--tag")?, "--tag")?,
                "--spec" => set_once(&mut spec, next_value(&mut args, "--spec")?, "--spec")?,
                "--bridge-version" => set_once(
                    &mut bridge_version,
                    next_value(&mut args, "--bridge-version")?,
                    "--bridge-version",
                )?,
                "--operation" => set_once(
                    &mut operation,
                    next_value(&mut args, "--operation")?,
                    "--operation",
                )?,
                "--status" => {
                    set_once(&mut status, next_value(&mut args, "--status")?, "--status")?
                }
                "--error-code" => set_once(
                    &mut error_code,
                    next_value(&mut args, "--error-code")?,
                    "--error-code",
                )?,
                "--error-detail" => set_once(
                    &mut error_detail,
                    next_value(&mut args, "--error-detail")?,
                    "--error-detail",
                )?,
                "--embedder" => set_once(
                    &mut embedder,
                    next_value(&mut args, "--embedder")?,
                    "--embedder",
                )?,
                "--context-id" => set_once(
                    &mut context_id,
                    next_value(&mut args, "--context-id")?,
                    "--context-id",
                )?,
                "--value-json" => value.set_inline(next_value(&mut args, "--value-json")?)?,
                "--value-file" => {
                    value.set_value_file(PathBuf::from(next_value(&mut args, "--value-file")?))?
                }
                "--call-args" => {
                    call_args.merge_json_string(&next_value(&mut args, "--call-args")?, "call args")?
                }
                "--call-args-file" => call_args.merge_json_file(
                    &PathBuf::from(next_value(&mut args, "--call-args-file")?),
                    "call args",
                )?,
                "--call-arg" => {
                    let (key, raw) = split_key_value(&next_value(&mut args, "--call-arg")?)?;
                    call_args.insert_string(key, raw);
                }
                "--call-arg-json" => {
                    let (key, raw) = split_key_value(&next_value(&mut args, "--call-arg-json")?)?;
                    call_args.insert_json_value(key, raw, "call args")?;
                }
                "-h" | "--help" => usage_and_exit(),
                other => bail!("Unknown flag: {other}"),
            }
        }

        Ok(Self {
            tag: require(tag, "--tag")?,
            spec: require(spec, "--spec")?,
            bridge_version: bridge_version.unwrap_or_else(|| "1".to_string()),
            operation: require(operation, "--operation")?,
            status: require(status, "--status")?,
            error_code,
            error_detail,
            embedder,
            context_id,
            value,
            call_args,
        })
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow::anyhow!("Missing value for {flag}"))
}

fn set_once(slot: &mut Option<String>, value: String, flag: &str) -> Result<()> {
    if slot.is_some() {
        bail!("{flag} provided multiple times");
    }
    *slot = Some(value);
    Ok(())
}

fn require(slot: Option<String>, flag: &str) -> Result<String> {
    slot.ok_or_else(|| anyhow::anyhow!("Missing required flag {flag}"))
}

fn split_key_value(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Expected KEY=VALUE, got '{raw}'");
    };
    if key.is_empty() {
        bail!("Expected non-empty key in '{raw}'");
    }
    Ok((key.to_string(), value.to_string()))
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        bail!("--tag must not be empty");
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        bail!("--tag must match ^[A-Za-z0-9_.-]+$, got {tag}");
    }
    Ok(())
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: emit-record --tag TAG --spec SPEC --operation OP --status STATUS [options]\n\nOptions:\n  --bridge-version V        Implementation version (default: 1)\n  --call-args JSON          Merge a JSON object into call.args\n  --call-args-file PATH     Merge a JSON object file into call.args\n  --call-arg KEY=VALUE      Set a string argument\n  --call-arg-json KEY=JSON  Set an argument from raw JSON\n  --value-json JSON         Result value for success records\n  --value-file PATH         Result value read from a JSON file\n  --error-code CODE         Machine-readable code for rejected/error records\n  --error-detail TEXT       Human-readable failure detail\n  --embedder NAME           Override the detected embedder label\n  --context-id ID           Override the detected context id"
    );
    std::process::exit(1);
}
