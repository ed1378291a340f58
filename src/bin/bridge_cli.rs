//! Top-level CLI for the hostbridge harness.
//!
//! `bridge --list` and `bridge --invoke` run in-process against the shipped
//! catalog and default registry; `bridge --check` delegates to the
//! `record-check` helper so pipelines like `bridge --invoke ... | bridge
//! --check` keep working from an installed location. `HOSTBRIDGE_ROOT` is
//! injected for delegated helpers when possible.

use anyhow::{Context, Result, bail};
use hostbridge::{
    BridgeRegistry, BridgeTag, HostContext, OperationId, SpecIndex, default_catalog_path,
    find_bundle_root, find_on_path, helper_is_executable, resolve_helper_binary,
};
use serde_json::Value;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse()?;

    match cli.command {
        CommandTarget::List => run_list(),
        CommandTarget::Invoke {
            tag,
            operation,
            args,
        } => run_invoke(&tag, &operation, &args),
        CommandTarget::Check { trailing_args } => run_check(&trailing_args),
    }
}

struct Cli {
    command: CommandTarget,
}

enum CommandTarget {
    List,
    Invoke {
        tag: BridgeTag,
        operation: OperationId,
        args: Value,
    },
    Check {
        trailing_args: Vec<OsString>,
    },
}

impl Cli {
    fn parse() -> Result<Self> {
        let mut args = env::args_os();
        let _program = args.next();

        let Some(flag) = args.next() else {
            usage(1);
        };

        let flag_str = flag
            .to_str()
            .with_context(|| "Invalid UTF-8 in command flag")?;

        let command = match flag_str {
            "--list" | "-l" => {
                if args.next().is_some() {
                    usage(1);
                }
                CommandTarget::List
            }
            "--invoke" | "-i" => parse_invoke(args)?,
            "--check" | "-c" => CommandTarget::Check {
                trailing_args: args.collect(),
            },
            "--help" | "-h" => usage(0),
            _ => usage(1),
        };

        Ok(Self { command })
    }
}

fn parse_invoke(mut args: env::ArgsOs) -> Result<CommandTarget> {
    let tag = next_utf8(&mut args, "TAG")?;
    let operation = next_utf8(&mut args, "OPERATION")?;

    let mut call_args = Value::Object(Default::default());
    while let Some(arg) = args.next() {
        let arg = arg.to_str().with_context(|| "Invalid UTF-8 in argument")?;
        match arg {
            "--args" => {
                let raw = next_utf8(&mut args, "--args JSON")?;
                call_args = serde_json::from_str(&raw).context("Invalid JSON for --args")?;
            }
            other => bail!("Unknown flag for --invoke: {other}"),
        }
    }

    Ok(CommandTarget::Invoke {
        tag: BridgeTag(tag),
        operation: OperationId(operation),
        args: call_args,
    })
}

fn next_utf8(args: &mut env::ArgsOs, what: &str) -> Result<String> {
    let Some(value) = args.next() else {
        bail!("Missing {what}");
    };
    value
        .to_str()
        .map(str::to_string)
        .with_context(|| format!("Invalid UTF-8 in {what}"))
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: bridge (--list | --invoke TAG OPERATION [--args JSON] | --check [args])\n\nCommands:\n  --list, -l     List registered bridges with their declared operations.\n  --invoke, -i   Dispatch one operation and print the invocation record (JSON).\n  --check, -c    Read record NDJSON from stdin and print a validation summary.\n\nExamples:\n  bridge --invoke foundation_models greet --args '{{\"name\":\"World\"}}'\n  bridge --invoke foundation_models add --args '{{\"a\":2,\"b\":3}}' | bridge --check"
    );
    std::process::exit(code);
}

fn build_context() -> Result<HostContext> {
    let bundle_root = find_bundle_root()?;
    let catalog_path = default_catalog_path(&bundle_root);
    let specs = SpecIndex::load(&catalog_path)
        .with_context(|| format!("loading spec catalog from {}", catalog_path.display()))?;
    let registry = BridgeRegistry::with_defaults()?;
    HostContext::new(registry, specs)
}

fn run_list() -> Result<()> {
    let context = build_context()?;
    println!("registered bridges ({})", context.catalog_key().0);

    for (tag, bridge) in context.registry().iter() {
        let spec_key = bridge.spec_key();
        let available = if bridge.available(context.host()) {
            "available"
        } else {
            "unavailable"
        };
        println!(
            "  {} (spec {}, version {}, {})",
            tag.0, spec_key.0, bridge.version(), available
        );

        let Some(spec) = context.specs().spec(&spec_key) else {
            continue;
        };
        for op in &spec.operations {
            let params: Vec<String> = op
                .params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.kind.as_str()))
                .collect();
            println!(
                "    {}({}) -> {}",
                op.id.0,
                params.join(", "),
                op.returns.as_str()
            );
        }
    }
    Ok(())
}

fn run_invoke(tag: &BridgeTag, operation: &OperationId, args: &Value) -> Result<()> {
    let context = build_context()?;
    let record = context.dispatch(tag, operation, args)?;
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

/// Locate the requested helper, preferring the bundle-synced binaries.
///
/// The search order mirrors the harness contract: bundle root, sibling
/// directory to the current executable (useful for installed binaries),
/// then PATH.
fn resolve_helper(name: &str, bundle_root: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = bundle_root {
        if let Ok(path) = resolve_helper_binary(root, name) {
            return Ok(path);
        }
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let candidate = dir.join(name);
            if helper_is_executable(&candidate) {
                return Ok(candidate);
            }
        }
    }

    if let Some(path) = find_on_path(name) {
        return Ok(path);
    }

    bail!("Unable to locate helper '{name}'. Run 'cargo build --bins' or set HOSTBRIDGE_ROOT.")
}

/// Execute record-check, wiring HOSTBRIDGE_ROOT when available.
fn run_check(trailing_args: &[OsString]) -> Result<()> {
    let bundle_root = find_bundle_root().ok();
    let helper_path = resolve_helper("record-check", bundle_root.as_deref())?;
    let mut command = Command::new(&helper_path);
    command.args(trailing_args);

    if let Some(root) = bundle_root {
        if env::var_os("HOSTBRIDGE_ROOT").is_none() {
            command.env("HOSTBRIDGE_ROOT", root);
        }
    }

    let status = command
        .status()
        .with_context(|| format!("Failed to execute {}", helper_path.display()))?;

    if status.success() {
        return Ok(());
    }

    if let Some(code) = status.code() {
        std::process::exit(code);
    }

    bail!("Helper terminated by signal")
}
