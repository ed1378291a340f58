//! Collects host metadata for inclusion in invocation records.
//!
//! The binary is intentionally lightweight because embedders invoke it for
//! every record. It reflects the current context id (from CLI or env),
//! captures the platform description, and emits a JSON `HostInfo` snapshot.

use anyhow::Result;
use hostbridge::detect_host_info;
use std::env;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli_context = parse_cli_context();

    let mut info = detect_host_info();
    if let Some(context_id) = cli_context {
        info.context_id = Some(context_id);
    }

    println!("{}", serde_json::to_string(&info)?);
    Ok(())
}

fn parse_cli_context() -> Option<String> {
    let mut args = env::args().skip(1);
    let first = args.next()?;
    if matches!(first.as_str(), "-h" | "--help") {
        usage_and_exit();
    }
    if args.next().is_some() {
        usage_and_exit();
    }
    Some(first)
}

fn usage_and_exit() -> ! {
    eprintln!("Usage: detect-host [CONTEXT_ID]");
    std::process::exit(1);
}
