//! CLI entry point for CivicDesk.
//!
//! # Responsibility
//! - Without arguments, print a deterministic `civicdesk_core` linkage check.
//! - With a script path, replay its requests against a fresh substrate and
//!   print one JSON response per line.

use civicdesk_core::{Amount, CoreConfig, Identity, Request, Substrate};
use serde::Deserialize;
use std::path::Path;
use std::process::ExitCode;

/// Replayable call script.
#[derive(Debug, Deserialize)]
struct ScriptFile {
    deployer: Identity,
    #[serde(default)]
    deployed_at: i64,
    /// Ledger balances minted before the first request.
    #[serde(default)]
    funding: Vec<Funding>,
    requests: Vec<Request>,
}

#[derive(Debug, Deserialize)]
struct Funding {
    account: Identity,
    amount: Amount,
}

fn main() -> ExitCode {
    let Some(script_path) = std::env::args().nth(1) else {
        println!("civicdesk_core ping={}", civicdesk_core::ping());
        println!("civicdesk_core version={}", civicdesk_core::core_version());
        return ExitCode::SUCCESS;
    };

    match run_script(Path::new(&script_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("civicdesk: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(path: &Path) -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    config.init_logging().map_err(|err| err.to_string())?;

    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read script `{}`: {err}", path.display()))?;
    let script: ScriptFile = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid script `{}`: {err}", path.display()))?;

    let substrate = Substrate::open(&config, &script.deployer, script.deployed_at)
        .map_err(|err| format!("substrate init failed: {err}"))?;
    for Funding { account, amount } in &script.funding {
        substrate
            .fund(account, *amount)
            .map_err(|err| format!("funding `{account}` failed: {err}"))?;
    }

    log::info!(
        "event=script_run module=cli status=start requests={}",
        script.requests.len()
    );
    for request in script.requests {
        let response = substrate.submit(request);
        let line = serde_json::to_string(&response)
            .map_err(|err| format!("cannot encode response {}: {err}", response.sequence))?;
        println!("{line}");
    }
    Ok(())
}
