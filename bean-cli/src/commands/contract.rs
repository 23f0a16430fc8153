//! Contract command implementation.

use anyhow::{Result, bail};
use clap::Args;
use tracing::error;

use bean_core::contract::{CallPut, Contract, ContractCache, ContractKind, format_expiry};

/// Arguments for the contract command
#[derive(Args, Debug)]
pub struct ContractArgs {
    /// Contract names, e.g. BTC-PERPETUAL or BTC-27DEC19-8000-C
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Parse each name and print its canonical form and fields.
pub fn run(args: &ContractArgs) -> Result<()> {
    let cache = ContractCache::new();
    let mut failed = 0;
    for name in &args.names {
        match cache.resolve(name) {
            Ok(contract) => println!("{}", describe(&contract)),
            Err(e) => {
                error!(contract = %name, error = %e, "Failed to parse contract");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} contract names failed to parse", args.names.len());
    }
    Ok(())
}

fn describe(contract: &Contract) -> String {
    let mut line = format!("{:<24} {:?} {}", contract.name(), contract.kind(), contract.underlying());
    if matches!(contract.kind(), ContractKind::Future | ContractKind::Option) {
        line.push_str(&format!(" expiry={}", format_expiry(contract.expiry())));
    }
    if contract.is_option() {
        let side = match contract.call_put() {
            CallPut::Call => "call",
            CallPut::Put => "put",
            CallPut::None => "-",
        };
        line.push_str(&format!(" strike={} {side}", contract.strike()));
    }
    line
}
