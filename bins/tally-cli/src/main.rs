//! tally-cli: Operate a Tally mutual-credit network from the shell.
//!
//! Every command loads the state file, applies one operation, and writes the
//! state back. Accounts are given either as `0x`-prefixed hex ids or as
//! free-form labels hashed into ids.

mod state;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tally_core::amount::{format_credits, parse_credits};
use tally_core::traits::CreditLedger;
use tally_demurrage::SupplyBasis;
use tally_ledger::LedgerConfig;
use tracing::info;

use crate::state::Session;

/// Tally mutual-credit ledger.
#[derive(Parser)]
#[command(name = "tally-cli")]
#[command(version, about = "Mutual-credit ledger with demurrage-based loss sharing.")]
struct Cli {
    /// Config file (TOML). Defaults and TALLY_* env vars apply regardless.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// State file (default: <data_dir>/<state_file> from config).
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new network state file.
    Init(InitArgs),
    /// Issue new credit to an account.
    Mint(MintArgs),
    /// Transfer credit between accounts.
    Transfer(TransferArgs),
    /// Record a credit-line default as network debt.
    #[command(name = "default")]
    RecordDefault(DefaultArgs),
    /// Distribute network debt across all holders.
    Demurrage(DemurrageArgs),
    /// Settle an account's demurraged balance and reimburse it.
    Burn(AccountArgs),
    /// Add collected fees to the reserve pool.
    DepositReserve(DepositArgs),
    /// Show an account's balances.
    Balance(AccountArgs),
    /// Show network totals and holders.
    Status(StatusArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Initial allocation as label=amount (repeatable).
    #[arg(short, long = "allocate", value_name = "ACCOUNT=AMOUNT")]
    allocations: Vec<String>,

    /// Supply basis for demurrage ("genesis" or "rolling"). Overrides config.
    #[arg(long)]
    basis: Option<String>,

    /// Initial reserve funds, in credits.
    #[arg(long, default_value = "0")]
    reserve: String,

    /// Overwrite an existing state file.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct MintArgs {
    account: String,
    /// Amount in credits (e.g. 10.5).
    amount: String,
}

#[derive(Args)]
struct TransferArgs {
    from: String,
    to: String,
    /// Amount in credits (e.g. 10.5).
    amount: String,
}

#[derive(Args)]
struct DefaultArgs {
    /// The defaulting account.
    account: String,
    /// Defaulted amount in credits.
    amount: String,
}

#[derive(Args)]
struct DemurrageArgs {
    /// Amount of network debt to distribute, in credits.
    amount: String,
}

#[derive(Args)]
struct DepositArgs {
    /// Amount in credits.
    amount: String,
}

#[derive(Args)]
struct AccountArgs {
    account: String,
}

#[derive(Args)]
struct StatusArgs {
    /// Print machine-readable JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = LedgerConfig::load(cli.config.as_deref()).context("failed to load config")?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, &cli.log_format);

    let state_path = cli.state.clone().unwrap_or_else(|| config.state_path());
    info!(state = %state_path.display(), "tally-cli v{}", env!("CARGO_PKG_VERSION"));

    if let Commands::Init(args) = &cli.command {
        return init(args, &config, &state_path);
    }

    let mut session = Session::load(&state_path)?;
    let dirty = run(&cli.command, &mut session)?;
    if dirty {
        session.save(&state_path)?;
    }
    Ok(())
}

/// Apply a command. Returns whether state changed.
fn run(command: &Commands, session: &mut Session) -> Result<bool> {
    match command {
        Commands::Init(_) => bail!("init is handled before loading state"),
        Commands::Mint(args) => {
            let account = session.account(&args.account)?;
            let amount = parse_amount(&args.amount)?;
            let receipt = session.network.mint(&account, amount)?;
            println!(
                "Issued {} to {}",
                format_credits(receipt.amount),
                session.name(&account)
            );
            if let Some(s) = receipt.settlement {
                print_settlement(session, &s);
            }
        }
        Commands::Transfer(args) => {
            let from = session.account(&args.from)?;
            let to = session.account(&args.to)?;
            let amount = parse_amount(&args.amount)?;
            let receipt = session.network.transfer(&from, &to, amount)?;
            for s in &receipt.settlements {
                print_settlement(session, s);
            }
            println!(
                "Transferred {} from {} to {}",
                format_credits(receipt.amount),
                session.name(&from),
                session.name(&to)
            );
        }
        Commands::RecordDefault(args) => {
            let account = session.account(&args.account)?;
            let amount = parse_amount(&args.amount)?;
            let debt = session.network.record_default(&account, amount)?;
            println!(
                "Recorded default of {} by {}; network debt is now {}",
                format_credits(amount),
                session.name(&account),
                format_credits(debt)
            );
        }
        Commands::Demurrage(args) => {
            let amount = parse_amount(&args.amount)?;
            let outcome = session.network.demurrage_members(amount)?;
            println!(
                "Demurraged {}: conversion rate {} -> {}; remaining network debt {}",
                format_credits(outcome.amount),
                outcome.rate_before,
                outcome.rate_after,
                format_credits(outcome.remaining_debt)
            );
        }
        Commands::Burn(args) => {
            let account = session.account(&args.account)?;
            let s = session.network.burn_demurraged(&account)?;
            if s.loss == 0 {
                println!("{} has no demurraged balance", session.name(&account));
                return Ok(false);
            }
            print_settlement(session, &s);
        }
        Commands::DepositReserve(args) => {
            let amount = parse_amount(&args.amount)?;
            let available = session.reserve.deposit_fees(amount);
            println!("Reserve now holds {}", format_credits(available));
        }
        Commands::Balance(args) => {
            let account = session.account(&args.account)?;
            println!("Account:     {}", session.name(&account));
            println!(
                "Balance:     {}",
                format_credits(session.network.balance_of(&account))
            );
            println!(
                "Demurraged:  {}",
                format_credits(session.network.demurraged_balance_of(&account))
            );
            println!(
                "Reimbursed:  {}",
                format_credits(session.reserve.reimbursed_to(&account))
            );
            return Ok(false);
        }
        Commands::Status(args) => {
            print_status(session, args.json)?;
            return Ok(false);
        }
    }
    Ok(true)
}

fn init(args: &InitArgs, config: &LedgerConfig, path: &std::path::Path) -> Result<()> {
    if path.exists() && !args.force {
        bail!(
            "state file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    let basis = match &args.basis {
        Some(b) => parse_basis(b)?,
        None => config.supply_basis,
    };
    let reserve = parse_amount(&args.reserve)?;

    let mut session = Session::fresh(basis, reserve);
    for allocation in &args.allocations {
        let (label, amount) = parse_allocation(allocation)?;
        let account = session.account(label)?;
        session.network.mint(&account, amount)?;
    }
    session.save(path)?;

    println!("Initialised network at {}", path.display());
    println!("Supply basis: {basis:?}");
    println!(
        "Total supply: {} across {} holders",
        format_credits(session.network.total_supply()),
        session.network.holder_count()
    );
    Ok(())
}

fn print_settlement(session: &Session, s: &tally_demurrage::Settlement) {
    println!(
        "Settled {} for {}: reimbursed {}",
        format_credits(s.loss),
        session.name(&s.account),
        format_credits(s.reimbursed)
    );
    if s.shortfall() > 0 {
        println!("  reserve shortfall: {}", format_credits(s.shortfall()));
    }
}

fn print_status(session: &Session, json: bool) -> Result<()> {
    let status = session.network.status();
    if json {
        let holders: Vec<serde_json::Value> = session
            .network
            .holders()
            .into_iter()
            .map(|(id, balance)| {
                serde_json::json!({
                    "account": id.to_string(),
                    "label": session.labels.get(&id),
                    "balance": balance,
                    "demurraged": session.network.demurraged_balance_of(&id),
                })
            })
            .collect();
        let out = serde_json::json!({ "status": status, "holders": holders });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("=== Network status ===");
    println!("Supply basis:          {:?}", status.supply_basis);
    println!("Conversion rate:       {}", status.conversion_rate);
    println!("Total supply:          {}", format_credits(status.total_supply));
    println!("Displayed supply:      {}", format_credits(status.displayed_supply));
    println!("Network debt:          {}", format_credits(status.network_debt));
    println!("Total defaulted:       {}", format_credits(status.total_defaulted));
    println!(
        "Cumulative demurrage:  {}",
        format_credits(status.cumulative_demurrage)
    );
    if let Some(s) = status.nominal_supply {
        println!("Nominal supply (S):    {}", format_credits(s));
    }
    println!("Reserve available:     {}", format_credits(status.reserve_available));
    println!("\nHolders ({}):", status.holders);
    for (id, balance) in session.network.holders() {
        println!(
            "  {:<60} {:>20}  (demurraged {})",
            session.name(&id),
            format_credits(balance),
            format_credits(session.network.demurraged_balance_of(&id))
        );
    }
    Ok(())
}

/// Parse a decimal credit amount.
fn parse_amount(s: &str) -> Result<u64> {
    parse_credits(s).with_context(|| format!("invalid amount: {s}"))
}

/// Parse `label=amount`.
fn parse_allocation(s: &str) -> Result<(&str, u64)> {
    let (label, amount) = s
        .split_once('=')
        .with_context(|| format!("allocation must be ACCOUNT=AMOUNT: {s}"))?;
    let label = label.trim();
    if label.is_empty() {
        bail!("allocation has an empty account: {s}");
    }
    Ok((label, parse_amount(amount.trim())?))
}

fn parse_basis(s: &str) -> Result<SupplyBasis> {
    match s.to_lowercase().as_str() {
        "genesis" => Ok(SupplyBasis::Genesis),
        "rolling" => Ok(SupplyBasis::Rolling),
        _ => bail!("invalid supply basis (must be 'genesis' or 'rolling')"),
    }
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
