//! verdant: command-line host for the Verdant token chain.
//!
//! Every invocation opens the state database, performs one command and exits:
//!   init      apply genesis from a params JSON file
//!   apply     execute one call read from a JSON file
//!   balance   show token, native and vesting balances of an address
//!   sale      show the status of a crowdsale
//!   receipts  list committed calls and the events they emitted

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use verdant_core::types::{Address, Timestamp};
use verdant_genesis::{apply_genesis, GenesisParams};
use verdant_sale::SaleTerms;
use verdant_state::{Call, ChainState, Contract, StateDb, StateEngine};

#[derive(Parser, Debug)]
#[command(name = "verdant", version, about = "Verdant token chain host")]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.verdant/data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the genesis state.
    Init {
        /// Path to genesis params JSON.
        #[arg(long)]
        params: PathBuf,
    },
    /// Execute a call.
    Apply {
        /// Path to the call JSON.
        #[arg(long)]
        call: PathBuf,
        /// Block timestamp override (unix seconds). Defaults to the wall clock.
        #[arg(long)]
        now: Option<Timestamp>,
    },
    /// Show balances of an account.
    Balance { address: Address },
    /// Show the status of a deployed crowdsale.
    Sale {
        address: Address,
        #[arg(long)]
        now: Option<Timestamp>,
    },
    /// List every committed call.
    Receipts,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,verdant=debug")),
        )
        .init();

    let args = Args::parse();

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);

    match args.command {
        Command::Init { params } => {
            let json = std::fs::read_to_string(&params)
                .with_context(|| format!("reading genesis params from {}", params.display()))?;
            let params = GenesisParams::from_json(&json).context("parsing genesis params JSON")?;
            let state = apply_genesis(&db, &params).context("applying genesis")?;
            println!("token      {}", state.token.address);
            println!("supply     {}", state.token.total_supply());
        }
        Command::Apply { call, now } => {
            let json = std::fs::read_to_string(&call)
                .with_context(|| format!("reading call from {}", call.display()))?;
            let call: Call = serde_json::from_str(&json).context("parsing call JSON")?;
            let now = now.unwrap_or_else(|| chrono::Utc::now().timestamp());

            let mut engine = StateEngine::open(Arc::clone(&db)).context("loading chain state")?;
            let receipt = engine
                .apply(&call, now)
                .with_context(|| format!("call {} reverted", call.action.name()))?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Command::Balance { address } => {
            let engine = StateEngine::open(Arc::clone(&db)).context("loading chain state")?;
            print_balance(engine.state(), &address);
        }
        Command::Sale { address, now } => {
            let engine = StateEngine::open(Arc::clone(&db)).context("loading chain state")?;
            let now = now.unwrap_or_else(|| chrono::Utc::now().timestamp());
            print_sale(engine.state(), &address, now)?;
        }
        Command::Receipts => {
            for r in db.receipts().context("reading receipts")? {
                println!("#{:<6} {:>12} {} {} {:?}", r.index, r.at, r.from, r.action, r.outcome);
                for event in db.events_of(r.index).context("reading events")? {
                    println!("        {:?}", event);
                }
            }
        }
    }

    info!("done");
    Ok(())
}

fn print_balance(state: &ChainState, address: &Address) {
    let token = &state.token;
    println!("address    {}", address);
    println!("{:<10} {}", token.symbol, token.balance_of(address));
    println!("native     {}", state.native.balance_of(address));
    if token.is_feeless(address) {
        println!("feeless    yes");
    }
    if token.is_blacklisted(address) {
        println!("blacklist  yes");
    }
    if token.is_transfer_restricted(address, state.last_time) {
        println!("throttled  until cooldown ends");
    }
    if let Ok(line) = state.vesting.describe(token, address, state.last_time) {
        println!("{}", line);
    }
}

fn print_sale(state: &ChainState, address: &Address, now: Timestamp) -> anyhow::Result<()> {
    let contract = state
        .contract(address)
        .with_context(|| format!("no contract at {}", address))?;
    let (terms, raised, phase): (&SaleTerms, u128, _) = match contract {
        Contract::Crowdsale(s) => (s.terms(), s.wei_raised(), s.phase(&state.token, now)),
        Contract::VestingCrowdsale(s) => (s.terms(), s.wei_raised(), s.phase(&state.token, now)),
        Contract::Distributor(d) => {
            println!("distributor {}", address);
            println!("wallet      {}", d.wallet());
            println!("allocated   {}", d.total_allocated());
            println!("budget      {}", d.remaining_budget(&state.token));
            return Ok(());
        }
    };
    println!("{} {}", contract.kind(), address);
    println!("phase       {:?}", phase);
    println!("window      {} .. {}", terms.opening, terms.closing);
    println!("rate        {}", terms.current_rate(now));
    println!("wei raised  {}", raised);
    println!("remaining   {}", terms.remaining_tokens(&state.token, address));
    Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
