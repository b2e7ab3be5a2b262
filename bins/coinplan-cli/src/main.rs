//! coinplan command-line interface.
//!
//! Plans unsigned spends against a JSON UTXO snapshot exported from an
//! indexing backend and prints the resulting transaction skeleton as JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;

use coinplan_core::address::Address;
use coinplan_core::types::{FeeRate, OutPoint};
use coinplan_core::utxo_source::{MemoryUtxoSource, SnapshotFile};
use coinplan_wallet::{
    HdChangeResolver, KeyChain, Seed, SelectionStrategy, SpendConfig, SpendPlanner, SpendRequest, UtxoSnapshot,
};

/// Environment variable holding the wallet password for HD change.
const PASSWORD_ENV: &str = "COINPLAN_WALLET_PASSWORD";

/// coinplan: coin selection and transaction planning for light wallets.
#[derive(Parser)]
#[command(name = "coinplan-cli", version, about = "Plan unsigned transactions from a UTXO snapshot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML). Defaults to <config dir>/coinplan/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Select coins and assemble an unsigned transaction skeleton.
    Plan(PlanArgs),
    /// Show the balance breakdown and the largest sendable amount.
    Summary(SummaryArgs),
}

#[derive(Args)]
struct PlanArgs {
    /// Snapshot file (JSON with `height` and `utxos`)
    #[arg(long)]
    snapshot: PathBuf,

    /// Destination address
    #[arg(long)]
    to: Address,

    /// Amount to send in satoshis
    #[arg(long)]
    amount: u64,

    /// Fee rate in sat/vB (up to three decimals)
    #[arg(long, default_value = "1")]
    fee_rate: FeeRate,

    /// Selection strategy
    #[arg(long, default_value = "best-fit")]
    strategy: SelectionStrategy,

    /// Deduct the fee from the amount instead of adding it
    #[arg(long)]
    subtract_fee: bool,

    /// Send change here instead of a derived or source address
    #[arg(long)]
    change_address: Option<Address>,

    /// Input cap (defaults to the configured value)
    #[arg(long)]
    max_inputs: Option<usize>,

    /// Minimum confirmations for a UTXO to be spendable
    #[arg(long, default_value_t = 1)]
    min_conf: u64,

    /// Spend exactly these outpoints (comma-separated txid:vout)
    #[arg(long, value_delimiter = ',')]
    manual: Vec<OutPoint>,

    /// Hex seed for HD change derivation; password is read from COINPLAN_WALLET_PASSWORD
    #[arg(long)]
    seed_hex: Option<String>,

    /// Account to derive HD change under (defaults to the configured one)
    #[arg(long, requires = "seed_hex")]
    account: Option<u32>,
}

#[derive(Args)]
struct SummaryArgs {
    /// Snapshot file (JSON with `height` and `utxos`)
    #[arg(long)]
    snapshot: PathBuf,

    /// Fee rate in sat/vB used for the send-max figure
    #[arg(long, default_value = "1")]
    fee_rate: FeeRate,

    /// Minimum confirmations for a UTXO to be spendable
    #[arg(long, default_value_t = 1)]
    min_conf: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = load_config(cli.config.as_deref())?;
    let planner = SpendPlanner::new(config);

    match cli.command {
        Commands::Plan(args) => plan(&planner, args).await,
        Commands::Summary(args) => summary(&planner, args).await,
    }
}

/// Select and assemble, then print the skeleton.
async fn plan(planner: &SpendPlanner, args: PlanArgs) -> Result<()> {
    let snapshot = load_snapshot(planner, &args.snapshot).await?;

    let mut policy = planner
        .config()
        .default_policy()
        .with_strategy(args.strategy)
        .with_fee_rate(args.fee_rate)
        .with_min_confirmations(args.min_conf)
        .with_subtract_fee(args.subtract_fee);
    if let Some(max_inputs) = args.max_inputs {
        policy = policy.with_max_inputs(max_inputs);
    }
    if let Some(address) = args.change_address {
        policy = policy.with_change_address(address);
    }
    if !args.manual.is_empty() {
        policy = policy.with_manual_selection(args.manual);
    } else if args.strategy == SelectionStrategy::Manual {
        bail!("--strategy manual requires --manual <txid:vout,...>");
    }

    let request = SpendRequest {
        destination: args.to,
        amount: args.amount,
        policy,
    };

    let keychain = match &args.seed_hex {
        Some(seed_hex) => {
            let password = std::env::var(PASSWORD_ENV)
                .with_context(|| format!("{PASSWORD_ENV} must be set when --seed-hex is given"))?;
            Some((KeyChain::new(parse_seed(seed_hex)?, &password)?, password))
        }
        None => None,
    };
    let resolver = keychain.as_ref().map(|(keychain, password)| {
        let resolver = HdChangeResolver::from_config(keychain, planner.config()).with_password(password.as_str());
        match args.account {
            Some(account) => resolver.with_account(account),
            None => resolver,
        }
    });

    let skeleton = planner
        .plan(&snapshot, &request, resolver.as_ref())
        .context("Failed to plan spend")?;

    println!("{}", serde_json::to_string_pretty(&skeleton)?);
    Ok(())
}

/// Print balances and the send-max amount.
async fn summary(planner: &SpendPlanner, args: SummaryArgs) -> Result<()> {
    let snapshot = load_snapshot(planner, &args.snapshot).await?;
    let policy = planner
        .config()
        .default_policy()
        .with_fee_rate(args.fee_rate)
        .with_min_confirmations(args.min_conf);

    let report = json!({
        "height": snapshot.height,
        "balance": planner.summary(&snapshot),
        "max_spendable": planner.max_spendable(&snapshot, &policy),
        "fee_rate": args.fee_rate.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Read a snapshot file and fetch it back through the planner.
async fn load_snapshot(planner: &SpendPlanner, path: &Path) -> Result<UtxoSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let file: SnapshotFile = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid snapshot JSON: {}", path.display()))?;

    let source = MemoryUtxoSource::from_snapshot(file);
    let addresses: Vec<Address> = source.addresses().cloned().collect();
    let snapshot = planner
        .fetch_snapshot(&source, &addresses)
        .await
        .context("Failed to fetch UTXOs")?;
    info!(
        height = snapshot.height,
        listed = source.utxo_count(),
        utxos = snapshot.utxos.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Load config from an explicit path or the default location.
fn load_config(path: Option<&Path>) -> Result<SpendConfig> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => dirs::config_dir().map(|dir| dir.join("coinplan").join("config.toml")),
    };
    SpendConfig::load(path.as_deref()).context("Failed to load config")
}

/// Decode a 32-byte hex seed.
fn parse_seed(s: &str) -> Result<Seed> {
    let bytes = hex::decode(s.trim()).context("Seed is not valid hex")?;
    let Ok(bytes) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        bail!("Seed must be 32 bytes, got {}", bytes.len());
    };
    Ok(Seed::from_bytes(bytes))
}

/// Initialize the tracing subscriber with the given level and format.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    // Logs go to stderr so stdout stays clean JSON.
    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
