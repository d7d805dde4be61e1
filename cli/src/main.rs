// Copyright (c) 2026 Airgap Signer Contributors. MIT License.
// See LICENSE for details.

//! # Airgap CLI
//!
//! Entry point for the `airgap` binary. Parses CLI arguments, initializes
//! logging, and runs recorded QR reads through the signing pipeline.
//!
//! - `decode`: decode one read and print it as JSON
//! - `scan`: replay a frames file through a scan session and sign
//! - `wallet`: seal a seed and derive accounts into a wallet entry
//! - `networks`: list the built-in networks
//! - `version`: print build version information

mod cli;
mod input;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::signal;
use uuid::Uuid;
use zeroize::Zeroizing;

use airgap_protocol::account::{derive_account, Wallet};
use airgap_protocol::address::format_account_id;
use airgap_protocol::crypto::SoftwareKeyBackend;
use airgap_protocol::{
    decode, EncryptedSeed, NetworkRegistry, RawScanEvent, ScanOutcome, ScanSession, ScannerConfig,
    SeedRefs, WalletStore,
};

use cli::{AirgapCli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AirgapCli::parse();
    logging::init_logging(&cli.log, cli.log_format)?;

    let config = input::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Decode(args) => decode_read(args),
        Commands::Scan(args) => scan(args, config).await,
        Commands::Wallet(args) => new_wallet(args),
        Commands::Networks => list_networks(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Decodes a single read against the built-in registry.
fn decode_read(args: cli::DecodeArgs) -> Result<()> {
    let event = match (args.hex, args.text, args.payload) {
        (Some(raw), _, _) => RawScanEvent::from_hex(&raw, "")?,
        (_, Some(text), _) => RawScanEvent::text(text),
        (_, _, Some(payload)) => RawScanEvent::from_payload(&input::parse_hex(&payload)?)?,
        _ => bail!("one of --hex, --text or --payload is required"),
    };

    let decoded = decode(&event, &NetworkRegistry::with_defaults()).context("decode failed")?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

/// Replays a frames file through one scan session.
///
/// Every wallet seed is unlocked up front with the same PIN. A terminal
/// session is restarted before the next read so one file can carry several
/// requests.
async fn scan(args: cli::ScanArgs, config: ScannerConfig) -> Result<()> {
    let raw = std::fs::read_to_string(&args.wallets)
        .with_context(|| format!("failed to read wallets file {}", args.wallets.display()))?;
    let wallets: Vec<Wallet> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid wallets file {}", args.wallets.display()))?;

    let seeds = Arc::new(SeedRefs::new(Arc::new(SoftwareKeyBackend)));
    for wallet in &wallets {
        seeds
            .unlock(&wallet.encrypted_seed, &args.pin)
            .with_context(|| format!("failed to unlock wallet {}", wallet.name))?;
    }
    tracing::info!(wallets = wallets.len(), "wallets unlocked");

    let events = input::read_frames(&args.frames)?;
    let networks = Arc::new(RwLock::new(NetworkRegistry::with_defaults()));
    let session = ScanSession::new(
        config,
        Arc::clone(&networks),
        Arc::new(WalletStore::from_wallets(wallets)),
        seeds,
    );
    tracing::info!(session = %session.id(), reads = events.len(), "replaying scans");

    tokio::select! {
        res = replay(&session, &networks, events) => res,
        _ = signal::ctrl_c() => {
            tracing::info!("interrupt received, locking seeds");
            session.on_background();
            Ok(())
        }
    }
}

async fn replay(
    session: &ScanSession,
    networks: &RwLock<NetworkRegistry>,
    events: Vec<(usize, RawScanEvent)>,
) -> Result<()> {
    for (line, event) in events {
        match session.on_scan(event).await {
            Ok(ScanOutcome::Progress(progress)) => {
                tracing::info!(
                    line,
                    completed = progress.completed,
                    total = progress.total,
                    missing = ?progress.missing,
                    "frame accepted"
                );
            }
            Ok(ScanOutcome::Suppressed) | Ok(ScanOutcome::Busy) => {
                tracing::debug!(line, "read ignored");
            }
            Ok(ScanOutcome::Address(address)) => {
                println!("{}", format_account_id(&address));
            }
            Ok(ScanOutcome::AddNetwork(spec)) => {
                let title = spec.title.clone();
                let key = networks.write().add_network(spec);
                println!("added network {title} ({key})");
            }
            Ok(ScanOutcome::Signed(result)) => {
                println!("{}", result.renderable_payload);
            }
            Err(e) => {
                tracing::warn!(line, error = %e, "scan failed");
                eprintln!("line {line}: {}", e.user_message());
            }
        }

        if session.state().is_terminal() {
            session.restart();
        }
    }

    if session.progress().total > 0 {
        let progress = session.progress();
        bail!(
            "frames file ended with {} of {} frames",
            progress.completed,
            progress.total
        );
    }
    Ok(())
}

/// Seals a seed under a PIN and prints a one-wallet array ready for `scan`.
fn new_wallet(args: cli::WalletArgs) -> Result<()> {
    let seed = Zeroizing::new(input::parse_hex(&args.seed).context("invalid seed")?);
    let registry = NetworkRegistry::with_defaults();

    let mut accounts = Vec::with_capacity(args.accounts.len());
    for value in &args.accounts {
        let spec = input::parse_account_spec(value)?;
        let network = registry
            .get(&spec.network_key)
            .with_context(|| format!("unknown network {}", spec.network_key))?;
        let account = derive_account(&SoftwareKeyBackend, &seed, &spec.path, spec.scheme, network)
            .with_context(|| format!("failed to derive {value}"))?;
        tracing::info!(address = %account.address, network = %network.title(), "account derived");
        accounts.push(account);
    }

    let encrypted_seed = EncryptedSeed::seal(Uuid::new_v4().to_string(), &seed, &args.pin)
        .context("failed to seal seed")?;
    let wallet = Wallet {
        id: Uuid::new_v4().to_string(),
        name: args.name,
        encrypted_seed,
        accounts,
    };
    println!("{}", serde_json::to_string_pretty(&[wallet])?);
    Ok(())
}

fn list_networks() -> Result<()> {
    let registry = NetworkRegistry::with_defaults();
    for network in registry.iter() {
        println!(
            "{:<10} {:<12} {}",
            format!("{:?}", network.protocol()).to_lowercase(),
            network.title(),
            network.network_key()
        );
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("airgap {}", env!("CARGO_PKG_VERSION"));
    println!("rustc  {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}
