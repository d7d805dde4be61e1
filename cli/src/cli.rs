//! # CLI Interface
//!
//! Command-line structure for `airgap`, built with `clap` derive. The
//! subcommands are `decode`, `scan`, `wallet`, `networks` and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Offline signer toolkit.
///
/// Replays recorded QR reads through the same decode, reassembly,
/// classification and signing pipeline the device runs.
#[derive(Parser, Debug)]
#[command(
    name = "airgap",
    about = "Replay QR scans through the air-gapped signing pipeline",
    version,
    propagate_version = true
)]
pub struct AirgapCli {
    /// Scanner configuration file (TOML). Defaults apply when omitted.
    #[arg(long, short = 'c', global = true, env = "AIRGAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Default log filter, overridden by `RUST_LOG`.
    #[arg(
        long,
        global = true,
        env = "AIRGAP_LOG",
        default_value = "airgap=info,airgap_protocol=info"
    )]
    pub log: String,

    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "AIRGAP_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a single QR read and print it as JSON.
    Decode(DecodeArgs),
    /// Feed a file of recorded reads through a scan session.
    Scan(ScanArgs),
    /// Seal a seed under a PIN and derive accounts into a wallet entry.
    Wallet(WalletArgs),
    /// List the built-in networks.
    Networks,
    /// Print version information and exit.
    Version,
}

/// Exactly one input source is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct DecodeArgs {
    /// Raw byte-mode codewords as hex, as the camera library reports them.
    #[arg(long)]
    pub hex: Option<String>,

    /// Text decoding of the QR code (addresses, JSON requests).
    #[arg(long)]
    pub text: Option<String>,

    /// Bare payload hex without the QR envelope; wrapped before decoding.
    #[arg(long)]
    pub payload: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// One read per line: `hex:<raw>`, `text:<payload>` or `payload:<hex>`.
    /// Blank lines and lines starting with `#` are skipped.
    #[arg(long, short = 'f')]
    pub frames: PathBuf,

    /// JSON array of wallets, as written by `airgap wallet`.
    #[arg(long, short = 'w')]
    pub wallets: PathBuf,

    /// PIN that unlocks the wallet seeds.
    #[arg(long, env = "AIRGAP_PIN", hide_env_values = true)]
    pub pin: String,
}

#[derive(Args, Debug)]
pub struct WalletArgs {
    /// Display name of the wallet.
    #[arg(long)]
    pub name: String,

    /// Seed bytes as hex.
    #[arg(long, env = "AIRGAP_SEED", hide_env_values = true)]
    pub seed: String,

    /// PIN to seal the seed under.
    #[arg(long, env = "AIRGAP_PIN", hide_env_values = true)]
    pub pin: String,

    /// Account to derive, as `<scheme>:<path>:<network key>`, e.g.
    /// `ed25519://kusama//0:0xb0a8...` or `ethereum:m/44'/60'/0'/0/0:1`.
    #[arg(long = "account", short = 'a')]
    pub accounts: Vec<String>,
}
