//! Reading recorded scans, wallet account specs and scanner configuration
//! from disk.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use airgap_protocol::crypto::SignatureScheme;
use airgap_protocol::{RawScanEvent, ScannerConfig};

/// Load a scanner configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ScannerConfig> {
    let Some(path) = path else {
        return Ok(ScannerConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

/// Decode a hex argument, with or without a `0x` prefix.
pub fn parse_hex(value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(value).with_context(|| format!("not valid hex: {value:.16}"))
}

/// Parse one line of a frames file. `Ok(None)` for blank and comment lines.
pub fn parse_frame_line(line: &str) -> Result<Option<RawScanEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (kind, value) = line
        .split_once(':')
        .ok_or_else(|| anyhow!("expected `hex:`, `text:` or `payload:` prefix"))?;
    let event = match kind {
        "hex" => RawScanEvent::from_hex(value, "")?,
        "text" => RawScanEvent::text(value),
        "payload" => RawScanEvent::from_payload(&parse_hex(value)?)?,
        other => bail!("unknown read kind `{other}`"),
    };
    Ok(Some(event))
}

/// Read every scan in a frames file, paired with its 1-based line number.
pub fn read_frames(path: &Path) -> Result<Vec<(usize, RawScanEvent)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read frames file {}", path.display()))?;
    let mut events = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line_no = index + 1;
        if let Some(event) = parse_frame_line(line)
            .with_context(|| format!("{}:{line_no}", path.display()))?
        {
            events.push((line_no, event));
        }
    }
    Ok(events)
}

/// An account to derive into a new wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    pub scheme: SignatureScheme,
    pub path: String,
    pub network_key: String,
}

/// Parse `<scheme>:<path>:<network key>`. The path may itself contain `:`.
pub fn parse_account_spec(value: &str) -> Result<AccountSpec> {
    let (scheme, rest) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("account `{value}` must be <scheme>:<path>:<network key>"))?;
    let (path, network_key) = rest
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("account `{value}` is missing a network key"))?;
    let scheme = match scheme.to_lowercase().as_str() {
        "ed25519" => SignatureScheme::Ed25519,
        "sr25519" => SignatureScheme::Sr25519,
        "ecdsa" => SignatureScheme::Ecdsa,
        "ethereum" => SignatureScheme::Ethereum,
        other => bail!("unknown signature scheme `{other}`"),
    };
    Ok(AccountSpec {
        scheme,
        path: path.to_string(),
        network_key: network_key.to_lowercase(),
    })
}
