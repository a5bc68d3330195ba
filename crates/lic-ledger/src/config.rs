//! Ledger client configuration.
//!
//! Read from the environment at startup. An empty variable counts as unset.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Which ledger implementation a binary should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    /// Remote gateway; degraded if unreachable.
    Gateway,
    /// In-process ledger. Development only.
    Memory,
}

/// Configuration for connecting to the ledger gateway.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub mode: LedgerMode,
    /// Gateway base URL. `None` puts a gateway client into degraded mode.
    pub gateway_url: Option<Url>,
    pub channel: String,
    pub chaincode: String,
    /// Directory of the file-system wallet.
    pub wallet_path: PathBuf,
    /// Wallet label of the client identity.
    pub identity_label: String,
    pub msp_id: String,
    /// Directory holding `signcerts/cert.pem` and `keystore/`, used when the
    /// wallet has no identity under `identity_label`.
    pub credential_path: Option<PathBuf>,
    /// Deadline for a single submit or evaluate.
    pub timeout_secs: u64,
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `LEDGER_MODE` (`gateway` | `memory`, default: `gateway`)
    /// - `LEDGER_GATEWAY_URL` (optional; absent means degraded)
    /// - `LEDGER_CHANNEL` (default: `mychannel`)
    /// - `LEDGER_CHAINCODE` (default: `licensecc`)
    /// - `LEDGER_WALLET_PATH` (default: `./wallet`)
    /// - `LEDGER_IDENTITY` (default: `admin`)
    /// - `LEDGER_MSP_ID` (default: `Org1MSP`)
    /// - `LEDGER_CREDENTIAL_PATH` (optional)
    /// - `LEDGER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match env_opt("LEDGER_MODE").as_deref() {
            None | Some("gateway") => LedgerMode::Gateway,
            Some("memory") => LedgerMode::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "LEDGER_MODE",
                    value: other.to_string(),
                })
            }
        };
        let gateway_url = env_opt("LEDGER_GATEWAY_URL")
            .map(|raw| {
                Url::parse(&raw)
                    .map_err(|e| ConfigError::InvalidUrl("LEDGER_GATEWAY_URL".into(), e.to_string()))
            })
            .transpose()?;
        let timeout_secs = match env_opt("LEDGER_TIMEOUT_SECS") {
            None => 30,
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "LEDGER_TIMEOUT_SECS",
                value: raw.clone(),
            })?,
        };

        Ok(Self {
            mode,
            gateway_url,
            channel: env_or("LEDGER_CHANNEL", "mychannel"),
            chaincode: env_or("LEDGER_CHAINCODE", "licensecc"),
            wallet_path: PathBuf::from(env_or("LEDGER_WALLET_PATH", "./wallet")),
            identity_label: env_or("LEDGER_IDENTITY", "admin"),
            msp_id: env_or("LEDGER_MSP_ID", "Org1MSP"),
            credential_path: env_opt("LEDGER_CREDENTIAL_PATH").map(PathBuf::from),
            timeout_secs,
        })
    }

    /// A gateway configuration with defaults, pointing at `gateway_url`.
    pub fn for_gateway(gateway_url: Url, wallet_path: impl Into<PathBuf>) -> Self {
        Self {
            mode: LedgerMode::Gateway,
            gateway_url: Some(gateway_url),
            channel: "mychannel".into(),
            chaincode: "licensecc".into(),
            wallet_path: wallet_path.into(),
            identity_label: "admin".into(),
            msp_id: "Org1MSP".into(),
            credential_path: None,
            timeout_secs: 30,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `{gateway}/channels/{channel}/chaincodes/{chaincode}`, or `None`
    /// without a gateway.
    pub fn chaincode_url(&self) -> Option<Result<Url, ConfigError>> {
        self.gateway_url.as_ref().map(|base| {
            let path = format!("channels/{}/chaincodes/{}", self.channel, self.chaincode);
            join(base, &path)
        })
    }
}

/// Join `path` onto `base`, keeping any path prefix `base` already has.
pub(crate) fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
    let mut raw = base.as_str().trim_end_matches('/').to_string();
    raw.push('/');
    raw.push_str(path.trim_start_matches('/'));
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(raw.clone(), e.to_string()))
}

fn env_opt(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn env_or(var: &str, default: &str) -> String {
    env_opt(var).unwrap_or_else(|| default.to_string())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}
