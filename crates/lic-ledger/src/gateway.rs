//! # HTTP Gateway Ledger Client
//!
//! Talks to a JSON gateway in front of the ledger network:
//!
//! ```text
//! GET  {gateway}/channels/{channel}/chaincodes/{chaincode}            startup probe
//! POST {gateway}/channels/{channel}/chaincodes/{chaincode}/submit     {"function","args"}
//! POST {gateway}/channels/{channel}/chaincodes/{chaincode}/evaluate   {"function","args"}
//! ```
//!
//! Response bodies are the raw transaction result.
//!
//! ## Status Mapping
//!
//! | Gateway reply | Error |
//! |---------------|-------|
//! | 404 on evaluate | [`LedgerError::NotFound`] |
//! | other 4xx | [`LedgerError::Endorsement`] |
//! | 5xx, connection failure | [`LedgerError::Connectivity`] |
//! | client timeout | [`LedgerError::Timeout`] |
//!
//! ## Connection Lifecycle
//!
//! [`GatewayLedgerClient::connect`] never fails. A missing gateway URL, a
//! wallet bootstrap error, an unusable TLS identity or a failed probe each
//! produce a degraded client that remembers why. The wallet identity is
//! presented as a client certificate on `https` gateways.

use serde::Serialize;
use url::Url;

use crate::config::{join, LedgerConfig};
use crate::error::LedgerError;
use crate::identity::Wallet;
use crate::retry::retry_send;
use crate::LedgerClient;

#[derive(Serialize)]
struct TransactionRequest<'a> {
    function: &'a str,
    args: &'a [String],
}

#[derive(Debug, Clone)]
enum Connection {
    Connected { submit_url: Url, evaluate_url: Url },
    Degraded { reason: String },
}

/// Ledger client over the HTTP gateway.
///
/// `reqwest::Client` pools connections internally, so one instance serves
/// any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct GatewayLedgerClient {
    http: reqwest::Client,
    connection: Connection,
    config: LedgerConfig,
}

impl GatewayLedgerClient {
    /// Bootstrap the identity, build the mTLS client, and probe the
    /// chaincode endpoint.
    pub async fn connect(config: LedgerConfig) -> Self {
        match Self::try_connect(&config).await {
            Ok((http, submit_url, evaluate_url)) => {
                tracing::info!(
                    channel = %config.channel,
                    chaincode = %config.chaincode,
                    "connected to ledger gateway"
                );
                Self {
                    http,
                    connection: Connection::Connected {
                        submit_url,
                        evaluate_url,
                    },
                    config,
                }
            }
            Err(reason) => {
                tracing::warn!(%reason, "ledger unavailable; running in degraded mode");
                Self::degraded(config, reason)
            }
        }
    }

    /// A client that answers every call with [`LedgerError::Offline`].
    pub fn degraded(config: LedgerConfig, reason: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            connection: Connection::Degraded {
                reason: reason.into(),
            },
            config,
        }
    }

    async fn try_connect(config: &LedgerConfig) -> Result<(reqwest::Client, Url, Url), String> {
        let base = match config.chaincode_url() {
            None => return Err("LEDGER_GATEWAY_URL not set".into()),
            Some(url) => url.map_err(|e| e.to_string())?,
        };

        let wallet = Wallet::open(&config.wallet_path).map_err(|e| e.to_string())?;
        let identity = wallet
            .ensure_identity(
                &config.identity_label,
                &config.msp_id,
                config.credential_path.as_deref(),
            )
            .map_err(|e| e.to_string())?;

        let mut builder = reqwest::Client::builder().timeout(config.timeout());
        // The client certificate only applies to TLS gateways.
        if base.scheme() == "https" {
            let tls_identity = reqwest::Identity::from_pem(&identity.pem_bundle())
                .map_err(|e| format!("invalid client identity: {e}"))?;
            builder = builder.identity(tls_identity);
        }
        let http = builder
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;

        let probe = http
            .get(base.clone())
            .send()
            .await
            .map_err(|e| format!("gateway probe failed: {e}"))?;
        if !probe.status().is_success() {
            return Err(format!(
                "gateway probe returned {} for channel {:?} chaincode {:?}",
                probe.status(),
                config.channel,
                config.chaincode
            ));
        }

        let submit_url = join(&base, "submit").map_err(|e| e.to_string())?;
        let evaluate_url = join(&base, "evaluate").map_err(|e| e.to_string())?;
        Ok((http, submit_url, evaluate_url))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Why the client is degraded, if it is.
    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.connection {
            Connection::Degraded { reason } => Some(reason),
            Connection::Connected { .. } => None,
        }
    }

    async fn call(
        &self,
        url: &Url,
        function: &str,
        args: &[String],
        not_found_is_missing_key: bool,
    ) -> Result<Vec<u8>, LedgerError> {
        let body = TransactionRequest { function, args };
        let response = retry_send(function, || {
            self.http.post(url.clone()).json(&body).send()
        })
        .await
        .map_err(|e| {
            if e.is_timeout() {
                LedgerError::Timeout {
                    function: function.to_string(),
                    after: self.config.timeout(),
                }
            } else {
                LedgerError::Connectivity {
                    function: function.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| LedgerError::Connectivity {
            function: function.to_string(),
            detail: format!("failed to read response body: {e}"),
        })?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if status == reqwest::StatusCode::NOT_FOUND && not_found_is_missing_key {
            return Err(LedgerError::NotFound {
                key: args.first().cloned().unwrap_or_default(),
            });
        }
        if status.is_server_error() {
            return Err(LedgerError::Connectivity {
                function: function.to_string(),
                detail: format!("gateway returned {status}: {text}"),
            });
        }
        Err(LedgerError::Endorsement {
            function: function.to_string(),
            status: status.as_u16(),
            body: text,
        })
    }
}

impl LedgerClient for GatewayLedgerClient {
    async fn submit(&self, function: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        let Connection::Connected { submit_url, .. } = &self.connection else {
            return Err(LedgerError::Offline {
                reason: self.degraded_reason().unwrap_or_default().to_string(),
            });
        };
        tracing::info!(function, ?args, "ledger submit");
        self.call(submit_url, function, args, false).await
    }

    async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        let Connection::Connected { evaluate_url, .. } = &self.connection else {
            return Err(LedgerError::Offline {
                reason: self.degraded_reason().unwrap_or_default().to_string(),
            });
        };
        tracing::info!(function, ?args, "ledger evaluate");
        self.call(evaluate_url, function, args, true).await
    }

    fn is_degraded(&self) -> bool {
        matches!(self.connection, Connection::Degraded { .. })
    }
}
