//! Configuration for the reconciliation engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ledger tree configuration
    pub ledger: LedgerConfig,

    /// Sign-up policy
    pub sign_up: SignUpConfig,

    /// Actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "recon-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: LedgerConfig::default(),
            sign_up: SignUpConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Ledger tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Merkle tree depth (capacity is 2^depth accounts)
    pub tree_depth: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { tree_depth: 32 }
    }
}

/// Sign-up policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpConfig {
    /// Minimum deposit pulled into custody with every sign-up request;
    /// None registers accounts with a zero opening balance
    pub minimum_deposit: Option<Decimal>,
}

impl Default for SignUpConfig {
    fn default() -> Self {
        Self {
            minimum_deposit: None,
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Mailbox capacity (bounded channel, applies backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 128,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(depth) = std::env::var("RECON_TREE_DEPTH") {
            config.ledger.tree_depth = depth
                .parse()
                .map_err(|e| crate::Error::Config(format!("invalid RECON_TREE_DEPTH: {}", e)))?;
        }

        if let Ok(deposit) = std::env::var("RECON_MINIMUM_DEPOSIT") {
            let amount: Decimal = deposit.parse().map_err(|e| {
                crate::Error::Config(format!("invalid RECON_MINIMUM_DEPOSIT: {}", e))
            })?;
            config.sign_up.minimum_deposit = Some(amount);
        }

        Ok(config)
    }
}
