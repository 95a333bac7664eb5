//! Wallet configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use satchel_transactions::AnyChain;
use satchel_types::params::{DEFAULT_ASSET_NAME, MAX_ASSET_NAME_LEN};
use satchel_types::{ChainSymbol, FeeRate, Network, ProtocolParams, Subunits};
use satchel_utils::{init_logging, LogFormat};

use crate::error::WalletError;

/// Configuration for one wallet.
///
/// Loaded from TOML via [`WalletConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_chain")]
    pub chain: ChainSymbol,

    #[serde(default)]
    pub network: Network,

    /// Colored asset this wallet moves.
    #[serde(default = "default_asset_name")]
    pub asset_name: String,

    /// Decimal places the asset accepts.
    #[serde(default = "default_divisibility")]
    pub asset_divisibility: u8,

    /// Currency kept unspent at all times, as a decimal string.
    #[serde(default = "default_reserve")]
    pub reserve: String,

    /// Whole asset units paid to the completer of a partial transaction.
    #[serde(default = "default_protocol_fee")]
    pub protocol_fee: u64,

    #[serde(default)]
    pub fee_rate: FeeRate,

    /// Pick inputs in random order instead of smallest first.
    #[serde(default)]
    pub random_selection: bool,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_chain() -> ChainSymbol {
    ChainSymbol::Ravencoin
}

fn default_asset_name() -> String {
    DEFAULT_ASSET_NAME.to_string()
}

fn default_divisibility() -> u8 {
    8
}

fn default_reserve() -> String {
    "0.01".to_string()
}

fn default_protocol_fee() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl WalletConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WalletError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, WalletError> {
        let config: Self = toml::from_str(s).map_err(|e| WalletError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, WalletError> {
        toml::to_string_pretty(self).map_err(|e| WalletError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.asset_name.is_empty() || self.asset_name.len() > MAX_ASSET_NAME_LEN {
            return Err(WalletError::Config(format!(
                "asset name must be 1 to {MAX_ASSET_NAME_LEN} characters"
            )));
        }
        if self.protocol_fee == 0 {
            return Err(WalletError::Config("protocol fee must be positive".into()));
        }
        if self.asset_divisibility > 8 {
            return Err(WalletError::Config(format!(
                "divisibility {} exceeds 8",
                self.asset_divisibility
            )));
        }
        self.reserve_subunits()?;
        self.protocol_params()?;
        Ok(())
    }

    pub fn reserve_subunits(&self) -> Result<Subunits, WalletError> {
        Subunits::parse_decimal(&self.reserve)
            .map_err(|e| WalletError::Config(format!("reserve: {e}")))
    }

    pub fn protocol_params(&self) -> Result<ProtocolParams, WalletError> {
        ProtocolParams::with_protocol_fee_units(self.protocol_fee)
            .ok_or_else(|| WalletError::Config("protocol fee overflows".into()))
    }

    pub fn chain_ops(&self) -> AnyChain {
        AnyChain::new(self.chain, self.network)
    }

    /// Install the global subscriber described by `log_format` and `log_level`.
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init_logging(&self) -> bool {
        init_logging(self.log_format, &self.log_level)
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            chain: default_chain(),
            network: Network::default(),
            asset_name: default_asset_name(),
            asset_divisibility: default_divisibility(),
            reserve: default_reserve(),
            protocol_fee: default_protocol_fee(),
            fee_rate: FeeRate::default(),
            random_selection: false,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
