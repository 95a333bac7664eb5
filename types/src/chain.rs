//! Chain and network identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported UTXO chain carrying a base currency and colored assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainSymbol {
    Ravencoin,
    Evrmore,
}

impl ChainSymbol {
    /// Three-byte tag embedded in asset scripts.
    pub fn asset_tag(&self) -> [u8; 3] {
        match self {
            Self::Ravencoin => *b"rvn",
            Self::Evrmore => *b"evr",
        }
    }

    /// Currency ticker.
    pub fn ticker(&self) -> &'static str {
        match self {
            Self::Ravencoin => "RVN",
            Self::Evrmore => "EVR",
        }
    }

    /// Lowercase symbol used by the coordinating server's routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ravencoin => "rvn",
            Self::Evrmore => "evr",
        }
    }

    /// Base58check version byte for pay-to-public-key-hash addresses.
    pub fn p2pkh_version(&self, network: Network) -> u8 {
        match (self, network) {
            (Self::Ravencoin, Network::Mainnet) => 0x3c,
            (Self::Evrmore, Network::Mainnet) => 0x21,
            (_, Network::Testnet) => 0x6f,
        }
    }
}

impl fmt::Display for ChainSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which network of a chain the wallet lives on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}
