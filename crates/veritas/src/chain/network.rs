use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Cardano networks served by Blockfrost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardanoNetwork {
    Mainnet,
    #[default]
    Preprod,
    Preview,
}

impl CardanoNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardanoNetwork::Mainnet => "mainnet",
            CardanoNetwork::Preprod => "preprod",
            CardanoNetwork::Preview => "preview",
        }
    }

    /// Blockfrost API root for this network.
    pub fn base_url(&self) -> String {
        format!("https://cardano-{}.blockfrost.io/api/v0", self.as_str())
    }
}

impl fmt::Display for CardanoNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardanoNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(CardanoNetwork::Mainnet),
            "preprod" => Ok(CardanoNetwork::Preprod),
            "preview" => Ok(CardanoNetwork::Preview),
            other => Err(format!(
                "unknown network '{}', expected one of: mainnet, preprod, preview",
                other
            )),
        }
    }
}
