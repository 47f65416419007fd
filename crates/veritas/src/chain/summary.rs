use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of recent transactions kept in a summary.
pub const TRANSACTION_COUNT: usize = 10;

/// Maximum number of asset units listed in a summary.
pub const ASSET_COUNT: usize = 15;

/// Bounded on-chain snapshot of one wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    /// Most-recent-first, at most [`TRANSACTION_COUNT`] entries.
    pub recent_transaction_hashes: Vec<String>,
    /// Provider order, at most [`ASSET_COUNT`] entries.
    pub assets_held: Vec<String>,
    /// Count of every asset class held, including those cut from `assets_held`.
    pub total_asset_classes: usize,
}

impl WalletSummary {
    /// Builds a summary, enforcing both caps.
    pub fn new<T, A>(transactions: T, assets: A, total_asset_classes: usize) -> Self
    where
        T: IntoIterator<Item = String>,
        A: IntoIterator<Item = String>,
    {
        Self {
            recent_transaction_hashes: transactions.into_iter().take(TRANSACTION_COUNT).collect(),
            assets_held: assets.into_iter().take(ASSET_COUNT).collect(),
            total_asset_classes,
        }
    }

    /// Summary for a wallet without a stake address.
    pub fn without_assets<T>(transactions: T) -> Self
    where
        T: IntoIterator<Item = String>,
    {
        Self::new(transactions, Vec::new(), 0)
    }

    /// Pretty JSON handed to analysis stages.
    pub fn to_prompt_json(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Why a wallet could not be summarized. Never carries partial data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Server configuration error: BLOCKFROST_API_KEY is not set.")]
    MissingCredential,

    #[error("Failed to get address info (Status: {status}). Is the address on '{network}'?")]
    AddressLookup { status: u16, network: String },

    #[error("An unexpected error during data fetch: {0}")]
    Upstream(String),

    #[error("An unexpected error during data fetch: malformed payload: {0}")]
    Malformed(String),
}

pub type FetchResult = Result<WalletSummary, FetchError>;
