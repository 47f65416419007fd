//! On-chain data access: Cardano networks, the bounded wallet summary, and
//! the Blockfrost fetcher.

pub mod fetcher;
pub mod network;
pub mod summary;

pub use fetcher::{BlockfrostClient, WalletDataSource};
pub use network::CardanoNetwork;
pub use summary::{FetchError, FetchResult, WalletSummary, ASSET_COUNT, TRANSACTION_COUNT};

/// Address prefixes accepted at the HTTP boundary (mainnet, testnets).
pub const ACCEPTED_ADDRESS_PREFIXES: [&str; 2] = ["addr1", "addr_test1"];

/// Returns true if `address` starts with one of the accepted prefixes.
pub fn has_accepted_prefix(address: &str) -> bool {
    ACCEPTED_ADDRESS_PREFIXES
        .iter()
        .any(|prefix| address.starts_with(prefix))
}

/// Shortens an address for log output (`addr_test1qr33…d3nq3`).
pub fn abbreviate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 24 {
        return address.to_string();
    }
    let head: String = chars[..14].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}…{}", head, tail)
}
