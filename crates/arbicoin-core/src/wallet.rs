//! Display model for an injected browser wallet.
//!
//! The wallet adapter reports account, balance and chain changes here; the
//! UI reads the formatted strings back. Nothing in this module talks to a
//! provider, signs, or touches game state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain id of Arbitrum One as reported by providers
pub const ARBITRUM_ONE_CHAIN_ID: &str = "0xa4b1";

const WEI_PER_DISPLAY_UNIT: u128 = 100_000_000_000_000; // 10^14 wei = 0.0001 ETH

/// Network status shown next to the address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    ArbitrumOne,
    Wrong { chain_id: String },
    Unknown,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::ArbitrumOne => f.write_str("Arbitrum One"),
            Network::Wrong { .. } => f.write_str("Wrong Network"),
            Network::Unknown => f.write_str("Unknown Network"),
        }
    }
}

/// Parse a balance as returned by providers: `0x`-prefixed hex or decimal wei
pub fn parse_wei(raw: &str) -> Option<u128> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some("") => None,
        Some(hex) => u128::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Strings the wallet panel renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub connected: bool,
    pub short_address: Option<String>,
    pub balance: Option<String>,
    pub network: String,
    pub wrong_network: bool,
}

/// Last known wallet connection state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStatus {
    address: Option<String>,
    balance_wei: Option<u128>,
    chain_id: Option<String>,
}

impl WalletStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn balance_wei(&self) -> Option<u128> {
        self.balance_wei
    }

    /// Record a successful connection
    pub fn connect(&mut self, address: impl Into<String>, chain_id: Option<String>) {
        self.address = Some(address.into());
        self.balance_wei = None;
        self.chain_id = chain_id;
    }

    pub fn disconnect(&mut self) {
        *self = Self::default();
    }

    /// Handle an `accountsChanged` notification; an empty list disconnects
    pub fn switch_account(&mut self, accounts: &[String]) {
        match accounts.first() {
            Some(account) => {
                self.address = Some(account.clone());
                // Stale until the adapter fetches the new balance
                self.balance_wei = None;
            }
            None => self.disconnect(),
        }
    }

    /// Handle a `chainChanged` notification
    pub fn switch_chain(&mut self, chain_id: impl Into<String>) {
        self.chain_id = Some(chain_id.into());
    }

    pub fn set_balance_wei(&mut self, wei: u128) {
        if self.is_connected() {
            self.balance_wei = Some(wei);
        }
    }

    /// Address shortened to `0x1234...abcd`
    pub fn short_address(&self) -> Option<String> {
        let address = self.address.as_deref()?;
        if address.len() <= 10 {
            return Some(address.to_string());
        }
        match (address.get(..6), address.get(address.len() - 4..)) {
            (Some(head), Some(tail)) => Some(format!("{}...{}", head, tail)),
            _ => Some(address.to_string()),
        }
    }

    /// Balance in ETH rounded to 4 decimals, e.g. `1.2346 ETH`
    pub fn balance_display(&self) -> Option<String> {
        let wei = self.balance_wei?;
        let units = wei.saturating_add(WEI_PER_DISPLAY_UNIT / 2) / WEI_PER_DISPLAY_UNIT;
        Some(format!("{}.{:04} ETH", units / 10_000, units % 10_000))
    }

    /// Everything the wallet panel shows, formatted
    pub fn view(&self) -> WalletView {
        let network = self.network();
        WalletView {
            connected: self.is_connected(),
            short_address: self.short_address(),
            balance: self.balance_display(),
            wrong_network: matches!(network, Network::Wrong { .. }),
            network: network.to_string(),
        }
    }

    pub fn network(&self) -> Network {
        match self.chain_id.as_deref() {
            Some(id) if id.eq_ignore_ascii_case(ARBITRUM_ONE_CHAIN_ID) => Network::ArbitrumOne,
            Some(id) => Network::Wrong {
                chain_id: id.to_string(),
            },
            None => Network::Unknown,
        }
    }
}
