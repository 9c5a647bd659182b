//! Network registry.
//!
//! Static table of the EVM chains and Solana clusters this tool knows about.
//! The registry is resolved once at startup: every entry reads its endpoint
//! from an environment variable and falls back to a public default.
//!
//! # Examples
//!
//! ```no_run
//! use chain_balance::networks::Registry;
//!
//! let registry = Registry::from_env();
//! for network in registry.evm(false) {
//!     println!("{} ({})", network.name, network.symbol);
//! }
//! ```

use std::env;
use std::fmt;

use serde::Serialize;

use crate::address::ChainFamily;

/// Identity of a network inside its chain family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "family", content = "id", rename_all = "lowercase")]
pub enum NetworkId {
    /// EVM chain id (EIP-155).
    Evm(u64),
    /// Solana cluster name, e.g. `mainnet-beta`.
    Solana(String),
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkId::Evm(chain_id) => write!(f, "{chain_id}"),
            NetworkId::Solana(cluster) => write!(f, "{cluster}"),
        }
    }
}

/// A network the balance of an address can be queried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDescriptor {
    /// Selection key used by the interactive monitor.
    pub key: String,
    pub id: NetworkId,
    /// Human-readable name, e.g. "Ethereum Mainnet".
    pub name: String,
    /// JSON-RPC endpoint URL.
    pub endpoint: String,
    /// Native unit symbol.
    pub symbol: String,
    /// Block explorer base URL.
    pub explorer: Option<String>,
    pub is_testnet: bool,
}

impl NetworkDescriptor {
    /// Returns the chain family this network belongs to.
    pub fn family(&self) -> ChainFamily {
        match self.id {
            NetworkId::Evm(_) => ChainFamily::Evm,
            NetworkId::Solana(_) => ChainFamily::Solana,
        }
    }

    /// Builds an explorer link for `address`, if the network has an explorer.
    pub fn address_url(&self, address: &str) -> Option<String> {
        let explorer = self.explorer.as_deref()?;
        match &self.id {
            NetworkId::Solana(cluster) if cluster != "mainnet-beta" => {
                Some(format!("{explorer}/address/{address}?cluster={cluster}"))
            }
            _ => Some(format!("{explorer}/address/{address}")),
        }
    }
}

/// Static row of the built-in network table.
struct NetworkEntry {
    key: &'static str,
    id: EntryId,
    name: &'static str,
    env_var: &'static str,
    default_endpoint: &'static str,
    symbol: &'static str,
    explorer: &'static str,
    is_testnet: bool,
}

enum EntryId {
    Evm(u64),
    Solana(&'static str),
}

const EVM_CHAINS: &[NetworkEntry] = &[
    NetworkEntry {
        key: "1",
        id: EntryId::Evm(1),
        name: "Ethereum Mainnet",
        env_var: "ETH_MAINNET_RPC",
        default_endpoint: "https://ethereum-rpc.publicnode.com",
        symbol: "ETH",
        explorer: "https://etherscan.io",
        is_testnet: false,
    },
    NetworkEntry {
        key: "137",
        id: EntryId::Evm(137),
        name: "Polygon",
        env_var: "POLYGON_RPC",
        default_endpoint: "https://polygon-rpc.com",
        symbol: "MATIC",
        explorer: "https://polygonscan.com",
        is_testnet: false,
    },
    NetworkEntry {
        key: "56",
        id: EntryId::Evm(56),
        name: "Binance Smart Chain",
        env_var: "BSC_RPC",
        default_endpoint: "https://bsc-dataseed.binance.org/",
        symbol: "BNB",
        explorer: "https://bscscan.com",
        is_testnet: false,
    },
    NetworkEntry {
        key: "43114",
        id: EntryId::Evm(43114),
        name: "Avalanche",
        env_var: "AVALANCHE_RPC",
        default_endpoint: "https://api.avax.network/ext/bc/C/rpc",
        symbol: "AVAX",
        explorer: "https://snowtrace.io",
        is_testnet: false,
    },
    NetworkEntry {
        key: "8453",
        id: EntryId::Evm(8453),
        name: "Base",
        env_var: "BASE_RPC",
        default_endpoint: "https://mainnet.base.org",
        symbol: "ETH",
        explorer: "https://basescan.org",
        is_testnet: false,
    },
    NetworkEntry {
        key: "5",
        id: EntryId::Evm(5),
        name: "Goerli Testnet",
        env_var: "GOERLI_RPC",
        default_endpoint: "https://ethereum-goerli-rpc.publicnode.com",
        symbol: "ETH",
        explorer: "https://goerli.etherscan.io",
        is_testnet: true,
    },
    NetworkEntry {
        key: "11155111",
        id: EntryId::Evm(11155111),
        name: "Sepolia Testnet",
        env_var: "SEPOLIA_RPC",
        default_endpoint: "https://ethereum-sepolia-rpc.publicnode.com",
        symbol: "ETH",
        explorer: "https://sepolia.etherscan.io",
        is_testnet: true,
    },
    NetworkEntry {
        key: "80001",
        id: EntryId::Evm(80001),
        name: "Mumbai Testnet",
        env_var: "MUMBAI_RPC",
        default_endpoint: "https://rpc-mumbai.maticvigil.com",
        symbol: "MATIC",
        explorer: "https://mumbai.polygonscan.com",
        is_testnet: true,
    },
    NetworkEntry {
        key: "97",
        id: EntryId::Evm(97),
        name: "BSC Testnet",
        env_var: "BSC_TESTNET_RPC",
        default_endpoint: "https://data-seed-prebsc-1-s1.binance.org:8545/",
        symbol: "tBNB",
        explorer: "https://testnet.bscscan.com",
        is_testnet: true,
    },
    NetworkEntry {
        key: "43113",
        id: EntryId::Evm(43113),
        name: "Avalanche Fuji Testnet",
        env_var: "AVALANCHE_FUJI_RPC",
        default_endpoint: "https://api.avax-test.network/ext/bc/C/rpc",
        symbol: "AVAX",
        explorer: "https://testnet.snowtrace.io",
        is_testnet: true,
    },
    NetworkEntry {
        key: "84532",
        id: EntryId::Evm(84532),
        name: "Base Sepolia Testnet",
        env_var: "BASE_SEPOLIA_RPC",
        default_endpoint: "https://sepolia.base.org",
        symbol: "ETH",
        explorer: "https://sepolia.basescan.org",
        is_testnet: true,
    },
];

const SOLANA_CLUSTERS: &[NetworkEntry] = &[
    NetworkEntry {
        key: "solana",
        id: EntryId::Solana("mainnet-beta"),
        name: "Solana Mainnet",
        env_var: "SOLANA_MAINNET_RPC",
        default_endpoint: "https://api.mainnet-beta.solana.com",
        symbol: "SOL",
        explorer: "https://explorer.solana.com",
        is_testnet: false,
    },
    NetworkEntry {
        key: "solana-testnet",
        id: EntryId::Solana("testnet"),
        name: "Solana Testnet",
        env_var: "SOLANA_TESTNET_RPC",
        default_endpoint: "https://api.testnet.solana.com",
        symbol: "SOL",
        explorer: "https://explorer.solana.com",
        is_testnet: true,
    },
];

impl NetworkEntry {
    fn resolve<F>(&self, lookup: &F) -> NetworkDescriptor
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(self.env_var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.default_endpoint.to_string());

        NetworkDescriptor {
            key: self.key.to_string(),
            id: match self.id {
                EntryId::Evm(chain_id) => NetworkId::Evm(chain_id),
                EntryId::Solana(cluster) => NetworkId::Solana(cluster.to_string()),
            },
            name: self.name.to_string(),
            endpoint,
            symbol: self.symbol.to_string(),
            explorer: Some(self.explorer.to_string()),
            is_testnet: self.is_testnet,
        }
    }
}

/// Immutable, ordered collection of known networks.
#[derive(Debug, Clone)]
pub struct Registry {
    evm: Vec<NetworkDescriptor>,
    solana: Vec<NetworkDescriptor>,
}

impl Registry {
    /// Builds a registry from explicit descriptor lists.
    pub fn new(evm: Vec<NetworkDescriptor>, solana: Vec<NetworkDescriptor>) -> Self {
        Self { evm, solana }
    }

    /// Builds the built-in registry, honouring the per-network endpoint
    /// environment variables (`ETH_MAINNET_RPC`, `SOLANA_MAINNET_RPC`, ...).
    pub fn from_env() -> Self {
        Self::with_lookup(|name| env::var(name).ok())
    }

    /// Builds the built-in registry with a custom variable lookup.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let evm: Vec<_> = EVM_CHAINS.iter().map(|e| e.resolve(&lookup)).collect();
        let solana: Vec<_> = SOLANA_CLUSTERS.iter().map(|e| e.resolve(&lookup)).collect();
        log::debug!(
            "Network registry resolved evm_count={} solana_count={}",
            evm.len(),
            solana.len()
        );
        Self::new(evm, solana)
    }

    /// EVM chains in registry order, optionally without testnets.
    pub fn evm(&self, include_testnets: bool) -> impl Iterator<Item = &NetworkDescriptor> {
        filter_testnets(&self.evm, include_testnets)
    }

    /// Solana clusters in registry order, optionally without testnets.
    pub fn solana(&self, include_testnets: bool) -> impl Iterator<Item = &NetworkDescriptor> {
        filter_testnets(&self.solana, include_testnets)
    }

    /// All networks, EVM chains first.
    pub fn all(&self, include_testnets: bool) -> impl Iterator<Item = &NetworkDescriptor> {
        self.evm(include_testnets).chain(self.solana(include_testnets))
    }

    /// Looks up a network by its selection key (`"1"`, `"8453"`, `"solana"`, ...).
    pub fn find(&self, key: &str) -> Option<&NetworkDescriptor> {
        let key = key.trim();
        self.all(true).find(|n| n.key.eq_ignore_ascii_case(key))
    }

    /// The network selected when the interactive monitor starts.
    pub fn default_network(&self) -> Option<&NetworkDescriptor> {
        self.evm.first().or_else(|| self.solana.first())
    }
}

fn filter_testnets(
    networks: &[NetworkDescriptor],
    include_testnets: bool,
) -> impl Iterator<Item = &NetworkDescriptor> {
    networks
        .iter()
        .filter(move |n| include_testnets || !n.is_testnet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn registry_with(vars: &[(&str, &str)]) -> Registry {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Registry::with_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn default_endpoints_are_used_without_overrides() {
        let registry = registry_with(&[]);
        let eth = registry.find("1").unwrap();
        assert_eq!(eth.name, "Ethereum Mainnet");
        assert_eq!(eth.endpoint, "https://ethereum-rpc.publicnode.com");
        assert_eq!(eth.family(), ChainFamily::Evm);
    }

    #[test]
    fn env_override_replaces_endpoint() {
        let registry = registry_with(&[
            ("BASE_RPC", "http://localhost:8545"),
            ("SOLANA_MAINNET_RPC", "   "),
        ]);
        assert_eq!(registry.find("8453").unwrap().endpoint, "http://localhost:8545");
        // blank values fall back to the default
        assert_eq!(
            registry.find("solana").unwrap().endpoint,
            "https://api.mainnet-beta.solana.com"
        );
    }

    #[test]
    fn testnets_are_filtered_and_order_is_kept() {
        let registry = registry_with(&[]);
        let mainnets: Vec<_> = registry.evm(false).map(|n| n.name.as_str()).collect();
        assert_eq!(
            mainnets,
            vec!["Ethereum Mainnet", "Polygon", "Binance Smart Chain", "Avalanche", "Base"]
        );
        assert_eq!(registry.evm(true).count(), 11);
        assert_eq!(registry.solana(false).count(), 1);
        assert_eq!(registry.solana(true).count(), 2);
        assert!(registry.all(false).all(|n| !n.is_testnet));
    }

    #[test]
    fn find_resolves_solana_keys() {
        let registry = registry_with(&[]);
        let testnet = registry.find("Solana-Testnet").unwrap();
        assert_eq!(testnet.id, NetworkId::Solana("testnet".into()));
        assert_eq!(testnet.family(), ChainFamily::Solana);
        assert!(registry.find("does-not-exist").is_none());
    }

    #[test]
    fn explorer_links() {
        let registry = registry_with(&[]);
        assert_eq!(
            registry.find("1").unwrap().address_url("0xabc").as_deref(),
            Some("https://etherscan.io/address/0xabc")
        );
        assert_eq!(
            registry.find("solana-testnet").unwrap().address_url("Abc").as_deref(),
            Some("https://explorer.solana.com/address/Abc?cluster=testnet")
        );
        assert_eq!(
            registry.find("solana").unwrap().address_url("Abc").as_deref(),
            Some("https://explorer.solana.com/address/Abc")
        );
    }
}
