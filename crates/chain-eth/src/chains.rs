use serde::Serialize;

/// Definition of an EVM network the deposit pipeline accepts, together with
/// the USDC contract deployed on it.
#[derive(Debug, Clone, Serialize)]
pub struct EvmNetwork {
    pub chain_id: u64,
    /// CAIP-2 identifier, e.g. `eip155:8453`.
    pub caip2: &'static str,
    pub name: &'static str,
    /// USDC contract address (EIP-55 checksummed).
    pub usdc_contract: &'static str,
    pub rpc_url: &'static str,
    pub is_testnet: bool,
}

/// Base mainnet (chain ID 8453).
pub const BASE: EvmNetwork = EvmNetwork {
    chain_id: 8453,
    caip2: "eip155:8453",
    name: "Base",
    usdc_contract: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
    rpc_url: "https://mainnet.base.org",
    is_testnet: false,
};

/// Base Sepolia testnet (chain ID 84532).
pub const BASE_SEPOLIA: EvmNetwork = EvmNetwork {
    chain_id: 84532,
    caip2: "eip155:84532",
    name: "Base Sepolia",
    usdc_contract: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
    rpc_url: "https://sepolia.base.org",
    is_testnet: true,
};

const ALL_NETWORKS: &[&EvmNetwork] = &[&BASE, &BASE_SEPOLIA];

/// Returns the network for a CAIP-2 chain id (`eip155:<id>`).
pub fn network_for_caip2(caip2: &str) -> Option<&'static EvmNetwork> {
    ALL_NETWORKS.iter().find(|n| n.caip2 == caip2).copied()
}

/// Returns the network used by a deployment environment.
pub fn network_for_environment(is_testnet: bool) -> &'static EvmNetwork {
    if is_testnet {
        &BASE_SEPOLIA
    } else {
        &BASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse_address;

    #[test]
    fn lookup_by_caip2() {
        assert_eq!(network_for_caip2("eip155:8453").unwrap().chain_id, 8453);
        assert_eq!(network_for_caip2("eip155:84532").unwrap().chain_id, 84532);
        assert!(network_for_caip2("eip155:1").is_none());
        assert!(!network_for_caip2("eip155:8453").unwrap().is_testnet);
        assert!(network_for_caip2("eip155:84532").unwrap().is_testnet);
    }

    #[test]
    fn caip2_matches_chain_id() {
        for network in ALL_NETWORKS {
            assert_eq!(network.caip2, format!("eip155:{}", network.chain_id));
        }
    }

    #[test]
    fn environment_selects_network() {
        assert_eq!(network_for_environment(false).chain_id, 8453);
        assert_eq!(network_for_environment(true).chain_id, 84532);
    }

    #[test]
    fn usdc_contracts_are_valid_checksummed_addresses() {
        for network in ALL_NETWORKS {
            assert!(
                parse_address(network.usdc_contract).is_ok(),
                "{} usdc contract should parse",
                network.name
            );
        }
    }

    #[test]
    fn all_networks_have_https_rpc() {
        for network in ALL_NETWORKS {
            assert!(network.rpc_url.starts_with("https://"));
        }
    }
}
