use serde::Serialize;

/// A Solana cluster the deposit pipeline accepts, with its USDC mint.
#[derive(Debug, Clone, Serialize)]
pub struct SolanaCluster {
    /// CAIP-2 identifier: `solana:` + the first 32 characters of the genesis hash.
    pub caip2: &'static str,
    pub name: &'static str,
    pub usdc_mint: &'static str,
    pub rpc_url: &'static str,
    pub is_testnet: bool,
}

pub const MAINNET_BETA: SolanaCluster = SolanaCluster {
    caip2: "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    name: "Solana",
    usdc_mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    rpc_url: "https://api.mainnet-beta.solana.com",
    is_testnet: false,
};

pub const DEVNET: SolanaCluster = SolanaCluster {
    caip2: "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
    name: "Solana Devnet",
    usdc_mint: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
    rpc_url: "https://api.devnet.solana.com",
    is_testnet: true,
};

const ALL_CLUSTERS: &[&SolanaCluster] = &[&MAINNET_BETA, &DEVNET];

/// Returns the cluster for a CAIP-2 chain id (`solana:<genesis prefix>`).
pub fn cluster_for_caip2(caip2: &str) -> Option<&'static SolanaCluster> {
    ALL_CLUSTERS.iter().find(|c| c.caip2 == caip2).copied()
}

/// Returns the cluster used by a deployment environment.
pub fn cluster_for_environment(is_testnet: bool) -> &'static SolanaCluster {
    if is_testnet {
        &DEVNET
    } else {
        &MAINNET_BETA
    }
}
