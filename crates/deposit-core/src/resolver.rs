//! Maps a connected account's CAIP chain id to the USDC token on that network.

use tracing::debug;

use crate::error::DepositError;
use crate::types::{ChainNamespace, Environment};

/// USDC token resolved for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub namespace: ChainNamespace,
    /// CAIP-2 chain id.
    pub chain_id: &'static str,
    pub network_name: &'static str,
    /// ERC-20 contract address or SPL mint.
    pub token_address: &'static str,
}

/// Looks up token addresses, restricted to one deployment environment.
#[derive(Debug, Clone, Copy)]
pub struct AddressResolver {
    environment: Environment,
}

impl AddressResolver {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Accepts a CAIP-2 chain id (`eip155:8453`) or a CAIP-10 account id
    /// (`eip155:8453:0xabc...`).
    pub fn resolve(&self, caip: &str) -> Result<ResolvedToken, DepositError> {
        let mut parts = caip.splitn(3, ':');
        let (namespace, reference) = match (parts.next(), parts.next()) {
            (Some(ns), Some(reference)) if !reference.is_empty() => (ns, reference),
            _ => {
                return Err(DepositError::UnsupportedNetwork(format!(
                    "malformed chain id {caip:?}"
                )))
            }
        };
        let chain_id = format!("{namespace}:{reference}");
        let testnet = self.environment.is_testnet();

        let resolved = match ChainNamespace::parse(namespace) {
            Some(ChainNamespace::Eip155) => chain_eth::network_for_caip2(&chain_id)
                .filter(|n| n.is_testnet == testnet)
                .map(|n| ResolvedToken {
                    namespace: ChainNamespace::Eip155,
                    chain_id: n.caip2,
                    network_name: n.name,
                    token_address: n.usdc_contract,
                }),
            Some(ChainNamespace::Solana) => chain_sol::cluster_for_caip2(&chain_id)
                .filter(|c| c.is_testnet == testnet)
                .map(|c| ResolvedToken {
                    namespace: ChainNamespace::Solana,
                    chain_id: c.caip2,
                    network_name: c.name,
                    token_address: c.usdc_mint,
                }),
            None => None,
        };

        let token = resolved.ok_or_else(|| {
            DepositError::UnsupportedNetwork(format!(
                "{chain_id} is not supported in the {:?} environment",
                self.environment
            ))
        })?;
        debug!(chain_id = token.chain_id, token = token.token_address, "resolved USDC token");
        Ok(token)
    }
}
