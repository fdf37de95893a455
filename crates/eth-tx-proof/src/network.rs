//! Network profiles: chain-specific encoding parameters consumed by the codec and the proof encoder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProofError;

/// Encoding ruleset active at a given block.
///
/// Only the forks that change transaction or header encoding are distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hardfork {
    /// Any ruleset before Berlin: legacy transactions only, no base fee
    Frontier,
    /// EIP-2718 envelopes and EIP-2930 access-list transactions
    Berlin,
    /// EIP-1559 fee-market transactions and `baseFeePerGas` in the header
    London,
    /// `withdrawalsRoot` and the later header extensions
    Shanghai,
}

impl Hardfork {
    pub fn has_access_lists(&self) -> bool {
        *self >= Hardfork::Berlin
    }

    pub fn has_fee_market(&self) -> bool {
        *self >= Hardfork::London
    }

    /// Whether the header is the 15 legacy fields, plus `baseFeePerGas` from London
    pub fn has_encodable_header(&self) -> bool {
        *self < Hardfork::Shanghai
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hardfork::Frontier => "frontier",
            Hardfork::Berlin => "berlin",
            Hardfork::London => "london",
            Hardfork::Shanghai => "shanghai",
        };
        f.write_str(name)
    }
}

/// Supported Ethereum-family networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Goerli,
    Sepolia,
    Holesky,
    Polygon,
    Gnosis,
    Classic,
}

impl Network {
    pub const ALL: [Network; 7] = [
        Network::Mainnet,
        Network::Goerli,
        Network::Sepolia,
        Network::Holesky,
        Network::Polygon,
        Network::Gnosis,
        Network::Classic,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Goerli => 5,
            Network::Sepolia => 11_155_111,
            Network::Holesky => 17_000,
            Network::Polygon => 137,
            Network::Gnosis => 100,
            Network::Classic => 61,
        }
    }

    /// Resolve a network from the chain id reported by a node
    pub fn from_chain_id(chain_id: u64) -> Result<Self, ProofError> {
        Self::ALL
            .into_iter()
            .find(|network| network.chain_id() == chain_id)
            .ok_or_else(|| ProofError::UnsupportedNetwork(format!("chain id {chain_id}")))
    }

    /// Activation heights of the encoding-relevant forks, in ascending order
    fn activations(&self) -> &'static [(u64, Hardfork)] {
        match self {
            Network::Mainnet => &[
                (12_244_000, Hardfork::Berlin),
                (12_965_000, Hardfork::London),
                (17_034_870, Hardfork::Shanghai),
            ],
            Network::Goerli => &[
                (4_460_644, Hardfork::Berlin),
                (5_062_605, Hardfork::London),
                (8_656_123, Hardfork::Shanghai),
            ],
            Network::Sepolia => &[(0, Hardfork::London), (2_990_908, Hardfork::Shanghai)],
            Network::Holesky => &[(0, Hardfork::Shanghai)],
            // Bor headers never gained a withdrawals root
            Network::Polygon => &[(14_750_000, Hardfork::Berlin), (23_850_000, Hardfork::London)],
            Network::Gnosis => &[
                (16_101_500, Hardfork::Berlin),
                (19_040_000, Hardfork::London),
                (29_242_932, Hardfork::Shanghai),
            ],
            // Magneto brought Berlin transaction rules; Ethereum Classic never adopted EIP-1559
            Network::Classic => &[(13_189_133, Hardfork::Berlin)],
        }
    }

    /// Hardfork ruleset active at `block_number`
    pub fn hardfork_at(&self, block_number: u64) -> Hardfork {
        self.activations()
            .iter()
            .rev()
            .find(|(height, _)| block_number >= *height)
            .map(|(_, fork)| *fork)
            .unwrap_or(Hardfork::Frontier)
    }

    /// Encoding profile for a block of this network.
    ///
    /// Fails for blocks whose header carries fields past `baseFeePerGas`.
    pub fn profile_at(&self, block_number: u64) -> Result<NetworkProfile, ProofError> {
        let hardfork = self.hardfork_at(block_number);
        if !hardfork.has_encodable_header() {
            return Err(ProofError::UnsupportedHardfork {
                network: *self,
                hardfork,
                block_number,
            });
        }
        Ok(NetworkProfile {
            network: *self,
            hardfork,
            has_base_fee: hardfork.has_fee_market(),
            chain_id: self.chain_id(),
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Goerli => "goerli",
            Network::Sepolia => "sepolia",
            Network::Holesky => "holesky",
            Network::Polygon => "polygon",
            Network::Gnosis => "gnosis",
            Network::Classic => "classic",
        };
        f.write_str(name)
    }
}

impl FromStr for Network {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "ethereum" => Ok(Network::Mainnet),
            "goerli" => Ok(Network::Goerli),
            "sepolia" => Ok(Network::Sepolia),
            "holesky" => Ok(Network::Holesky),
            "polygon" | "matic" => Ok(Network::Polygon),
            "gnosis" | "xdai" => Ok(Network::Gnosis),
            "classic" | "etc" => Ok(Network::Classic),
            _ => Err(ProofError::UnsupportedNetwork(s.to_string())),
        }
    }
}

/// Parameters that shape the encoding of one block's transactions and header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub network: Network,
    pub hardfork: Hardfork,
    /// Whether `baseFeePerGas` is part of the header
    pub has_base_fee: bool,
    pub chain_id: u64,
}

impl NetworkProfile {
    /// Resolve the profile of `network` (name or alias) at `block_number`
    pub fn resolve(network: &str, block_number: u64) -> Result<Self, ProofError> {
        network.parse::<Network>()?.profile_at(block_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_fork_boundaries() {
        let mainnet = Network::Mainnet;
        assert_eq!(mainnet.hardfork_at(0), Hardfork::Frontier);
        assert_eq!(mainnet.hardfork_at(12_243_999), Hardfork::Frontier);
        assert_eq!(mainnet.hardfork_at(12_244_000), Hardfork::Berlin);
        assert_eq!(mainnet.hardfork_at(12_964_999), Hardfork::Berlin);
        assert_eq!(mainnet.hardfork_at(12_965_000), Hardfork::London);
        assert_eq!(mainnet.hardfork_at(17_034_869), Hardfork::London);
        assert_eq!(mainnet.hardfork_at(17_034_870), Hardfork::Shanghai);

        let profile = mainnet.profile_at(17_034_869).unwrap();
        assert!(profile.has_base_fee);
        assert_eq!(profile.chain_id, 1);

        assert!(!mainnet.profile_at(12_000_000).unwrap().has_base_fee);
    }

    #[test]
    fn test_withdrawals_headers_are_rejected() {
        assert!(matches!(
            Network::Mainnet.profile_at(17_034_870),
            Err(ProofError::UnsupportedHardfork {
                network: Network::Mainnet,
                hardfork: Hardfork::Shanghai,
                block_number: 17_034_870,
            })
        ));
        assert!(matches!(
            NetworkProfile::resolve("mainnet", 20_000_000),
            Err(ProofError::UnsupportedHardfork { .. })
        ));
        assert!(Network::Sepolia.profile_at(2_990_907).is_ok());
        assert!(Network::Sepolia.profile_at(2_990_908).is_err());
        assert!(Network::Holesky.profile_at(0).is_err());
        assert!(Network::Polygon.profile_at(60_000_000).unwrap().has_base_fee);
    }

    #[test]
    fn test_classic_never_has_base_fee() {
        let profile = Network::Classic.profile_at(u64::MAX).unwrap();
        assert_eq!(profile.hardfork, Hardfork::Berlin);
        assert!(!profile.has_base_fee);
        assert!(profile.hardfork.has_access_lists());
        assert!(!profile.hardfork.has_fee_market());
    }

    #[test]
    fn test_parse_network_names() {
        assert_eq!("Ethereum".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("matic".parse::<Network>().unwrap(), Network::Polygon);
        assert_eq!("etc".parse::<Network>().unwrap(), Network::Classic);
        for network in Network::ALL {
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
    }

    #[test]
    fn test_unknown_network_is_rejected() {
        assert!(matches!(
            NetworkProfile::resolve("ropsten-but-not-really", 1),
            Err(ProofError::UnsupportedNetwork(name)) if name == "ropsten-but-not-really"
        ));
        assert!(matches!(
            Network::from_chain_id(424242),
            Err(ProofError::UnsupportedNetwork(_))
        ));
        assert_eq!(Network::from_chain_id(137).unwrap(), Network::Polygon);
    }
}
