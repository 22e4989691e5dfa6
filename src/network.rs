/*
    Network parameters.

    Mainnet, testnet and regtest share the secp256k1 curve and only differ
    in the version bytes and human readable parts used when encoding.
    Regtest reuses the testnet Base58 prefixes, so Base58 strings decode as testnet.
*/

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::VersionPrefix;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    #[serde(alias = "mainnet")]
    Bitcoin,
    Testnet,
    Regtest
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown network '{0}'")]
pub struct UnknownNetwork(pub String);

/// Encoding parameters of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    pub p2pkh_prefix: VersionPrefix,
    pub p2sh_prefix: VersionPrefix,
    pub wif_prefix: VersionPrefix,
    pub xprv_prefix: VersionPrefix,
    pub xpub_prefix: VersionPrefix,
    pub bech32_hrp: &'static str
}

const MAINNET_PARAMS: NetworkParams = NetworkParams {
    p2pkh_prefix: VersionPrefix::BTCAddress,
    p2sh_prefix: VersionPrefix::P2ScriptAddress,
    wif_prefix: VersionPrefix::PrivateKeyWIF,
    xprv_prefix: VersionPrefix::Xprv,
    xpub_prefix: VersionPrefix::Xpub,
    bech32_hrp: "bc"
};

const TESTNET_PARAMS: NetworkParams = NetworkParams {
    p2pkh_prefix: VersionPrefix::BTCTestNetAddress,
    p2sh_prefix: VersionPrefix::TestnetP2SHAddress,
    wif_prefix: VersionPrefix::TestNetPrivateKeyWIF,
    xprv_prefix: VersionPrefix::Tprv,
    xpub_prefix: VersionPrefix::Tpub,
    bech32_hrp: "tb"
};

const REGTEST_PARAMS: NetworkParams = NetworkParams {
    bech32_hrp: "bcrt",
    ..TESTNET_PARAMS
};

impl Network {
    pub fn params(&self) -> &'static NetworkParams {
        match self {
            Network::Bitcoin => &MAINNET_PARAMS,
            Network::Testnet => &TESTNET_PARAMS,
            Network::Regtest => &REGTEST_PARAMS
        }
    }

    /// Network of a segwit human readable part
    pub fn from_hrp(hrp: &str) -> Option<Self> {
        match hrp.to_lowercase().as_str() {
            "bc" => Some(Network::Bitcoin),
            "tb" => Some(Network::Testnet),
            "bcrt" => Some(Network::Regtest),
            _ => None
        }
    }

    /// Network of a P2PKH or P2SH Base58 version byte
    pub fn from_base58_prefix(prefix: u8) -> Option<Self> {
        match prefix {
            0x00 | 0x05 => Some(Network::Bitcoin),
            0x6f | 0xc4 => Some(Network::Testnet),
            _ => None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest"
        }
    }
}

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Ok(Network::Bitcoin),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(UnknownNetwork(other.to_string()))
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_network_names() {
        assert_eq!("bitcoin".parse::<Network>().unwrap(), Network::Bitcoin);
        assert_eq!(" Mainnet ".parse::<Network>().unwrap(), Network::Bitcoin);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("regtest".parse::<Network>().unwrap(), Network::Regtest);
        assert_eq!("signet".parse::<Network>(), Err(UnknownNetwork("signet".to_string())));
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Network::Testnet).unwrap(), "\"testnet\"");
        assert_eq!(serde_json::from_str::<Network>("\"mainnet\"").unwrap(), Network::Bitcoin);
        assert_eq!(serde_json::from_str::<Network>("\"bitcoin\"").unwrap(), Network::Bitcoin);
    }

    #[test]
    fn parameter_sets() {
        assert_eq!(Network::Bitcoin.params().p2pkh_prefix.byte(), 0x00);
        assert_eq!(Network::Testnet.params().p2sh_prefix.byte(), 0xc4);
        assert_eq!(Network::Regtest.params().wif_prefix.byte(), 0xef);
        assert_eq!(Network::Regtest.params().bech32_hrp, "bcrt");
        assert_eq!(Network::from_hrp("TB"), Some(Network::Testnet));
        assert_eq!(Network::from_base58_prefix(0x05), Some(Network::Bitcoin));
    }
}
