/*
    Network tagged addresses.

    Legacy and P2SH addresses are Base58Check(version || hash).
    Segwit addresses are Bech32 (version 0) or Bech32m (version 1+)
    over the witness program.

    Regtest shares the testnet Base58 prefixes, so a regtest P2PKH or P2SH
    address decodes as testnet.
*/

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ec::Context,
    encoding::{bech32, Base58, Base58Error, Bech32Err},
    hash,
    key::{PubKey, SchnorrPublicKey},
    network::Network,
    script::{Script, ScriptErr, ScriptType, WitnessProgram},
    taproot::{self, TaprootErr}
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressErr {
    #[error("Method '{0}' is not supported.")]
    UnsupportedMethod(String),
    #[error(transparent)]
    Base58(#[from] Base58Error),
    #[error(transparent)]
    Bech32(#[from] Bech32Err),
    #[error(transparent)]
    Script(#[from] ScriptErr),
    #[error(transparent)]
    Taproot(#[from] TaprootErr),
    #[error("unknown address version byte {0:#04x}")]
    UnknownVersion(u8),
    #[error("unexpected payload length {0}")]
    InvalidLength(usize),
    #[error("unknown human readable part '{0}'")]
    UnknownHrp(String),
    #[error("witness version {0} has no address type")]
    UnsupportedWitnessVersion(u8),
    #[error("script has no address form")]
    NonStandardScript,
    #[error("address is for {found}, expected {expected}")]
    WrongNetwork { expected: Network, found: Network }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    P2PKH([u8; 20], Network),
    P2SH([u8; 20], Network),
    P2WPKH([u8; 20], Network),
    P2WSH([u8; 32], Network),
    P2TR([u8; 32], Network)
}

impl Address {
    /**
        P2PKH address of a compressed public key.
        Base58Check(version || Hash160(public key))
    */
    pub fn p2pkh(pk: &PubKey, network: Network) -> Self {
        Address::P2PKH(pk.hash160(), network)
    }

    /// P2PKH address committing to the uncompressed encoding of the key
    pub fn p2pkh_uncompressed(pk: &PubKey, network: Network) -> Self {
        Address::P2PKH(hash::hash160(pk.decompressed_bytes()), network)
    }

    /// P2SH address of a redeem script
    pub fn p2sh(redeem_script: &Script, network: Network) -> Self {
        Address::P2SH(redeem_script.hash(), network)
    }

    pub fn p2wpkh(pk: &PubKey, network: Network) -> Self {
        Address::P2WPKH(pk.hash160(), network)
    }

    /// P2SH wrapping the P2WPKH program of the key
    pub fn p2sh_p2wpkh(pk: &PubKey, network: Network) -> Self {
        Self::p2sh(&Script::p2wpkh(pk), network)
    }

    /// P2WSH address of a witness script
    pub fn p2wsh(witness_script: &Script, network: Network) -> Self {
        Address::P2WSH(hash::sha256(&witness_script.code), network)
    }

    /// P2SH wrapping the P2WSH program of the script
    pub fn p2sh_p2wsh(witness_script: &Script, network: Network) -> Self {
        Self::p2sh(&Script::p2wsh(witness_script), network)
    }

    /// P2TR address of an already tweaked output key
    pub fn p2tr(output_key: &SchnorrPublicKey, network: Network) -> Self {
        Address::P2TR(output_key.as_bytes(), network)
    }

    /**
        P2TR address of an internal key, tweaked with the merkle root of its
        script tree or with nothing for a key path only output.
    */
    pub fn p2tr_from_internal(ctx: &Context, internal_key: &SchnorrPublicKey, merkle_root: Option<[u8; 32]>, network: Network) -> Result<Self, AddressErr> {
        let (output_key, _) = taproot::output_key(ctx, internal_key, merkle_root)?;
        Ok(Self::p2tr(&output_key, network))
    }

    pub fn network(&self) -> Network {
        match self {
            Address::P2PKH(_, n) |
            Address::P2SH(_, n) |
            Address::P2WPKH(_, n) |
            Address::P2WSH(_, n) |
            Address::P2TR(_, n) => *n
        }
    }

    /**
        Whether the address can be used on a network.
        Base58 addresses decode as testnet, which regtest shares.
    */
    pub fn is_valid_for_network(&self, network: Network) -> bool {
        let found = self.network();
        let base58 = matches!(self, Address::P2PKH(..) | Address::P2SH(..));
        found == network || (base58 && found == Network::Testnet && network == Network::Regtest)
    }

    /// Parses an address and checks that it belongs to the given network
    pub fn from_str_checked(address: &str, network: Network) -> Result<Self, AddressErr> {
        let parsed: Address = address.parse()?;
        if !parsed.is_valid_for_network(network) {
            return Err(AddressErr::WrongNetwork { expected: network, found: parsed.network() })
        }
        Ok(parsed)
    }

    /// The locking script paying to this address
    pub fn script_pubkey(&self) -> Script {
        match self {
            Address::P2PKH(h, _) => Script::p2pkh_from_hash(h),
            Address::P2SH(h, _) => Script::p2sh_from_hash(h),
            Address::P2WPKH(h, _) => WitnessProgram { version: 0, program: h.to_vec() }.to_scriptpubkey(),
            Address::P2WSH(h, _) => WitnessProgram { version: 0, program: h.to_vec() }.to_scriptpubkey(),
            Address::P2TR(k, _) => WitnessProgram { version: 1, program: k.to_vec() }.to_scriptpubkey()
        }
    }

    /**
        The address a locking script pays to.
        Bare multisig and non standard scripts have none.
    */
    pub fn from_script(script: &Script, network: Network) -> Result<Self, AddressErr> {
        match script.classify() {
            ScriptType::P2PKH(h) => Ok(Address::P2PKH(h, network)),
            ScriptType::P2SH(h) => Ok(Address::P2SH(h, network)),
            ScriptType::P2WPKH(h) => Ok(Address::P2WPKH(h, network)),
            ScriptType::P2WSH(h) => Ok(Address::P2WSH(h, network)),
            ScriptType::P2TR(k) => Ok(Address::P2TR(k, network)),
            ScriptType::P2MS { .. } | ScriptType::NonStandard => Err(AddressErr::NonStandardScript)
        }
    }

    fn witness_program(&self) -> Option<WitnessProgram> {
        match self {
            Address::P2WPKH(h, _) => Some(WitnessProgram { version: 0, program: h.to_vec() }),
            Address::P2WSH(h, _) => Some(WitnessProgram { version: 0, program: h.to_vec() }),
            Address::P2TR(k, _) => Some(WitnessProgram { version: 1, program: k.to_vec() }),
            _ => None
        }
    }

    fn decode_base58(address: &str) -> Result<Self, AddressErr> {
        let bytes = Base58::check_decode(address)?;
        if bytes.len() != 21 { return Err(AddressErr::InvalidLength(bytes.len())) }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[1..]);
        let network = Network::from_base58_prefix(bytes[0]).ok_or(AddressErr::UnknownVersion(bytes[0]))?;
        match bytes[0] {
            0x00 | 0x6f => Ok(Address::P2PKH(hash, network)),
            _ => Ok(Address::P2SH(hash, network))
        }
    }

    fn decode_segwit(address: &str) -> Result<Self, AddressErr> {
        let (hrp, program) = bech32::decode(address)?;
        let network = Network::from_hrp(&hrp).ok_or(AddressErr::UnknownHrp(hrp))?;

        let mut bytes = [0u8; 32];
        match (program.version, program.program.len()) {
            (0, 20) => {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(&program.program);
                Ok(Address::P2WPKH(hash, network))
            },
            (0, 32) => {
                bytes.copy_from_slice(&program.program);
                Ok(Address::P2WSH(bytes, network))
            },
            (1, 32) => {
                bytes.copy_from_slice(&program.program);
                Ok(Address::P2TR(bytes, network))
            },
            (v, _) => Err(AddressErr::UnsupportedWitnessVersion(v))
        }
    }
}

impl FromStr for Address {
    type Err = AddressErr;

    /**
        Parses Base58Check P2PKH/P2SH and Bech32/Bech32m segwit addresses,
        validating checksum, checksum variant, program length and network.
    */
    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let address = address.trim();
        let lower = address.to_lowercase();
        let is_segwit = ["bc1", "tb1", "bcrt1"].iter().any(|p| lower.starts_with(p));
        if is_segwit {
            Self::decode_segwit(address)
        } else {
            Self::decode_base58(address)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let params = self.network().params();
        let encoded = match self {
            Address::P2PKH(h, _) => Base58::new(Some(params.p2pkh_prefix), h).check_encode(),
            Address::P2SH(h, _) => Base58::new(Some(params.p2sh_prefix), h).check_encode(),
            _ => match self.witness_program() {
                Some(program) => program.to_address(self.network()).map_err(|_| fmt::Error)?,
                None => return Err(fmt::Error)
            }
        };
        write!(f, "{}", encoded)
    }
}

/**
    Single key address kinds accepted by the address operations.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    P2pkh,
    P2sh,
    P2wpkh
}

impl Method {
    /**
        Address of a single key.
        p2sh is P2SH wrapping P2WPKH.
    */
    pub fn address(&self, pk: &PubKey, network: Network) -> Address {
        match self {
            Method::P2pkh => Address::p2pkh(pk, network),
            Method::P2sh => Address::p2sh_p2wpkh(pk, network),
            Method::P2wpkh => Address::p2wpkh(pk, network)
        }
    }

    /**
        Address of a multisig script.
        p2pkh is P2SH(P2MS), p2wpkh is P2WSH(P2MS), p2sh is P2SH(P2WSH(P2MS)).
        The two witness forms reject scripts holding uncompressed keys.
    */
    pub fn multisig_address(&self, multisig_script: &Script, network: Network) -> Result<Address, AddressErr> {
        match self {
            Method::P2pkh => Ok(Address::p2sh(multisig_script, network)),
            Method::P2wpkh => {
                multisig_script.check_witness_keys()?;
                Ok(Address::p2wsh(multisig_script, network))
            },
            Method::P2sh => {
                multisig_script.check_witness_keys()?;
                Ok(Address::p2sh_p2wsh(multisig_script, network))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::P2pkh => "p2pkh",
            Method::P2sh => "p2sh",
            Method::P2wpkh => "p2wpkh"
        }
    }
}

impl FromStr for Method {
    type Err = AddressErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p2pkh" => Ok(Method::P2pkh),
            "p2sh" => Ok(Method::P2sh),
            "p2wpkh" => Ok(Method::P2wpkh),
            _ => Err(AddressErr::UnsupportedMethod(s.to_string()))
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PrivKey;

    const TEST_PUB_KEY_HEX: &str = "0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe";

    fn test_pub_key() -> PubKey {
        PubKey::from_hex(TEST_PUB_KEY_HEX).unwrap()
    }

    #[test]
    fn bitcoin_address_tests() {
        let pk = test_pub_key();
        assert_eq!(Address::p2pkh(&pk, Network::Bitcoin).to_string(), "124ERAK4SqHMNWXycHPautn5zDYRKr3b2E");
        assert_eq!(Address::p2pkh_uncompressed(&pk, Network::Bitcoin).to_string(), "1GK8NbKAtt6QvqeVMGkdbXVu9qtw74oxPz");
    }

    #[test]
    fn testnet_legacy_address_tests() {
        let ctx = Context::new();
        let (key, _, _) = PrivKey::from_wif("cNShtSaCAzPPSFgm5LiGUhkuyBhJyV4jQqYXP3asyXK9k8uhiZdx").unwrap();
        let address = Address::p2pkh(&key.public_key(&ctx), Network::Testnet);
        assert_eq!(address.to_string(), "msSJzRfQb2T3hvws3vRhqtK2Ao39cabEa2");

        //Random keys land on the m or n prefix
        for _ in 0..5 {
            let pk = PrivKey::new_rand().public_key(&ctx);
            let address = Address::p2pkh(&pk, Network::Testnet).to_string();
            assert!(matches!(address.chars().next(), Some('m') | Some('n')));
        }
    }

    #[test]
    fn p2sh_address_tests() {
        let script = Script::new(vec![0x6a, 0x29, 0x05, 0x20, 0x03]);
        assert_eq!(Address::p2sh(&script, Network::Bitcoin).to_string(), "33SjjXog5Tqm3kCYNGCQBH46gc48a4SUXn");

        for i in 0..5 {
            let script = Script::new(vec![i; 5]);
            assert!(Address::p2sh(&script, Network::Bitcoin).to_string().starts_with('3'));
            assert!(Address::p2sh(&script, Network::Testnet).to_string().starts_with('2'));
        }
    }

    #[test]
    fn p2wpkh_address_tests() {
        let ctx = Context::new();
        let cases = [
            ("cPYWWA7yv4ivb2ueWJP6SKr6rSJiT6JfGkdVrgvhrWR7soE8RxBG", "tb1qxauw2dslmtgdyzw73gtv9mzv5erp3xf7mt83vq"),
            ("cRzmfLNVsbHp5MYJhY8xz6DaYJBUgSKQL8jwU2xL3su6GScPgxsb", "tb1qj8rvxxnzkdapv3rueazzyn434duv5q5ep3ze5e")
        ];
        for (wif, expected) in cases {
            let key: PrivKey = wif.parse().unwrap();
            assert_eq!(Address::p2wpkh(&key.public_key(&ctx), Network::Testnet).to_string(), expected);
        }
    }

    #[test]
    fn p2wsh_address_tests() {
        let script = Script::new(vec![0x6a, 0x29, 0x05, 0x20, 0x03]);
        assert_eq!(Address::p2wsh(&script, Network::Bitcoin).to_string(), "bc1q4sr2gyed4ww8zm0t9ktn47qxlu2nhl5ejkf6fjzfttnsjvxdkqjqe7yhq9");
        assert_eq!(Address::p2wsh(&script, Network::Testnet).to_string(), "tb1q4sr2gyed4ww8zm0t9ktn47qxlu2nhl5ejkf6fjzfttnsjvxdkqjqwkjc62");
    }

    #[test]
    fn decode_round_trip() {
        let ctx = Context::new();
        let pk = test_pub_key();
        let script = Script::new(vec![0x6a, 0x29, 0x05, 0x20, 0x03]);
        let addresses = [
            Address::p2pkh(&pk, Network::Bitcoin),
            Address::p2pkh(&pk, Network::Testnet),
            Address::p2sh_p2wpkh(&pk, Network::Bitcoin),
            Address::p2wpkh(&pk, Network::Bitcoin),
            Address::p2wpkh(&pk, Network::Regtest),
            Address::p2wsh(&script, Network::Testnet),
            Address::p2tr_from_internal(&ctx, &pk.x_only(), None, Network::Bitcoin).unwrap()
        ];

        for address in addresses {
            let decoded: Address = address.to_string().parse().unwrap();
            assert_eq!(decoded, address);
            assert_eq!(Address::from_script(&address.script_pubkey(), address.network()).unwrap(), address);
        }
    }

    #[test]
    fn decode_errors() {
        //Bad checksum
        assert!(matches!("124ERAK4SqHMNWXycHPautn5zDYRKr3b2F".parse::<Address>(), Err(AddressErr::Base58(_))));
        //Version 0 program encoded with Bech32m
        assert_eq!(
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kemeawh".parse::<Address>(),
            Err(AddressErr::Bech32(Bech32Err::WrongVariant(0)))
        );
        //Version 1 program encoded with Bech32
        assert_eq!(
            "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqh2y7hd".parse::<Address>(),
            Err(AddressErr::Bech32(Bech32Err::WrongVariant(1)))
        );
        //Valid Bech32m version 16 program with no address type
        assert_eq!("BC1SW50QGDZ25J".parse::<Address>(), Err(AddressErr::UnsupportedWitnessVersion(16)));
        assert_eq!(
            Address::from_script(&Script::new(vec![0x6a]), Network::Bitcoin),
            Err(AddressErr::NonStandardScript)
        );
    }

    #[test]
    fn network_checks() {
        let pk = test_pub_key();
        let testnet = Address::p2pkh(&pk, Network::Testnet).to_string();
        assert!(Address::from_str_checked(&testnet, Network::Regtest).is_ok());
        assert_eq!(
            Address::from_str_checked(&testnet, Network::Bitcoin),
            Err(AddressErr::WrongNetwork { expected: Network::Bitcoin, found: Network::Testnet })
        );

        let regtest = Address::p2wpkh(&pk, Network::Regtest).to_string();
        assert!(regtest.starts_with("bcrt1q"));
        assert!(Address::from_str_checked(&regtest, Network::Testnet).is_err());
    }

    #[test]
    fn methods() {
        assert_eq!("P2WPKH".parse::<Method>().unwrap(), Method::P2wpkh);
        let err = "p2tr".parse::<Method>().unwrap_err();
        assert_eq!(err.to_string(), "Method 'p2tr' is not supported.");
    }

    #[test]
    fn multisig_methods() {
        let long = PubKey::from_hex(&test_pub_key().decompressed_hex()).unwrap();
        let script = Script::multisig(1, &[long]).unwrap();

        assert_eq!(
            Method::P2pkh.multisig_address(&script, Network::Bitcoin),
            Ok(Address::p2sh(&script, Network::Bitcoin))
        );
        for method in [Method::P2wpkh, Method::P2sh] {
            assert_eq!(
                method.multisig_address(&script, Network::Bitcoin),
                Err(AddressErr::Script(ScriptErr::UncompressedKey))
            );
        }

        let script = Script::multisig(1, &[test_pub_key()]).unwrap();
        assert_eq!(
            Method::P2sh.multisig_address(&script, Network::Testnet),
            Ok(Address::p2sh_p2wsh(&script, Network::Testnet))
        );
    }

    #[test]
    fn oversized_multisig_has_no_address() {
        //OP_1 <256 keys> OP_16 OP_CHECKMULTISIG
        let mut code = vec![0x51];
        for _ in 0..256 {
            code.push(0x21);
            code.extend_from_slice(&test_pub_key().as_bytes());
        }
        code.extend_from_slice(&[0x60, 0xae]);

        assert_eq!(Address::from_script(&Script::new(code), Network::Bitcoin), Err(AddressErr::NonStandardScript));
    }
}
