/*
    Public operation surface.

    Each operation takes a serde request type and returns plain strings, so
    hosts can pass JSON straight through. Operations that derive or sign with
    secret keys also take a shared Context.

    Derivation paths:
        create_address                   m/44'/0'/0'/change/index
        create_schnorr_address           m/44'/0'/0'/change/index, BIP86 tweak
        create_schnorr_address_taproot   m/86'/0'/0'/change/index, BIP86 tweak

    Multisig address creation never fails. Any error is logged and turned into
    the "0x00" failure value, see MultisigAddress.
*/

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    address::{Address, Method},
    bip39::{self, Language, Mnemonic, PhraseLength},
    ec::Context,
    error::{Error, Result},
    hdwallet::{ExtendedKey, Path, Xprv},
    key::{PrivKey, PubKey},
    network::Network,
    script::Script,
    transaction::{self, OutPoint, TxErr, TxInput, TxOut},
    util::{decode_02x, encode_02x}
};

/// Value returned by create_multisig_address when the address cannot be built
pub const MULTISIG_FAILURE: &str = "0x00";

const BIP44_PURPOSE: u32 = 44;
const BIP86_PURPOSE: u32 = 86;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressParams {
    pub seed_hex: String,
    #[serde(deserialize_with = "number_or_string")]
    pub receive_or_change: u32,
    pub address_index: u32,
    #[serde(default)]
    pub network: Network,
    pub method: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchnorrAddressParams {
    pub seed_hex: String,
    #[serde(deserialize_with = "number_or_string")]
    pub receive_or_change: u32,
    pub address_index: u32,
    #[serde(default)]
    pub network: Network
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMultisigAddressParams {
    /// Compressed or uncompressed public keys as hex, in script order
    pub pubkeys: Vec<String>,
    #[serde(default)]
    pub network: Network,
    pub method: String,
    pub threshold: usize
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInputParams {
    pub address: String,
    /// Display order
    pub txid: String,
    pub vout: u32,
    /// Satoshis
    pub amount: u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutputParams {
    pub address: String,
    pub amount: u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignObj {
    pub inputs: Vec<TxInputParams>,
    pub outputs: Vec<TxOutputParams>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildAndSignTxParams {
    /// 64 hex characters or WIF
    pub private_key: String,
    pub sign_obj: SignObj,
    #[serde(default)]
    pub network: Network
}

/// Taproot spends take the same request shape
pub type TaprootSignParams = BuildAndSignTxParams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    pub private_key: String,
    pub public_key: String,
    pub address: String
}

/**
    Result of a multisig address request.
    Failure renders and serializes as "0x00".
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultisigAddress {
    Address(String),
    Failure
}

impl MultisigAddress {
    pub fn is_failure(&self) -> bool {
        matches!(self, MultisigAddress::Failure)
    }
}

impl fmt::Display for MultisigAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MultisigAddress::Address(a) => write!(f, "{}", a),
            MultisigAddress::Failure => write!(f, "{}", MULTISIG_FAILURE)
        }
    }
}

impl Serialize for MultisigAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

//receiveOrChange arrives as "0"/"1" from JS hosts and as a number from others
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        String(String)
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom)
    }
}

fn derive_key(ctx: &Context, seed_hex: &str, purpose: u32, change: u32, index: u32) -> Result<PrivKey> {
    if change > 1 { return Err(Error::InvalidChange(change)) }

    let seed = Zeroizing::new(decode_02x(seed_hex)?);
    let path = Path::from_purpose(purpose, 0, 0, change, index)?;
    debug!(%path, "deriving key");

    let child = Xprv::from_seed(&seed)?.derive_from_path(ctx, &path)?;
    Ok(child.get_prv())
}

fn schnorr_address(ctx: &Context, params: &CreateSchnorrAddressParams, purpose: u32) -> Result<AddressInfo> {
    let key = derive_key(ctx, &params.seed_hex, purpose, params.receive_or_change, params.address_index)?;
    let pk = key.public_key(ctx);
    let address = Address::p2tr_from_internal(ctx, &pk.x_only(), None, params.network)?;

    Ok(AddressInfo {
        private_key: key.hex(),
        public_key: pk.hex(),
        address: address.to_string()
    })
}

/**
    Derives the key at m/44'/0'/0'/change/index and encodes it with the
    requested method (p2pkh, p2sh or p2wpkh).
*/
pub fn create_address(ctx: &Context, params: &CreateAddressParams) -> Result<AddressInfo> {
    let method: Method = params.method.parse()?;
    debug!(%method, network = %params.network, "creating address");

    let key = derive_key(ctx, &params.seed_hex, BIP44_PURPOSE, params.receive_or_change, params.address_index)?;
    let pk = key.public_key(ctx);

    Ok(AddressInfo {
        private_key: key.hex(),
        public_key: pk.hex(),
        address: method.address(&pk, params.network).to_string()
    })
}

/**
    P2TR address of the key at m/44'/0'/0'/change/index.
    Uses the BIP44 purpose for compatibility, create_schnorr_address_taproot follows BIP86.
*/
pub fn create_schnorr_address(ctx: &Context, params: &CreateSchnorrAddressParams) -> Result<AddressInfo> {
    schnorr_address(ctx, params, BIP44_PURPOSE)
}

/// BIP86 P2TR address of the key at m/86'/0'/0'/change/index
pub fn create_schnorr_address_taproot(ctx: &Context, params: &CreateSchnorrAddressParams) -> Result<AddressInfo> {
    schnorr_address(ctx, params, BIP86_PURPOSE)
}

/**
    Multisig address with errors propagated.
    p2pkh gives P2SH(P2MS), p2wpkh gives P2WSH(P2MS) and p2sh gives P2SH(P2WSH(P2MS)).
    Keys go into the script in the encoding supplied. Uncompressed keys are
    only accepted for p2pkh.
*/
pub fn try_create_multisig_address(params: &CreateMultisigAddressParams) -> Result<String> {
    let method: Method = params.method.parse()?;
    let keys = params.pubkeys
        .iter()
        .map(|k| PubKey::from_hex(k))
        .collect::<std::result::Result<Vec<PubKey>, _>>()?;

    let script = Script::multisig(params.threshold, &keys)?;
    debug!(%method, threshold = params.threshold, keys = keys.len(), "creating multisig address");
    Ok(method.multisig_address(&script, params.network)?.to_string())
}

/**
    Multisig address for batch use. Never fails: any error is logged and
    returned as MultisigAddress::Failure.
*/
pub fn create_multisig_address(params: &CreateMultisigAddressParams) -> MultisigAddress {
    match try_create_multisig_address(params) {
        Ok(address) => MultisigAddress::Address(address),
        Err(e) => {
            warn!(error = %e, "multisig address creation failed");
            MultisigAddress::Failure
        }
    }
}

fn resolve_inputs(inputs: &[TxInputParams], network: Network) -> Result<Vec<(Address, TxInput)>> {
    inputs.iter().map(|input| {
        let address = Address::from_str_checked(&input.address, network)?;
        let tx_input = TxInput {
            outpoint: OutPoint::from_hex_txid(&input.txid, input.vout)?,
            prevout: TxOut::new(input.amount, address.script_pubkey())
        };
        Ok((address, tx_input))
    }).collect()
}

fn resolve_outputs(outputs: &[TxOutputParams], network: Network) -> Result<Vec<TxOut>> {
    outputs.iter().map(|output| {
        let address = Address::from_str_checked(&output.address, network)?;
        Ok(TxOut::new(output.amount, address.script_pubkey()))
    }).collect()
}

fn sign_resolved(ctx: &Context, key: &PrivKey, inputs: Vec<TxInput>, outputs: Vec<TxOut>) -> Result<String> {
    let signed = transaction::build_and_sign(ctx, inputs, outputs, key)?;
    info!(txid = %signed.txid_hex(), "signed transaction");
    Ok(signed.hex())
}

/**
    Builds a version 2 transaction and signs every input with one key.
    Returns the serialized transaction as hex.
*/
pub fn build_and_sign_tx(ctx: &Context, params: &BuildAndSignTxParams) -> Result<String> {
    let key: PrivKey = params.private_key.parse()?;
    let inputs = resolve_inputs(&params.sign_obj.inputs, params.network)?;
    let outputs = resolve_outputs(&params.sign_obj.outputs, params.network)?;

    sign_resolved(ctx, &key, inputs.into_iter().map(|(_, i)| i).collect(), outputs)
}

/**
    Key path spend of P2TR outputs locked to the BIP86 tweak of the key.
    Every input must be a P2TR address.
*/
pub fn sign_btc_taproot_transaction(ctx: &Context, params: &TaprootSignParams) -> Result<String> {
    let key: PrivKey = params.private_key.parse()?;
    let inputs = resolve_inputs(&params.sign_obj.inputs, params.network)?;
    if let Some(index) = inputs.iter().position(|(a, _)| !matches!(a, Address::P2TR(..))) {
        return Err(TxErr::UnsupportedInput(index).into())
    }
    let outputs = resolve_outputs(&params.sign_obj.outputs, params.network)?;

    sign_resolved(ctx, &key, inputs.into_iter().map(|(_, i)| i).collect(), outputs)
}

/// Random mnemonic of 12, 15, 18, 21 or 24 words
pub fn create_mnemonic(word_count: usize, language: &str) -> Result<String> {
    let lang: Language = language.parse()?;
    let length = PhraseLength::from_word_count(word_count)?;
    Ok(Mnemonic::new(length, lang)?.phrase())
}

pub fn entropy_to_mnemonic(entropy_hex: &str, language: &str) -> Result<String> {
    let lang: Language = language.parse()?;
    let entropy = Zeroizing::new(decode_02x(entropy_hex)?);
    Ok(Mnemonic::from_entropy(&entropy, lang)?.phrase())
}

/// Entropy of a phrase as hex, the checksum is verified
pub fn mnemonic_to_entropy(phrase: &str, language: &str) -> Result<String> {
    let lang: Language = language.parse()?;
    let entropy = Mnemonic::from_phrase(phrase, lang)?.to_entropy()?;
    Ok(encode_02x(&entropy))
}

/// Seed of a phrase as hex. The phrase is not checked against a word list.
pub fn mnemonic_to_seed_sync(phrase: &str, passphrase: &str) -> String {
    encode_02x(&bip39::seed_from_phrase(phrase, passphrase)[..])
}

/**
    Same output as mnemonic_to_seed_sync, stretched on the blocking pool.
    Must be awaited inside a Tokio runtime, spawning the blocking task panics
    outside of one.
*/
pub async fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<String> {
    let seed = bip39::seed_from_phrase_async(phrase.to_string(), passphrase.to_string()).await?;
    Ok(encode_02x(&seed[..]))
}

/// Fails only for an unsupported language
pub fn validate_mnemonic(phrase: &str, language: &str) -> Result<bool> {
    let lang: Language = language.parse()?;
    Ok(bip39::validate(phrase, lang))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_json_shapes() {
        let params: CreateAddressParams = serde_json::from_str(r#"{
            "seedHex": "00",
            "receiveOrChange": "1",
            "addressIndex": 4,
            "network": "testnet",
            "method": "p2wpkh"
        }"#).unwrap();
        assert_eq!(params.receive_or_change, 1);
        assert_eq!(params.network, Network::Testnet);

        let params: CreateSchnorrAddressParams = serde_json::from_str(
            r#"{"seedHex": "00", "receiveOrChange": 0, "addressIndex": 0}"#
        ).unwrap();
        assert_eq!(params.network, Network::Bitcoin);

        let info = AddressInfo { private_key: "a".into(), public_key: "b".into(), address: "c".into() };
        assert_eq!(serde_json::to_string(&info).unwrap(), r#"{"privateKey":"a","publicKey":"b","address":"c"}"#);
        assert_eq!(serde_json::to_string(&MultisigAddress::Failure).unwrap(), r#""0x00""#);
    }

    #[test]
    fn change_must_be_zero_or_one() {
        let ctx = Context::new();
        let params = CreateAddressParams {
            seed_hex: "000102030405060708090a0b0c0d0e0f".into(),
            receive_or_change: 2,
            address_index: 0,
            network: Network::Bitcoin,
            method: "p2pkh".into()
        };
        assert_eq!(create_address(&ctx, &params), Err(Error::InvalidChange(2)));
    }

    #[test]
    fn unsupported_languages() {
        assert!(matches!(create_mnemonic(12, "klingon"), Err(Error::Mnemonic(bip39::MnemonicErr::UnsupportedLanguage(_)))));
        assert!(matches!(create_mnemonic(13, "english"), Err(Error::Mnemonic(bip39::MnemonicErr::InvalidWordCount(13)))));
        assert!(validate_mnemonic("abandon", "klingon").is_err());
    }
}
