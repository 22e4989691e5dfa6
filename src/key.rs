/*
    Private, public and x-only key value types.

    Keys are immutable once created. Every fallible import returns a KeyErr
    instead of panicking on bad input.
*/

use std::{fmt, str::FromStr};

use rand::rngs::OsRng;
use secp256k1::{Parity, PublicKey, SecretKey, XOnlyPublicKey};
use thiserror::Error;

use crate::{
    ec::{self, Context, EcError},
    encoding::{Base58, Base58Error},
    hash,
    network::Network,
    util::{decode_02x, encode_02x}
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyErr {
    #[error(transparent)]
    Ec(#[from] EcError),
    #[error("invalid WIF: {0}")]
    BadWif(String),
    #[error(transparent)]
    Base58(#[from] Base58Error),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivKey(SecretKey);

impl PrivKey {
    /**
        Generates a new private key from the operating system's CSPRNG.
    */
    pub fn new_rand() -> Self {
        Self(SecretKey::new(&mut OsRng))
    }

    /**
        Use a predefined 32 byte scalar as a secret key.
    */
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyErr> {
        Ok(Self(ec::parse_scalar(bytes)?))
    }

    pub fn from_hex(key: &str) -> Result<Self, KeyErr> {
        Self::from_slice(&decode_02x(key)?)
    }

    /**
        Import a key from wallet import format.
        Returns the key, whether it commits to a compressed public key and
        the network of its version byte.
    */
    pub fn from_wif(wif: &str) -> Result<(Self, bool, Network), KeyErr> {
        let bytes = Base58::check_decode(wif)?;
        let network = match bytes.first() {
            Some(0x80) => Network::Bitcoin,
            Some(0xef) => Network::Testnet,
            _ => return Err(KeyErr::BadWif("unknown version byte".to_string()))
        };

        match bytes.len() {
            33 => Ok((Self::from_slice(&bytes[1..])?, false, network)),
            34 if bytes[33] == 0x01 => Ok((Self::from_slice(&bytes[1..33])?, true, network)),
            _ => Err(KeyErr::BadWif(format!("unexpected payload length {}", bytes.len())))
        }
    }

    /**
        Export the private key in wallet import format (Base58Check with prefix).
        Use the parameter to indicate if the WIF should include the compression byte.
    */
    pub fn export_as_wif(&self, compressed: bool, network: Network) -> String {
        let mut key: Vec<u8> = self.as_bytes().to_vec();
        if compressed {
            key.push(0x01);
        }

        Base58::new(Some(network.params().wif_prefix), &key).check_encode()
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.secret_bytes()
    }

    pub fn hex(&self) -> String {
        encode_02x(&self.as_bytes())
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.0
    }

    /// (k + t) mod n
    pub fn add_tweak(&self, tweak: &[u8; 32]) -> Result<Self, KeyErr> {
        Ok(Self(ec::scalar_add(&self.0, tweak)?))
    }

    pub fn public_key(&self, ctx: &Context) -> PubKey {
        PubKey::from_priv_key(ctx, self)
    }
}

impl From<SecretKey> for PrivKey {
    fn from(k: SecretKey) -> Self {
        Self(k)
    }
}

impl FromStr for PrivKey {
    type Err = KeyErr;

    /// Accepts either 64 hex characters or a WIF string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(s)
        }
        Ok(Self::from_wif(s)?.0)
    }
}

/**
    A secp256k1 point and the SEC1 form it was supplied in.
    Keys derived from a private key are compressed.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PubKey {
    point: PublicKey,
    compressed: bool
}

impl PubKey {
    /**
        Finds the public key of a private key.
        The generator G multiplied k times, where k is the private key.
    */
    pub fn from_priv_key(ctx: &Context, k: &PrivKey) -> Self {
        PublicKey::from_secret_key(ctx.secp(), &k.0).into()
    }

    /// Parses a compressed or uncompressed SEC1 encoding, remembering which
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyErr> {
        Ok(Self {
            point: ec::parse_point(bytes)?,
            compressed: bytes.len() == 33
        })
    }

    pub fn from_hex(key: &str) -> Result<Self, KeyErr> {
        Self::from_slice(&decode_02x(key)?)
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The encoding the key was supplied in. 33 or 65 bytes.
    pub fn serialize(&self) -> Vec<u8> {
        if self.compressed {
            self.as_bytes().to_vec()
        } else {
            self.decompressed_bytes().to_vec()
        }
    }

    /**
        Returns the compressed public key. 32 bytes of x plus a parity prefix.
    */
    pub fn as_bytes(&self) -> [u8; 33] {
        self.point.serialize()
    }

    /**
        Returns the uncompressed public key. 64 bytes of x and y plus the 0x04 prefix.
    */
    pub fn decompressed_bytes(&self) -> [u8; 65] {
        self.point.serialize_uncompressed()
    }

    pub fn hex(&self) -> String {
        encode_02x(&self.as_bytes())
    }

    pub fn decompressed_hex(&self) -> String {
        encode_02x(&self.decompressed_bytes())
    }

    /// HASH160 of the compressed encoding
    pub fn hash160(&self) -> [u8; 20] {
        hash::hash160(self.as_bytes())
    }

    pub fn point(&self) -> &PublicKey {
        &self.point
    }

    /// Drops the y coordinate for use in taproot
    pub fn x_only(&self) -> SchnorrPublicKey {
        SchnorrPublicKey(self.point.x_only_public_key().0)
    }
}

impl From<PublicKey> for PubKey {
    fn from(point: PublicKey) -> Self {
        Self { point, compressed: true }
    }
}

/**
    32 byte x-only public key as used by BIP340 and taproot.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchnorrPublicKey(XOnlyPublicKey);

impl SchnorrPublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyErr> {
        XOnlyPublicKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| KeyErr::Ec(EcError::InvalidPoint))
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.serialize()
    }

    pub fn hex(&self) -> String {
        encode_02x(&self.as_bytes())
    }

    pub fn x_only(&self) -> &XOnlyPublicKey {
        &self.0
    }

    /// Full point with the given y parity
    pub fn public_key(&self, parity: Parity) -> PubKey {
        self.0.public_key(parity).into()
    }
}

impl From<XOnlyPublicKey> for SchnorrPublicKey {
    fn from(k: XOnlyPublicKey) -> Self {
        Self(k)
    }
}

impl FromStr for SchnorrPublicKey {
    type Err = KeyErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&decode_02x(s)?)
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl fmt::Display for SchnorrPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //Account 0, first receiving key of the BIP84 "abandon ... about" wallet
    const BIP84_WIF: &str = "KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d";

    #[test]
    fn wif_round_trip() {
        let (key, compressed, network) = PrivKey::from_wif(BIP84_WIF).unwrap();
        assert!(compressed);
        assert_eq!(network, Network::Bitcoin);
        assert_eq!(key.export_as_wif(true, Network::Bitcoin), BIP84_WIF);

        let uncompressed = key.export_as_wif(false, Network::Testnet);
        assert_eq!(PrivKey::from_wif(&uncompressed).unwrap(), (key, false, Network::Testnet));
        assert_eq!(uncompressed.parse::<PrivKey>().unwrap(), key);
        assert_eq!(key.hex().parse::<PrivKey>().unwrap(), key);
    }

    #[test]
    fn bad_private_keys() {
        assert_eq!(PrivKey::from_slice(&[0u8; 32]), Err(KeyErr::Ec(EcError::InvalidScalar)));
        assert_eq!(PrivKey::from_slice(&[1u8; 31]), Err(KeyErr::Ec(EcError::InvalidScalar)));
        assert!(matches!(PrivKey::from_hex("zz"), Err(KeyErr::Hex(_))));
        //Valid base58check payload with an address version byte
        assert!(matches!(PrivKey::from_wif("124ERAK4SqHMNWXycHPautn5zDYRKr3b2E"), Err(KeyErr::BadWif(_))));
    }

    #[test]
    fn public_key_encodings() {
        let ctx = Context::new();
        let key = PrivKey::from_hex("60164bec9512d004af7f71e7ed868c8e9ac2cc6234d8b682037ec80547595f2e").unwrap();
        let pk = key.public_key(&ctx);
        assert_eq!(pk.hex(), "030e93482fd0037d589b08c36bb22afc041338ba444f9f9d7ba129348f9be731c1");
        assert_eq!(pk.decompressed_bytes()[0], 0x04);
        assert!(pk.is_compressed());
        assert_eq!(pk.serialize(), pk.as_bytes().to_vec());

        //Same point, supplied uncompressed
        let long = PubKey::from_hex(&pk.decompressed_hex()).unwrap();
        assert!(!long.is_compressed());
        assert_eq!(long.point(), pk.point());
        assert_eq!(long.serialize(), pk.decompressed_bytes().to_vec());
        assert_eq!(long.hex(), pk.hex());
        assert_ne!(long, pk);
        assert_eq!(pk.x_only().as_bytes()[..], pk.as_bytes()[1..]);
        assert_eq!(pk.x_only().public_key(Parity::Odd), pk);
    }

    #[test]
    fn random_keys_are_distinct() {
        let ctx = Context::new();
        let a = PrivKey::new_rand();
        let b = PrivKey::new_rand();
        assert_ne!(a, b);
        assert_ne!(a.public_key(&ctx), b.public_key(&ctx));
    }
}
