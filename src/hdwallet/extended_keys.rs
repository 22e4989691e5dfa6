/*
    This module implements extended keys that are
    used in BIP32 hierarchical deterministic wallets.

    An extended key is a key plus a 32 byte chaincode, along with the
    depth, parent fingerprint and index needed for serialisation.
*/

use std::str::FromStr;

use crate::{
    bip39::Mnemonic,
    ec::Context,
    encoding::{
        base58::Base58,
        base58::Base58Error,
        version_prefix::VersionPrefix
    },
    hash,
    hdwallet::{
        ckd::{
            self,
            derive_xprv,
            derive_xpub,
            ChildOptions
        },
        HDWError,
        Path
    },
    key::{
        PrivKey,
        PubKey
    },
    util::as_u32_be
};

//version || depth || parent fingerprint || index || chaincode || key data
const SERIALIZED_LEN: usize = 78;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xprv {
    key: PrivKey,
    chaincode: [u8; 32],
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub index: u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xpub {
    key: PubKey,
    chaincode: [u8; 32],
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub index: u32
}

pub trait ExtendedKey: Sized + Clone {
    /**
        Returns the chaincode of the extended key
    */
    fn chaincode(&self) -> [u8; 32];

    /**
        Return the non extended public key of self.
    */
    fn get_pub(&self, ctx: &Context) -> PubKey;

    /**
        Derives the child key of self
    */
    fn get_xchild(&self, ctx: &Context, options: ChildOptions) -> Result<Self, HDWError>;

    /**
        Serialize the extended key with the selected prefix
    */
    fn serialize(&self, v_prefix: &VersionPrefix) -> String;

    /// First 4 bytes of the HASH160 of the public key
    fn fingerprint(&self, ctx: &Context) -> [u8; 4] {
        ckd::fingerprint(&self.get_pub(ctx).as_bytes())
    }

    /**
        Derive the key at the given path.
        The empty path returns the key unchanged.
    */
    fn derive_from_path(&self, ctx: &Context, path: &Path) -> Result<Self, HDWError> {
        path.children
            .iter()
            .try_fold(self.clone(), |key, child| key.get_xchild(ctx, *child))
    }
}

impl Xprv {
    pub fn construct(key: PrivKey, chaincode: [u8; 32], depth: u8, pf: [u8; 4], index: u32) -> Self {
        Self {
            key,
            chaincode,
            depth,
            parent_fingerprint: pf,
            index
        }
    }

    /**
        Creates the master key of a seed.
        HMAC-SHA512(key = "Bitcoin seed", data = seed) split into key and chaincode.
    */
    pub fn from_seed(seed: &[u8]) -> Result<Self, HDWError> {
        if !(16..=64).contains(&seed.len()) {
            return Err(HDWError::InvalidSeedLength(seed.len()))
        }

        let hash: [u8; 64] = hash::hmac_sha512(seed, b"Bitcoin seed");
        let key = PrivKey::from_slice(&hash[0..32]).map_err(|_| HDWError::InvalidMasterKey)?;
        let mut chaincode = [0u8; 32];
        chaincode.copy_from_slice(&hash[32..64]);

        Ok(Self::construct(key, chaincode, 0, [0x00; 4], 0))
    }

    /**
        Convert a mnemonic and passphrase to the master private key.
    */
    pub fn from_mnemonic(mnemonic: &Mnemonic, passphrase: &str) -> Result<Self, HDWError> {
        Self::from_seed(&mnemonic.to_seed(passphrase)[..])
    }

    /**
        Return the private key part of self
    */
    pub fn get_prv(&self) -> PrivKey {
        self.key
    }

    /**
        Find the corresponding xpub
    */
    pub fn get_xpub(&self, ctx: &Context) -> Xpub {
        Xpub::construct(
            self.key.public_key(ctx),
            self.chaincode,
            self.depth,
            self.parent_fingerprint,
            self.index
        )
    }
}

impl ExtendedKey for Xprv {
    fn chaincode(&self) -> [u8; 32] {
        self.chaincode
    }

    fn get_pub(&self, ctx: &Context) -> PubKey {
        self.key.public_key(ctx)
    }

    fn get_xchild(&self, ctx: &Context, options: ChildOptions) -> Result<Self, HDWError> {
        derive_xprv(ctx, self, options)
    }

    fn serialize(&self, v_prefix: &VersionPrefix) -> String {
        let mut key_data = vec![0x00]; //private keys are padded to 33 bytes
        key_data.extend_from_slice(&self.key.as_bytes());
        serialize_payload(v_prefix, self.depth, &self.parent_fingerprint, self.index, &self.chaincode, &key_data)
    }
}

impl Xpub {
    pub fn construct(key: PubKey, chaincode: [u8; 32], depth: u8, pf: [u8; 4], index: u32) -> Self {
        Self {
            key,
            chaincode,
            depth,
            parent_fingerprint: pf,
            index
        }
    }

    pub fn key(&self) -> PubKey {
        self.key
    }
}

impl ExtendedKey for Xpub {
    fn chaincode(&self) -> [u8; 32] {
        self.chaincode
    }

    fn get_pub(&self, _ctx: &Context) -> PubKey {
        self.key
    }

    fn get_xchild(&self, ctx: &Context, options: ChildOptions) -> Result<Self, HDWError> {
        derive_xpub(ctx, self, options)
    }

    fn serialize(&self, v_prefix: &VersionPrefix) -> String {
        serialize_payload(v_prefix, self.depth, &self.parent_fingerprint, self.index, &self.chaincode, &self.key.as_bytes())
    }
}

fn serialize_payload(v_prefix: &VersionPrefix, depth: u8, fingerprint: &[u8; 4], index: u32, chaincode: &[u8; 32], key_data: &[u8]) -> String {
    let mut payload: Vec<u8> = Vec::with_capacity(SERIALIZED_LEN - 4);
    payload.push(depth);
    payload.extend_from_slice(fingerprint);
    payload.extend_from_slice(&index.to_be_bytes());
    payload.extend_from_slice(chaincode);
    payload.extend_from_slice(key_data);

    Base58::new(Some(*v_prefix), &payload).check_encode()
}

/*
    Decoded fields shared by xprv and xpub parsing
*/
struct RawXKey {
    prefix: VersionPrefix,
    depth: u8,
    fingerprint: [u8; 4],
    index: u32,
    chaincode: [u8; 32],
    key_data: [u8; 33]
}

fn decode_payload(key: &str) -> Result<RawXKey, HDWError> {
    let bytes = Base58::check_decode(key).map_err(|e| match e {
        Base58Error::BadChar(c) => HDWError::BadChar(c),
        Base58Error::BadChecksum => HDWError::BadChecksum,
        _ => HDWError::BadKey
    })?;
    if bytes.len() != SERIALIZED_LEN { return Err(HDWError::BadKey) }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[0..4]);
    let prefix = VersionPrefix::from_int(as_u32_be(&version))
        .ok_or_else(|| HDWError::BadPrefix(version.to_vec()))?;

    let mut fingerprint = [0u8; 4];
    let mut index = [0u8; 4];
    let mut chaincode = [0u8; 32];
    let mut key_data = [0u8; 33];
    fingerprint.copy_from_slice(&bytes[5..9]);
    index.copy_from_slice(&bytes[9..13]);
    chaincode.copy_from_slice(&bytes[13..45]);
    key_data.copy_from_slice(&bytes[45..78]);

    let raw = RawXKey {
        prefix,
        depth: bytes[4],
        fingerprint,
        index: as_u32_be(&index),
        chaincode,
        key_data
    };

    //A master key has no parent
    if raw.depth == 0 && (raw.fingerprint != [0u8; 4] || raw.index != 0) {
        return Err(HDWError::BadKey)
    }
    Ok(raw)
}

impl FromStr for Xprv {
    type Err = HDWError;

    /**
        Import an extended private key from a string.
        Accepts every private prefix (xprv, tprv, yprv, zprv, uprv, vprv).
    */
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let raw = decode_payload(key)?;
        if !raw.prefix.is_extended_private() {
            return Err(HDWError::BadPrefix(raw.prefix.to_bytes()))
        }
        if raw.key_data[0] != 0x00 { return Err(HDWError::BadKey) }
        let key = PrivKey::from_slice(&raw.key_data[1..]).map_err(|_| HDWError::BadKey)?;

        Ok(Self::construct(key, raw.chaincode, raw.depth, raw.fingerprint, raw.index))
    }
}

impl FromStr for Xpub {
    type Err = HDWError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let raw = decode_payload(key)?;
        if !raw.prefix.is_extended_public() {
            return Err(HDWError::BadPrefix(raw.prefix.to_bytes()))
        }
        //Only compressed points are valid here
        if !matches!(raw.key_data[0], 0x02 | 0x03) { return Err(HDWError::BadKey) }
        let key = PubKey::from_slice(&raw.key_data).map_err(|_| HDWError::BadKey)?;

        Ok(Self::construct(key, raw.chaincode, raw.depth, raw.fingerprint, raw.index))
    }
}

#[cfg(test)]
mod tests {
    /*
        Single step derivation is tested in ckd.rs
    */

    use super::*;
    use crate::bip39::Language;

    //Data generated on learnmeabitcoin.com/technical/hd-wallets
    const TEST_MNEMONIC: &str = "glow laugh acquire menu anchor evil occur put hover renew calm purpose";
    const TEST_MPRIV: &str = "081549973bafbba825b31bcc402a3c4ed8e3185c2f3a31c75e55f423e9629aa3";
    const TEST_MCC: &str = "1d7d2a4c940be028b945302ad79dd2ce2afe5ed55e1a2937a5af57f8401e73dd";
    const TEST_XPRV: &str = "xprv9s21ZrQH143K2MPKHPWh91wRxLKehoCNsRrwizj2xNaj9zD5SHMNiHJesDEYgJAavgNE1fDWLgYNneHeSA8oVeVXVYomhP1wxdzZtKsLJbc";
    const TEST_XPUB: &str = "xpub661MyMwAqRbcEqTnPR3hW9tAWNA97FvEEenYXP8eWi7i2nYDypfdG5d8iWfK8YgesKi2EE5mk9THcTqnveDWwZVMuctjmxeEaUKgtg7CEEc";

    fn master() -> Xprv {
        let mnemonic = Mnemonic::from_phrase(TEST_MNEMONIC, Language::English).unwrap();
        Xprv::from_mnemonic(&mnemonic, "").unwrap()
    }

    #[test]
    fn extended_keys_test() {
        let ctx = Context::new();
        let xprv = master();
        assert_eq!(hex::encode(xprv.get_prv().as_bytes()), TEST_MPRIV);
        assert_eq!(hex::encode(xprv.chaincode()), TEST_MCC);
        assert_eq!(xprv.serialize(&VersionPrefix::Xprv), TEST_XPRV);
        assert_eq!(xprv.get_xpub(&ctx).serialize(&VersionPrefix::Xpub), TEST_XPUB);
    }

    #[test]
    fn bip32_vector_one_master() {
        let ctx = Context::new();
        let xprv = Xprv::from_seed(&hex::decode("000102030405060708090a0b0c0d0e0f").unwrap()).unwrap();
        assert_eq!(
            xprv.serialize(&VersionPrefix::Xprv),
            "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi"
        );
        assert_eq!(
            xprv.get_xpub(&ctx).serialize(&VersionPrefix::Xpub),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
    }

    #[test]
    fn seed_length_bounds() {
        assert_eq!(Xprv::from_seed(&[0u8; 15]), Err(HDWError::InvalidSeedLength(15)));
        assert_eq!(Xprv::from_seed(&[0u8; 65]), Err(HDWError::InvalidSeedLength(65)));
        assert!(Xprv::from_seed(&[0u8; 64]).is_ok());
    }

    #[test]
    fn create_xkeys_from_str() {
        let ctx = Context::new();
        let xprv = Xprv::from_str(TEST_XPRV).unwrap();
        assert_eq!(xprv, master());
        assert_eq!(Xpub::from_str(TEST_XPUB).unwrap(), master().get_xpub(&ctx));

        assert!(Xprv::from_str("this is definitely not a extended private key").is_err());
        assert!(matches!(Xprv::from_str(TEST_XPUB), Err(HDWError::BadPrefix(_))));
        assert!(matches!(Xpub::from_str(TEST_XPRV), Err(HDWError::BadPrefix(_))));
        assert!(matches!(Xpub::from_str(&TEST_XPUB.replace('E', "F")), Err(HDWError::BadChecksum)));
        assert_eq!(Xpub::from_str(&TEST_XPUB.replacen('x', "0", 1)), Err(HDWError::BadChar('0')));
    }

    #[test]
    fn derive_from_path_tests() {
        let ctx = Context::new();
        let path: Path = "m/44'/0'/0'/0".parse().unwrap();
        let key = master().derive_from_path(&ctx, &path).unwrap();

        assert_eq!(key.serialize(&VersionPrefix::Xprv), "xprvA2RVpXN1QL4okLkV3NT6ADt7UcqauZdi6Tyv2wBscQ3kq9zvvfsxBBgQTcoj7GZCa7wkmmeLvQHdqVJEQ1D4PGoDgYV8CZj9w9jqGNbGCaT");
        assert_eq!(key.get_xpub(&ctx).serialize(&VersionPrefix::Xpub), "xpub6FQrE2tuEhd6xppx9Pz6XMpr2eg5K2MZTguWqKbVAjajhxL5UDCCiyztJtCFDrAqPoQfmbVeVX5BKXQ7vxgR42DtsVa3g2YMLZQjbEnxbqi");
        assert_eq!(master().derive_from_path(&ctx, &Path::empty()).unwrap(), master());
    }

    #[test]
    fn bip84_test_vectors() {
        let ctx = Context::new();
        let mnemonic = Mnemonic::from_phrase("abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about", Language::English).unwrap();
        let root = Xprv::from_mnemonic(&mnemonic, "").unwrap();

        //Account 0, root = m/84'/0'/0'
        let account = root.derive_from_path(&ctx, &"m/84'/0'/0'".parse().unwrap()).unwrap();
        assert_eq!(account.serialize(&VersionPrefix::Zprv), "zprvAdG4iTXWBoARxkkzNpNh8r6Qag3irQB8PzEMkAFeTRXxHpbF9z4QgEvBRmfvqWvGp42t42nvgGpNgYSJA9iefm1yYNZKEm7z6qUWCroSQnE");
        assert_eq!(account.get_xpub(&ctx).serialize(&VersionPrefix::Zpub), "zpub6rFR7y4Q2AijBEqTUquhVz398htDFrtymD9xYYfG1m4wAcvPhXNfE3EfH1r1ADqtfSdVCToUG868RvUUkgDKf31mGDtKsAYz2oz2AGutZYs");

        //Public derivation below the account matches private derivation
        let zpub = Xpub::from_str("zpub6rFR7y4Q2AijBEqTUquhVz398htDFrtymD9xYYfG1m4wAcvPhXNfE3EfH1r1ADqtfSdVCToUG868RvUUkgDKf31mGDtKsAYz2oz2AGutZYs").unwrap();
        let receive_path: Path = "m/0/1".parse().unwrap();
        assert_eq!(
            zpub.derive_from_path(&ctx, &receive_path).unwrap(),
            account.derive_from_path(&ctx, &receive_path).unwrap().get_xpub(&ctx)
        );
    }
}
