/*
    This module implements child key derivation
    from parent extended private and public keys
    under the BIP32 standard.

    Derivation never skips an invalid child. The error is returned and the
    caller decides whether to move on to the next index.
*/

use crate::{
    ec::Context,
    hash::{hash160, hmac_sha512},
    hdwallet::{
        ExtendedKey, HDWError, Xprv, Xpub
    }
};

pub const HARDENED_OFFSET: u32 = 1 << 31;

/**
    Enum to pattern match child key derivation options.
    The wrapped number is the index without the hardened bit.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOptions {
    Normal(u32),
    Hardened(u32)
}

impl ChildOptions {
    /// Full 32 bit index with the hardened bit set where needed
    pub fn index(&self) -> Result<u32, HDWError> {
        match *self {
            ChildOptions::Normal(x) | ChildOptions::Hardened(x) if x >= HARDENED_OFFSET => {
                Err(HDWError::IndexTooLarge(x))
            },
            ChildOptions::Normal(x) => Ok(x),
            ChildOptions::Hardened(x) => Ok(x | HARDENED_OFFSET)
        }
    }

    pub fn from_index(index: u32) -> Self {
        if index >= HARDENED_OFFSET {
            ChildOptions::Hardened(index - HARDENED_OFFSET)
        } else {
            ChildOptions::Normal(index)
        }
    }

    pub fn is_hardened(&self) -> bool {
        matches!(self, ChildOptions::Hardened(_))
    }
}

//Splits HMAC-SHA512(key = chaincode, data) into the tweak and child chaincode
fn split_hmac(data: &[u8], chaincode: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
    let hash: [u8; 64] = hmac_sha512(data, chaincode);
    let mut tweak = [0u8; 32];
    let mut child_chaincode = [0u8; 32];
    tweak.copy_from_slice(&hash[0..32]);
    child_chaincode.copy_from_slice(&hash[32..64]);
    (tweak, child_chaincode)
}

/**
    Derives a child xprv from a parent xprv.
*/
pub fn derive_xprv(ctx: &Context, parent: &Xprv, options: ChildOptions) -> Result<Xprv, HDWError> {
    let index = options.index()?;
    let depth = parent.depth.checked_add(1).ok_or(HDWError::MaxDepthExceeded)?;

    //Hardened: 0x00 || parent private key || index
    //Normal: parent compressed public key || index
    let mut data: Vec<u8> = Vec::with_capacity(37);
    if options.is_hardened() {
        data.push(0x00);
        data.extend_from_slice(&parent.get_prv().as_bytes());
    } else {
        data.extend_from_slice(&parent.get_pub(ctx).as_bytes());
    }
    data.extend_from_slice(&index.to_be_bytes());

    let (tweak, chaincode) = split_hmac(&data, &parent.chaincode());

    //Tweak >= n or a zero sum both make this index unusable
    let key = parent.get_prv().add_tweak(&tweak).map_err(|_| HDWError::InvalidDerivation(index))?;

    Ok(Xprv::construct(key, chaincode, depth, parent.fingerprint(ctx), index))
}

/**
    Derives a child xpub from a parent xpub.
    Only normal children can be derived without the private key.
*/
pub fn derive_xpub(ctx: &Context, parent: &Xpub, options: ChildOptions) -> Result<Xpub, HDWError> {
    let index = options.index()?;
    if options.is_hardened() {
        return Err(HDWError::HardenedFromPublic(index))
    }
    let depth = parent.depth.checked_add(1).ok_or(HDWError::MaxDepthExceeded)?;

    let mut data: Vec<u8> = parent.get_pub(ctx).as_bytes().to_vec();
    data.extend_from_slice(&index.to_be_bytes());

    let (tweak, chaincode) = split_hmac(&data, &parent.chaincode());

    //point(tweak) + parent key
    let point = ctx
        .tweak_add_point(parent.get_pub(ctx).point(), &tweak)
        .map_err(|_| HDWError::InvalidDerivation(index))?;

    Ok(Xpub::construct(point.into(), chaincode, depth, parent.fingerprint(ctx), index))
}

/// Fingerprint of a compressed public key. First 4 bytes of its HASH160.
pub fn fingerprint(pubkey: &[u8; 33]) -> [u8; 4] {
    let hash = hash160(pubkey);
    let mut fp = [0u8; 4];
    fp.copy_from_slice(&hash[0..4]);
    fp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::VersionPrefix;

    //BIP32 test vector 1
    const SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn master() -> Xprv {
        Xprv::from_seed(&hex::decode(SEED).unwrap()).unwrap()
    }

    #[test]
    fn hardened_child() {
        let ctx = Context::new();
        let child = derive_xprv(&ctx, &master(), ChildOptions::Hardened(0)).unwrap();
        assert_eq!(
            child.serialize(&VersionPrefix::Xprv),
            "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7"
        );
        assert_eq!(
            child.get_xpub(&ctx).serialize(&VersionPrefix::Xpub),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );
        assert_eq!(child.index, HARDENED_OFFSET);
        assert_eq!(child.depth, 1);
    }

    #[test]
    fn public_derivation_matches_private() {
        let ctx = Context::new();
        let parent = derive_xprv(&ctx, &master(), ChildOptions::Hardened(0)).unwrap();

        let from_private = derive_xprv(&ctx, &parent, ChildOptions::Normal(1)).unwrap().get_xpub(&ctx);
        let from_public = derive_xpub(&ctx, &parent.get_xpub(&ctx), ChildOptions::Normal(1)).unwrap();
        assert_eq!(from_private, from_public);
        assert_eq!(
            from_public.serialize(&VersionPrefix::Xpub),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
    }

    #[test]
    fn hardened_from_public_fails() {
        let ctx = Context::new();
        let xpub = master().get_xpub(&ctx);
        assert_eq!(
            derive_xpub(&ctx, &xpub, ChildOptions::Hardened(5)),
            Err(HDWError::HardenedFromPublic(HARDENED_OFFSET + 5))
        );
    }

    #[test]
    fn index_bounds() {
        let ctx = Context::new();
        assert_eq!(ChildOptions::Normal(HARDENED_OFFSET).index(), Err(HDWError::IndexTooLarge(HARDENED_OFFSET)));
        assert_eq!(
            derive_xprv(&ctx, &master(), ChildOptions::Hardened(u32::MAX)),
            Err(HDWError::IndexTooLarge(u32::MAX))
        );
        assert_eq!(ChildOptions::from_index(HARDENED_OFFSET + 44), ChildOptions::Hardened(44));
        assert_eq!(ChildOptions::from_index(7), ChildOptions::Normal(7));
    }

    #[test]
    fn depth_overflow() {
        let ctx = Context::new();
        let mut key = master();
        key.depth = 255;
        assert_eq!(derive_xprv(&ctx, &key, ChildOptions::Normal(0)), Err(HDWError::MaxDepthExceeded));
    }
}
