/*
    This module implements hierarchical deterministic key derivation
    under the BIP 32 standard.

    A 16 to 64 byte seed produces a master extended private key. Children
    are derived one index at a time and a path applies that derivation in order.

    Reference:
        https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki
*/

pub mod ckd;
pub mod extended_keys;
pub mod path;

use thiserror::Error;

pub use ckd::{derive_xprv, derive_xpub, ChildOptions, HARDENED_OFFSET};
pub use extended_keys::{ExtendedKey, Xprv, Xpub};
pub use path::Path;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HDWError {
    #[error("seed must be 16 to 64 bytes, got {0}")]
    InvalidSeedLength(usize),
    #[error("seed produced an invalid master key")]
    InvalidMasterKey,
    #[error("child {0} is invalid, derive the next index instead")]
    InvalidDerivation(u32),
    #[error("hardened child {0} cannot be derived from a public key")]
    HardenedFromPublic(u32),
    #[error("index {0} does not fit below 2^31")]
    IndexTooLarge(u32),
    #[error("bad derivation path '{0}'")]
    BadPath(String),
    #[error("malformed extended key")]
    BadKey,
    #[error("invalid base58 character '{0}'")]
    BadChar(char),
    #[error("extended key checksum mismatch")]
    BadChecksum,
    #[error("unknown extended key version {0:02x?}")]
    BadPrefix(Vec<u8>),
    #[error("derivation depth exceeds 255")]
    MaxDepthExceeded
}
