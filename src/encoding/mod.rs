/*
    Module that bundles together the various encoding schemes used in Bitcoin
*/

pub mod version_prefix;
pub mod base58;
pub mod bech32;

pub use version_prefix::VersionPrefix;
pub use base58::{Base58, Base58Error};
pub use self::bech32::{Bech32Err, Variant};
