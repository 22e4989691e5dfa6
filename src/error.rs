/*
    Crate level error type.

    Every module error converts into Error with ?, so the public operations
    return a single Result type.
*/
use thiserror::Error;

use crate::{
    address::AddressErr,
    bip39::MnemonicErr,
    ec::EcError,
    encoding::{Base58Error, Bech32Err},
    hdwallet::HDWError,
    key::KeyErr,
    network::UnknownNetwork,
    script::ScriptErr,
    taproot::TaprootErr,
    transaction::TxErr
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Ec(#[from] EcError),
    #[error(transparent)]
    Key(#[from] KeyErr),
    #[error(transparent)]
    HDWallet(#[from] HDWError),
    #[error(transparent)]
    Mnemonic(#[from] MnemonicErr),
    #[error(transparent)]
    Base58(#[from] Base58Error),
    #[error(transparent)]
    Bech32(#[from] Bech32Err),
    #[error(transparent)]
    Script(#[from] ScriptErr),
    #[error(transparent)]
    Address(#[from] AddressErr),
    #[error(transparent)]
    Taproot(#[from] TaprootErr),
    #[error(transparent)]
    Transaction(#[from] TxErr),
    #[error(transparent)]
    Network(#[from] UnknownNetwork),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("receive or change must be 0 or 1, got {0}")]
    InvalidChange(u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_method(s: &str) -> Result<crate::address::Method> {
        Ok(s.parse()?)
    }

    #[test]
    fn module_errors_convert() {
        assert_eq!(
            parse_method("p2tr"),
            Err(Error::Address(AddressErr::UnsupportedMethod("p2tr".to_string())))
        );
        let err: Error = ScriptErr::InvalidThreshold { threshold: 3, keys: 2 }.into();
        assert_eq!(err.to_string(), "threshold 3 is invalid for 2 keys");
    }
}
