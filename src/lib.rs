/*
    Library to create keys, addresses and signed transactions for Bitcoin.

    Keys are derived from BIP39 mnemonics through BIP32 paths and encoded as
    P2PKH, P2SH-P2WPKH, P2WPKH, P2TR and multisig addresses. Transactions
    spending P2PKH, P2SH-P2WPKH, P2WPKH and P2TR key path outputs can be built
    and signed with a single key.

    The api module holds the JSON friendly operations, the remaining modules
    expose the building blocks.

    References:
        - The Bitcoin Book (https://github.com/bitcoinbook/bitcoinbook/)
            most of the general concepts come from here

        - learn me a bitcoin (https://learnmeabitcoin.com/)
            for great visualisation of the concepts introduced in the book

        - The Rust-Bitcoin repository (https://github.com/rust-bitcoin/rust-bitcoin)
            for providing clear reference code to work against, especially with bip32 and sighashes.
*/

//Outward facing modules
pub mod api;
pub mod key;
pub mod address;
pub mod bip39;
pub mod hdwallet;
pub mod script;
pub mod taproot;
pub mod transaction;
pub mod network;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod prelude;

//Modules for internal use
pub mod ec;
pub mod util;
mod hash;
mod entropy;

pub use error::{Error, Result};
