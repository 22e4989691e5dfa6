/*
    This module contains the default imports for the library.

    Import the library using:
        use btc_wallet_sdk::prelude::*;
    to quickly import the essential parts of the library.
*/

pub use crate::{

    api::{
        AddressInfo,
        MultisigAddress,
        CreateAddressParams,
        CreateSchnorrAddressParams,
        CreateMultisigAddressParams,
        BuildAndSignTxParams,
        SignObj,
        TxInputParams,
        TxOutputParams
    },

    key::{
        PubKey,
        PrivKey,
        SchnorrPublicKey
    },

    address::{
        Address,
        Method
    },

    bip39::{
        MnemonicErr,
        Language,
        Mnemonic,
        PhraseLength
    },

    hdwallet::{
        ChildOptions,
        ExtendedKey,
        Xprv, Xpub,
        HDWError,
        Path
    },

    script::Script,

    transaction::{
        OutPoint,
        TxOut,
        TxInput,
        Transaction,
        SignedTx
    },

    ec::Context,
    network::Network,

    util::{
        encode_02x,
        decode_02x
    },

    error::{Error, Result}

};
