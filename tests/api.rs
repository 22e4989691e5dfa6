use btc_wallet_sdk::{
    api::{self, *},
    address::AddressErr,
    bip39,
    ec::Context,
    key::{PrivKey, PubKey},
    network::Network,
    script::ScriptErr,
    transaction::TxErr,
    util::encode_02x,
    Error
};

const MNEMONIC: &str = "around dumb spend sample oil crane plug embrace outdoor panel rhythm salon";
const PRIVATE_KEY: &str = "60164bec9512d004af7f71e7ed868c8e9ac2cc6234d8b682037ec80547595f2e";
const PUBLIC_KEY: &str = "030e93482fd0037d589b08c36bb22afc041338ba444f9f9d7ba129348f9be731c1";

const MULTISIG_KEYS: [&str; 3] = [
    "026477115981fe981a6918a6297d9803c4dc04f328f22041bedff886bbc2962e01",
    "02c96db2302d19b43d4c69368babace7854cc84eb9e061cde51cfa77ca4a22b8b9",
    "03c6103b3b83e4a24a0e33a4df246ef11772f9992663db0c35759a5e2ebf68d8e9"
];

fn seed_hex() -> String {
    encode_02x(&bip39::seed_from_phrase(MNEMONIC, "")[..])
}

fn address_params(network: Network, method: &str) -> CreateAddressParams {
    CreateAddressParams {
        seed_hex: seed_hex(),
        receive_or_change: 0,
        address_index: 0,
        network,
        method: method.to_string()
    }
}

fn multisig_params(method: &str) -> CreateMultisigAddressParams {
    CreateMultisigAddressParams {
        pubkeys: MULTISIG_KEYS.iter().map(|k| k.to_string()).collect(),
        network: Network::Bitcoin,
        method: method.to_string(),
        threshold: 2
    }
}

#[test]
fn create_address_fixtures() {
    let ctx = Context::new();
    let cases = [
        (Network::Bitcoin, "p2pkh", "1H7AcqzvVQunYftUcJMxF9KUrFayEnf83T"),
        (Network::Testnet, "p2pkh", "mwd7uu5uJSM3KnN6KsLL54XoiFBg4JYX7o"),
        (Network::Bitcoin, "p2wpkh", "bc1qkzkgj7n4n72yhyjmpzs3a6uzy5kj3cmkad2dk7"),
        (Network::Testnet, "p2wpkh", "tb1qkzkgj7n4n72yhyjmpzs3a6uzy5kj3cmkht37dd"),
        (Network::Bitcoin, "p2sh", "35iXFVdZb5qxeqxgkZHBaS3KjaP89e79kP"),
        (Network::Testnet, "p2sh", "2MwGjKEZbCYMJrdbERgu4CP2awvbHyHgyqt")
    ];

    for (network, method, expected) in cases {
        let info = create_address(&ctx, &address_params(network, method)).unwrap();
        assert_eq!(info.address, expected, "{} {}", network, method);
        assert_eq!(info.private_key, PRIVATE_KEY);
        assert_eq!(info.public_key, PUBLIC_KEY);
    }
}

#[test]
fn create_address_from_json() {
    let ctx = Context::new();
    let json = format!(
        r#"{{"seedHex": "{}", "receiveOrChange": "0", "addressIndex": 0, "network": "mainnet", "method": "P2WPKH"}}"#,
        seed_hex()
    );
    let params: CreateAddressParams = serde_json::from_str(&json).unwrap();
    let info = create_address(&ctx, &params).unwrap();
    assert_eq!(info.address, "bc1qkzkgj7n4n72yhyjmpzs3a6uzy5kj3cmkad2dk7");

    let out = serde_json::to_value(&info).unwrap();
    assert_eq!(out["privateKey"], PRIVATE_KEY);
    assert_eq!(out["publicKey"], PUBLIC_KEY);
}

#[test]
fn derivation_is_deterministic() {
    let ctx = Context::new();
    let mut params = address_params(Network::Bitcoin, "p2wpkh");
    params.address_index = 7;
    let a = create_address(&ctx, &params).unwrap();
    let b = create_address(&ctx, &params).unwrap();
    assert_eq!(a, b);

    params.receive_or_change = 1;
    let change = create_address(&ctx, &params).unwrap();
    assert_ne!(a.address, change.address);
}

#[test]
fn unsupported_method() {
    let ctx = Context::new();
    let err = create_address(&ctx, &address_params(Network::Bitcoin, "p2tr")).unwrap_err();
    assert_eq!(err, Error::Address(AddressErr::UnsupportedMethod("p2tr".to_string())));
    assert_eq!(err.to_string(), "Method 'p2tr' is not supported.");
}

#[test]
fn schnorr_addresses() {
    let ctx = Context::new();
    let params = CreateSchnorrAddressParams {
        seed_hex: seed_hex(),
        receive_or_change: 0,
        address_index: 0,
        network: Network::Bitcoin
    };

    let bip44 = create_schnorr_address(&ctx, &params).unwrap();
    assert_eq!(bip44.address, "bc1p84qnytcfe8ga0jq5qe4huv2w9k7udl3qtq95x3fpammndc5hlweqch4vt6");
    assert_eq!(bip44.private_key, PRIVATE_KEY);
    assert_eq!(bip44.public_key, PUBLIC_KEY);

    let bip86 = create_schnorr_address_taproot(&ctx, &params).unwrap();
    assert_eq!(bip86.address, "bc1pprlal9nlfnwurget6pzphvclt3gt7rm77qxfgja6s0k7pavau3nscymnhl");
    assert_eq!(bip86.public_key, "02f028954c26c689e4d452dcbbd8ed41cdaf494d172dc6ff7761349c6d44738494");

    let testnet = create_schnorr_address_taproot(&ctx, &CreateSchnorrAddressParams { network: Network::Testnet, ..params }).unwrap();
    assert!(testnet.address.starts_with("tb1p"));
    assert_eq!(testnet.private_key, bip86.private_key);
}

#[test]
fn multisig_fixtures() {
    let cases = [
        ("p2pkh", "36NUkt6FWUi3LAWBqWRdDmdTWbt91Yvfu7"),
        ("p2wpkh", "bc1qj67d3x5sv3cqdnfje67f9kdlavv7fv6xreznweymj3nqj493pulqz8e6gj"),
        ("p2sh", "3PLy7raPcJCaK4sJyMhWenbzFSZ3YTqo86")
    ];

    for (method, expected) in cases {
        let address = create_multisig_address(&multisig_params(method));
        assert_eq!(address, MultisigAddress::Address(expected.to_string()));
        assert_eq!(try_create_multisig_address(&multisig_params(method)).unwrap(), expected);
    }
}

#[test]
fn multisig_sentinel() {
    let unsupported = create_multisig_address(&multisig_params("p2tr"));
    assert!(unsupported.is_failure());
    assert_eq!(unsupported.to_string(), api::MULTISIG_FAILURE);

    for method in ["p2pkh", "p2wpkh", "p2sh"] {
        let mut too_high = multisig_params(method);
        too_high.threshold = 4;
        assert!(create_multisig_address(&too_high).is_failure(), "{}", method);
        assert!(try_create_multisig_address(&too_high).is_err(), "{}", method);
    }

    let mut bad_key = multisig_params("p2wpkh");
    bad_key.pubkeys[1] = "02zz".to_string();
    assert_eq!(create_multisig_address(&bad_key).to_string(), "0x00");

    let mut empty = multisig_params("p2pkh");
    empty.pubkeys.clear();
    assert!(create_multisig_address(&empty).is_failure());
}

#[test]
fn multisig_uncompressed_keys() {
    let long = PubKey::from_hex(MULTISIG_KEYS[0]).unwrap().decompressed_hex();

    let mut legacy = multisig_params("p2pkh");
    legacy.pubkeys[0] = long.clone();
    assert_eq!(
        create_multisig_address(&legacy),
        MultisigAddress::Address("3GfSDXizDbvXeTbeh6QppRjdLK34H7bSsc".to_string())
    );

    for method in ["p2wpkh", "p2sh"] {
        let mut params = multisig_params(method);
        params.pubkeys[0] = long.clone();
        assert!(create_multisig_address(&params).is_failure(), "{}", method);
        assert!(matches!(
            try_create_multisig_address(&params),
            Err(Error::Address(AddressErr::Script(ScriptErr::UncompressedKey)))
        ));
    }
}

#[test]
fn sign_p2wpkh_transaction() {
    let ctx = Context::new();
    let from = create_address(&ctx, &address_params(Network::Bitcoin, "p2wpkh")).unwrap();
    let params = BuildAndSignTxParams {
        private_key: from.private_key.clone(),
        sign_obj: SignObj {
            inputs: vec![TxInputParams {
                address: from.address.clone(),
                txid: "ab".repeat(32),
                vout: 1,
                amount: 100_000
            }],
            outputs: vec![
                TxOutputParams { address: "1H7AcqzvVQunYftUcJMxF9KUrFayEnf83T".to_string(), amount: 60_000 },
                TxOutputParams { address: from.address.clone(), amount: 39_000 }
            ]
        },
        network: Network::Bitcoin
    };

    let hex = build_and_sign_tx(&ctx, &params).unwrap();
    //version 2, segwit marker and flag, one input
    assert!(hex.starts_with("02000000000101"));
    //locktime
    assert!(hex.ends_with("00000000"));

    //same key as WIF
    let key: PrivKey = PRIVATE_KEY.parse().unwrap();
    let wif = BuildAndSignTxParams { private_key: key.export_as_wif(true, Network::Bitcoin), ..params.clone() };
    assert_eq!(build_and_sign_tx(&ctx, &wif).unwrap(), hex);
}

#[test]
fn transaction_request_errors() {
    let ctx = Context::new();
    let from = create_address(&ctx, &address_params(Network::Bitcoin, "p2pkh")).unwrap();
    let input = TxInputParams {
        address: from.address.clone(),
        txid: "11".repeat(32),
        vout: 0,
        amount: 1_000
    };
    let base = BuildAndSignTxParams {
        private_key: from.private_key.clone(),
        sign_obj: SignObj {
            inputs: vec![input.clone()],
            outputs: vec![TxOutputParams { address: from.address.clone(), amount: 2_000 }]
        },
        network: Network::Bitcoin
    };

    assert_eq!(
        build_and_sign_tx(&ctx, &base),
        Err(Error::Transaction(TxErr::InsufficientFunds { inputs: 1_000, outputs: 2_000 }))
    );

    let testnet_output = BuildAndSignTxParams {
        sign_obj: SignObj {
            inputs: vec![input.clone()],
            outputs: vec![TxOutputParams { address: "mwd7uu5uJSM3KnN6KsLL54XoiFBg4JYX7o".to_string(), amount: 500 }]
        },
        ..base.clone()
    };
    assert!(matches!(
        build_and_sign_tx(&ctx, &testnet_output),
        Err(Error::Address(AddressErr::WrongNetwork { .. }))
    ));

    //p2pkh input passed to the taproot signer
    let taproot = TaprootSignParams {
        sign_obj: SignObj {
            inputs: vec![input],
            outputs: vec![TxOutputParams { address: from.address.clone(), amount: 500 }]
        },
        ..base
    };
    assert_eq!(
        sign_btc_taproot_transaction(&ctx, &taproot),
        Err(Error::Transaction(TxErr::UnsupportedInput(0)))
    );
}

#[test]
fn sign_taproot_transaction() {
    let ctx = Context::new();
    let from = create_schnorr_address_taproot(&ctx, &CreateSchnorrAddressParams {
        seed_hex: seed_hex(),
        receive_or_change: 0,
        address_index: 0,
        network: Network::Bitcoin
    }).unwrap();

    let params = TaprootSignParams {
        private_key: from.private_key.clone(),
        sign_obj: SignObj {
            inputs: vec![TxInputParams { address: from.address.clone(), txid: "22".repeat(32), vout: 0, amount: 50_000 }],
            outputs: vec![TxOutputParams { address: from.address.clone(), amount: 49_000 }]
        },
        network: Network::Bitcoin
    };

    let hex = sign_btc_taproot_transaction(&ctx, &params).unwrap();
    assert!(hex.starts_with("02000000000101"));
    //BIP340 signing without aux rand is deterministic
    assert_eq!(sign_btc_taproot_transaction(&ctx, &params).unwrap(), hex);

    //the witness is a single 64 byte signature followed by the locktime
    let witness_start = hex.len() - 8 - 128 - 4;
    assert_eq!(&hex[witness_start..witness_start + 4], "0140");

    //a key that does not own the input
    let other = TaprootSignParams { private_key: "01".repeat(32), ..params };
    assert!(matches!(
        sign_btc_taproot_transaction(&ctx, &other),
        Err(Error::Transaction(TxErr::ScriptMismatch(0)))
    ));
}

#[test]
fn mnemonic_operations() {
    let phrase = create_mnemonic(24, "english").unwrap();
    assert_eq!(phrase.split_whitespace().count(), 24);
    assert!(validate_mnemonic(&phrase, "english").unwrap());

    let entropy = mnemonic_to_entropy(MNEMONIC, "english").unwrap();
    assert_eq!(entropy.len(), 32);
    assert_eq!(entropy_to_mnemonic(&entropy, "english").unwrap(), MNEMONIC);

    assert_eq!(mnemonic_to_seed_sync(MNEMONIC, ""), seed_hex());
    assert!(!validate_mnemonic("around dumb spend sample oil crane plug embrace outdoor panel rhythm salons", "english").unwrap());
}

#[tokio::test]
async fn async_seed_matches_sync() {
    let seed = mnemonic_to_seed(MNEMONIC, "TREZOR").await.unwrap();
    assert_eq!(seed, mnemonic_to_seed_sync(MNEMONIC, "TREZOR"));
}
