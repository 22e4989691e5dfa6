/*
    Cross checks against rust-bitcoin.

    Transactions are built and signed here, parsed back with the bitcoin crate and
    their txids, sighashes and signatures compared against its implementation.
*/

use std::str::FromStr;

use bitcoin::{
    consensus,
    hashes::Hash,
    secp256k1::{ecdsa, schnorr, Message, PublicKey, Secp256k1, XOnlyPublicKey},
    sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType as OracleTapSighashType},
    Amount, ScriptBuf
};
use btc_wallet_sdk::{
    address::Address,
    ec::Context,
    key::PrivKey,
    network::Network,
    script::Script,
    transaction::{
        build_and_sign, legacy_sighash, segwit_v0_sighash, taproot_key_spend_sighash,
        OutPoint, SignedTx, TapSighashType, TxInput, TxOut
    }
};

const KEY: &str = "60164bec9512d004af7f71e7ed868c8e9ac2cc6234d8b682037ec80547595f2e";

fn oracle_script(script: &Script) -> ScriptBuf {
    ScriptBuf::from_bytes(script.as_bytes().to_vec())
}

fn oracle_txout(out: &TxOut) -> bitcoin::TxOut {
    bitcoin::TxOut { value: Amount::from_sat(out.value), script_pubkey: oracle_script(&out.script_pubkey) }
}

fn parse(signed: &SignedTx) -> bitcoin::Transaction {
    let bytes = hex::decode(signed.hex()).unwrap();
    consensus::deserialize(&bytes).unwrap()
}

struct Fixture {
    ctx: Context,
    key: PrivKey,
    p2pkh: Address,
    p2sh_p2wpkh: Address,
    p2wpkh: Address,
    p2tr: Address
}

impl Fixture {
    fn new() -> Self {
        let ctx = Context::new();
        let key = PrivKey::from_hex(KEY).unwrap();
        let pk = key.public_key(&ctx);
        let p2tr = Address::p2tr_from_internal(&ctx, &pk.x_only(), None, Network::Bitcoin).unwrap();

        Self {
            p2pkh: Address::p2pkh(&pk, Network::Bitcoin),
            p2sh_p2wpkh: Address::p2sh_p2wpkh(&pk, Network::Bitcoin),
            p2wpkh: Address::p2wpkh(&pk, Network::Bitcoin),
            p2tr,
            ctx,
            key
        }
    }

    fn input(&self, address: &Address, seed: u8, amount: u64) -> TxInput {
        TxInput {
            outpoint: OutPoint::new([seed; 32], seed as u32),
            prevout: TxOut::new(amount, address.script_pubkey())
        }
    }

    fn outputs(&self) -> Vec<TxOut> {
        vec![
            TxOut::new(70_000, self.p2wpkh.script_pubkey()),
            TxOut::new(25_000, self.p2tr.script_pubkey())
        ]
    }
}

#[test]
fn addresses_match_oracle() {
    let f = Fixture::new();
    for address in [f.p2pkh, f.p2sh_p2wpkh, f.p2wpkh, f.p2tr] {
        let oracle = bitcoin::Address::from_str(&address.to_string())
            .unwrap()
            .require_network(bitcoin::Network::Bitcoin)
            .unwrap();
        assert_eq!(oracle.script_pubkey(), oracle_script(&address.script_pubkey()));
        assert_eq!(oracle.to_string(), address.to_string());
    }
}

#[test]
fn legacy_input() {
    let f = Fixture::new();
    let input = f.input(&f.p2pkh, 1, 100_000);
    let signed = build_and_sign(&f.ctx, vec![input.clone()], f.outputs(), &f.key).unwrap();
    let tx = parse(&signed);

    assert_eq!(tx.compute_txid().to_string(), signed.txid_hex());
    assert!(tx.input[0].witness.is_empty());
    assert_eq!(consensus::serialize(&tx), hex::decode(signed.hex()).unwrap());

    let ours = legacy_sighash(signed.transaction(), 0, &input.prevout.script_pubkey).unwrap();
    let oracle = SighashCache::new(&tx)
        .legacy_signature_hash(0, &oracle_script(&input.prevout.script_pubkey), EcdsaSighashType::All.to_u32())
        .unwrap();
    assert_eq!(ours, oracle.to_byte_array());

    //scriptSig is <sig+hashtype> <pubkey>
    let pushes: Vec<Vec<u8>> = tx.input[0].script_sig
        .instructions()
        .map(|i| i.unwrap().push_bytes().unwrap().as_bytes().to_vec())
        .collect();
    assert_eq!(pushes.len(), 2);
    let (der, hash_type) = pushes[0].split_at(pushes[0].len() - 1);
    assert_eq!(hash_type, [0x01]);

    let secp = Secp256k1::verification_only();
    let sig = ecdsa::Signature::from_der(der).unwrap();
    let pk = PublicKey::from_slice(&pushes[1]).unwrap();
    secp.verify_ecdsa(&Message::from_digest(ours), &sig, &pk).unwrap();
}

#[test]
fn segwit_inputs() {
    let f = Fixture::new();
    let inputs = vec![
        f.input(&f.p2wpkh, 2, 60_000),
        f.input(&f.p2sh_p2wpkh, 3, 40_000)
    ];
    let signed = build_and_sign(&f.ctx, inputs.clone(), f.outputs(), &f.key).unwrap();
    let tx = parse(&signed);
    assert_eq!(tx.compute_txid().to_string(), signed.txid_hex());

    let pk = f.key.public_key(&f.ctx);
    let p2wpkh_script = Script::p2wpkh(&pk);
    let script_code = Script::p2pkh(&pk);
    let secp = Secp256k1::verification_only();
    let mut cache = SighashCache::new(&tx);

    for (index, input) in inputs.iter().enumerate() {
        let ours = segwit_v0_sighash(signed.transaction(), index, &script_code, input.prevout.value).unwrap();
        let oracle = cache
            .p2wpkh_signature_hash(index, &oracle_script(&p2wpkh_script), Amount::from_sat(input.prevout.value), EcdsaSighashType::All)
            .unwrap();
        assert_eq!(ours, oracle.to_byte_array());

        let witness: Vec<&[u8]> = tx.input[index].witness.iter().collect();
        assert_eq!(witness.len(), 2);
        assert_eq!(witness[1], &pk.as_bytes()[..]);
        let (der, hash_type) = witness[0].split_at(witness[0].len() - 1);
        assert_eq!(hash_type, [0x01]);
        let sig = ecdsa::Signature::from_der(der).unwrap();
        secp.verify_ecdsa(&Message::from_digest(ours), &sig, &PublicKey::from_slice(witness[1]).unwrap()).unwrap();
    }

    //native segwit has an empty scriptSig, the nested one pushes its redeem script
    assert!(tx.input[0].script_sig.is_empty());
    let mut redeem_push = vec![0x16];
    redeem_push.extend_from_slice(p2wpkh_script.as_bytes());
    assert_eq!(tx.input[1].script_sig.as_bytes(), &redeem_push[..]);
}

#[test]
fn taproot_key_path_inputs() {
    let f = Fixture::new();
    let inputs = vec![
        f.input(&f.p2tr, 4, 50_000),
        f.input(&f.p2tr, 5, 50_000)
    ];
    let prevouts: Vec<TxOut> = inputs.iter().map(|i| i.prevout.clone()).collect();
    let signed = build_and_sign(&f.ctx, inputs, f.outputs(), &f.key).unwrap();
    let tx = parse(&signed);
    assert_eq!(tx.compute_txid().to_string(), signed.txid_hex());

    let oracle_prevouts: Vec<bitcoin::TxOut> = prevouts.iter().map(oracle_txout).collect();
    let output_key = XOnlyPublicKey::from_slice(&f.p2tr.script_pubkey().as_bytes()[2..]).unwrap();
    let secp = Secp256k1::verification_only();
    let mut cache = SighashCache::new(&tx);

    for index in 0..2 {
        let ours = taproot_key_spend_sighash(signed.transaction(), index, &prevouts, TapSighashType::Default).unwrap();
        let oracle = cache
            .taproot_key_spend_signature_hash(index, &Prevouts::All(&oracle_prevouts[..]), OracleTapSighashType::Default)
            .unwrap();
        assert_eq!(ours, oracle.to_byte_array());

        let all = taproot_key_spend_sighash(signed.transaction(), index, &prevouts, TapSighashType::All).unwrap();
        let oracle_all = cache
            .taproot_key_spend_signature_hash(index, &Prevouts::All(&oracle_prevouts[..]), OracleTapSighashType::All)
            .unwrap();
        assert_eq!(all, oracle_all.to_byte_array());

        let witness: Vec<&[u8]> = tx.input[index].witness.iter().collect();
        assert_eq!(witness.len(), 1);
        assert_eq!(witness[0].len(), 64);
        let sig = schnorr::Signature::from_slice(witness[0]).unwrap();
        secp.verify_schnorr(&sig, &Message::from_digest(ours), &output_key).unwrap();
    }
}

#[test]
fn mixed_inputs() {
    let f = Fixture::new();
    let inputs = vec![
        f.input(&f.p2pkh, 6, 30_000),
        f.input(&f.p2tr, 7, 30_000),
        f.input(&f.p2wpkh, 8, 30_000),
        f.input(&f.p2sh_p2wpkh, 9, 30_000)
    ];
    let outputs = vec![TxOut::new(115_000, f.p2pkh.script_pubkey())];
    let signed = build_and_sign(&f.ctx, inputs.clone(), outputs, &f.key).unwrap();
    let tx = parse(&signed);

    assert_eq!(tx.compute_txid().to_string(), signed.txid_hex());
    assert_eq!(tx.version, bitcoin::transaction::Version::TWO);
    assert_eq!(tx.lock_time, bitcoin::absolute::LockTime::ZERO);
    for (ours, theirs) in inputs.iter().zip(tx.input.iter()) {
        assert_eq!(theirs.previous_output.vout, ours.outpoint.vout);
        assert_eq!(theirs.previous_output.txid.to_byte_array(), ours.outpoint.txid);
        assert_eq!(theirs.sequence, bitcoin::Sequence::MAX);
    }
    assert!(tx.input[0].witness.is_empty());
    assert_eq!(tx.input[1].witness.len(), 1);
    assert_eq!(tx.input[2].witness.len(), 2);
    assert_eq!(tx.input[3].witness.len(), 2);
}
