/*
    Input signing and transaction finalization.

    ECDSA nonces are deterministic (RFC6979) and signatures are low S, DER
    encoded with the SIGHASH_ALL byte appended. Taproot key path signatures
    are 64 byte BIP340 signatures under SIGHASH_DEFAULT.
*/

use std::fmt;

use secp256k1::{ecdsa, schnorr, Message, XOnlyPublicKey};

use crate::{
    ec::Context,
    key::{PrivKey, PubKey},
    script::{Script, ScriptBuilder},
    taproot,
    transaction::{
        build_transaction,
        sighash::{legacy_sighash, segwit_v0_sighash, taproot_key_spend_sighash, TapSighashType},
        SpendKind, Transaction, TxErr, TxInput, TxOut, UnsignedTx, SIGHASH_ALL
    }
};

/// Signature produced for a single input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSignature {
    Ecdsa {
        signature: ecdsa::Signature,
        pubkey: PubKey
    },
    Schnorr(schnorr::Signature)
}

/// A fully signed transaction. Immutable once finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx(Transaction);

impl SignedTx {
    pub fn transaction(&self) -> &Transaction {
        &self.0
    }

    pub fn into_inner(self) -> Transaction {
        self.0
    }

    pub fn hex(&self) -> String {
        self.0.hex()
    }

    pub fn txid_hex(&self) -> String {
        self.0.txid_hex()
    }
}

impl fmt::Display for SignedTx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn spend_kind(unsigned: &UnsignedTx, index: usize) -> Result<SpendKind, TxErr> {
    unsigned.kinds.get(index).copied().ok_or(TxErr::InputIndex(index))
}

//True if the public key is the one committed to by the spent script
fn commits_to(kind: &SpendKind, pk: &PubKey) -> bool {
    match kind {
        SpendKind::P2pkh(h) | SpendKind::P2wpkh(h) => pk.hash160() == *h,
        SpendKind::P2shP2wpkh(h) => Script::p2wpkh(pk).hash() == *h,
        SpendKind::P2trKeyPath(_) => false
    }
}

fn ecdsa_digest(unsigned: &UnsignedTx, index: usize, kind: &SpendKind, pk: &PubKey) -> Result<[u8; 32], TxErr> {
    let prevout = unsigned.prevouts.get(index).ok_or(TxErr::InputIndex(index))?;
    match kind {
        SpendKind::P2pkh(_) => legacy_sighash(&unsigned.tx, index, &prevout.script_pubkey),
        //BIP143 script code of a key hash program is its P2PKH script
        _ => segwit_v0_sighash(&unsigned.tx, index, &Script::p2pkh(pk), prevout.value)
    }
}

fn taproot_digest(unsigned: &UnsignedTx, index: usize) -> Result<[u8; 32], TxErr> {
    taproot_key_spend_sighash(&unsigned.tx, index, &unsigned.prevouts, TapSighashType::Default)
}

/**
    Signs one input with the given key.
    Fails with ScriptMismatch if the key is not the one the spent output pays to.
*/
pub fn sign_input(ctx: &Context, unsigned: &UnsignedTx, index: usize, key: &PrivKey) -> Result<InputSignature, TxErr> {
    let kind = spend_kind(unsigned, index)?;

    if let SpendKind::P2trKeyPath(output_key) = kind {
        let keypair = taproot::tweak_keypair(ctx, key, None)?;
        if keypair.x_only_public_key().0.serialize() != output_key {
            return Err(TxErr::ScriptMismatch(index))
        }

        let msg = Message::from_digest(taproot_digest(unsigned, index)?);
        return Ok(InputSignature::Schnorr(ctx.secp().sign_schnorr_no_aux_rand(&msg, &keypair)))
    }

    let pubkey = key.public_key(ctx);
    if !commits_to(&kind, &pubkey) { return Err(TxErr::ScriptMismatch(index)) }

    let msg = Message::from_digest(ecdsa_digest(unsigned, index, &kind, &pubkey)?);
    Ok(InputSignature::Ecdsa {
        signature: ctx.secp().sign_ecdsa(&msg, key.secret_key()),
        pubkey
    })
}

//DER signature with the sighash type appended
fn ecdsa_push(signature: &ecdsa::Signature) -> Vec<u8> {
    let mut v = signature.serialize_der().to_vec();
    v.push(SIGHASH_ALL as u8);
    v
}

/**
    Checks every signature against the output it spends and assembles the
    scriptSigs and witnesses.

    Fails with MissingSignature for an input with no signature and with
    ScriptMismatch when a signature does not validate against its spent script.
*/
pub fn finalize(ctx: &Context, unsigned: UnsignedTx, signatures: Vec<Option<InputSignature>>) -> Result<SignedTx, TxErr> {
    let expected = unsigned.tx.inputs.len();
    if signatures.len() != expected {
        return Err(TxErr::SignatureCount { expected, got: signatures.len() })
    }

    let mut tx = unsigned.tx.clone();
    for (index, signature) in signatures.into_iter().enumerate() {
        let signature = signature.ok_or(TxErr::MissingSignature(index))?;
        let kind = spend_kind(&unsigned, index)?;
        let input = &mut tx.inputs[index];

        match (kind, signature) {
            (SpendKind::P2trKeyPath(output_key), InputSignature::Schnorr(sig)) => {
                let key = XOnlyPublicKey::from_slice(&output_key).map_err(|_| TxErr::ScriptMismatch(index))?;
                let msg = Message::from_digest(taproot_digest(&unsigned, index)?);
                ctx.secp().verify_schnorr(&sig, &msg, &key).map_err(|_| TxErr::ScriptMismatch(index))?;

                input.witness = vec![sig.as_ref().to_vec()];
            },
            (SpendKind::P2trKeyPath(_), _) | (_, InputSignature::Schnorr(_)) => return Err(TxErr::ScriptMismatch(index)),
            (kind, InputSignature::Ecdsa { signature, pubkey }) => {
                if !commits_to(&kind, &pubkey) { return Err(TxErr::ScriptMismatch(index)) }
                let msg = Message::from_digest(ecdsa_digest(&unsigned, index, &kind, &pubkey)?);
                ctx.secp().verify_ecdsa(&msg, &signature, pubkey.point()).map_err(|_| TxErr::ScriptMismatch(index))?;

                let sig = ecdsa_push(&signature);
                match kind {
                    SpendKind::P2pkh(_) => {
                        input.script_sig = ScriptBuilder::new()
                            .push_data(&sig)
                            .push_data(&pubkey.as_bytes())
                            .into_script();
                    },
                    SpendKind::P2shP2wpkh(_) => {
                        input.script_sig = ScriptBuilder::new()
                            .push_data(Script::p2wpkh(&pubkey).as_bytes())
                            .into_script();
                        input.witness = vec![sig, pubkey.as_bytes().to_vec()];
                    },
                    _ => input.witness = vec![sig, pubkey.as_bytes().to_vec()]
                }
            }
        }
    }

    Ok(SignedTx(tx))
}

/**
    Builds a transaction spending the given outputs and signs every input with
    one key.
*/
pub fn build_and_sign(ctx: &Context, inputs: Vec<TxInput>, outputs: Vec<TxOut>, key: &PrivKey) -> Result<SignedTx, TxErr> {
    let unsigned = build_transaction(inputs, outputs)?;
    let signatures = (0..unsigned.tx.inputs.len())
        .map(|i| sign_input(ctx, &unsigned, i, key).map(Some))
        .collect::<Result<Vec<Option<InputSignature>>, TxErr>>()?;

    finalize(ctx, unsigned, signatures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        address::Address,
        network::Network,
        transaction::OutPoint
    };

    const KEY_HEX: &str = "60164bec9512d004af7f71e7ed868c8e9ac2cc6234d8b682037ec80547595f2e";

    fn input(script: Script, value: u64, vout: u32) -> TxInput {
        TxInput { outpoint: OutPoint::new([7u8; 32], vout), prevout: TxOut::new(value, script) }
    }

    fn spend_all_kinds(ctx: &Context, key: &PrivKey) -> Vec<TxInput> {
        let pk = key.public_key(ctx);
        vec![
            input(Address::p2pkh(&pk, Network::Bitcoin).script_pubkey(), 10_000, 0),
            input(Address::p2sh_p2wpkh(&pk, Network::Bitcoin).script_pubkey(), 20_000, 1),
            input(Address::p2wpkh(&pk, Network::Bitcoin).script_pubkey(), 30_000, 2),
            input(Address::p2tr_from_internal(ctx, &pk.x_only(), None, Network::Bitcoin).unwrap().script_pubkey(), 40_000, 3)
        ]
    }

    #[test]
    fn signs_every_input_kind() {
        let ctx = Context::new();
        let key = PrivKey::from_hex(KEY_HEX).unwrap();
        let outputs = vec![TxOut::new(90_000, Script::p2wpkh(&key.public_key(&ctx)))];

        let signed = build_and_sign(&ctx, spend_all_kinds(&ctx, &key), outputs, &key).unwrap();
        let tx = signed.transaction();

        //P2PKH: <sig> <pubkey> and no witness
        assert!(tx.inputs[0].witness.is_empty());
        assert_eq!(*tx.inputs[0].script_sig.as_bytes().last().unwrap(), 0xc1);
        //P2SH-P2WPKH: redeem script push
        assert_eq!(tx.inputs[1].script_sig.hex(), format!("16{}", Script::p2wpkh(&key.public_key(&ctx)).hex()));
        assert_eq!(tx.inputs[1].witness.len(), 2);
        assert_eq!(tx.inputs[2].witness[1], key.public_key(&ctx).as_bytes().to_vec());
        //P2TR: one 64 byte signature
        assert!(tx.inputs[3].script_sig.is_empty());
        assert_eq!(tx.inputs[3].witness.len(), 1);
        assert_eq!(tx.inputs[3].witness[0].len(), 64);

        //Deterministic signing
        let outputs = vec![TxOut::new(90_000, Script::p2wpkh(&key.public_key(&ctx)))];
        let again = build_and_sign(&ctx, spend_all_kinds(&ctx, &key), outputs, &key).unwrap();
        assert_eq!(again, signed);
    }

    #[test]
    fn foreign_key_is_rejected() {
        let ctx = Context::new();
        let owner = PrivKey::from_hex(KEY_HEX).unwrap();
        let other = PrivKey::new_rand();
        let outputs = vec![TxOut::new(1_000, Script::p2wpkh(&owner.public_key(&ctx)))];

        for (i, input) in spend_all_kinds(&ctx, &owner).into_iter().enumerate() {
            let unsigned = build_transaction(vec![input], outputs.clone()).unwrap();
            assert_eq!(sign_input(&ctx, &unsigned, 0, &other), Err(TxErr::ScriptMismatch(0)), "input kind {}", i);
        }
    }

    #[test]
    fn finalize_checks_signatures() {
        let ctx = Context::new();
        let key = PrivKey::from_hex(KEY_HEX).unwrap();
        let outputs = vec![TxOut::new(1_000, Script::p2wpkh(&key.public_key(&ctx)))];
        let inputs = spend_all_kinds(&ctx, &key);
        let unsigned = build_transaction(inputs[2..].to_vec(), outputs).unwrap();

        let good = sign_input(&ctx, &unsigned, 0, &key).unwrap();
        let taproot = sign_input(&ctx, &unsigned, 1, &key).unwrap();

        assert_eq!(finalize(&ctx, unsigned.clone(), vec![Some(good.clone())]), Err(TxErr::SignatureCount { expected: 2, got: 1 }));
        assert_eq!(finalize(&ctx, unsigned.clone(), vec![Some(good.clone()), None]), Err(TxErr::MissingSignature(1)));
        //Signatures swapped between inputs
        assert_eq!(finalize(&ctx, unsigned.clone(), vec![Some(taproot.clone()), Some(good.clone())]), Err(TxErr::ScriptMismatch(0)));

        //Signature over a different transaction
        let mut altered = unsigned.clone();
        altered.tx.outputs[0].value = 999;
        let stale = sign_input(&ctx, &altered, 0, &key).unwrap();
        assert_eq!(finalize(&ctx, unsigned.clone(), vec![Some(stale), Some(taproot.clone())]), Err(TxErr::ScriptMismatch(0)));

        assert!(finalize(&ctx, unsigned, vec![Some(good), Some(taproot)]).is_ok());
    }
}
