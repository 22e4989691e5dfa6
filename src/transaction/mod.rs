/*
    Transaction assembly and signing.

    A transaction is built from the outputs it spends and the payments it makes,
    then every input is signed according to the type of the output it spends:

        P2PKH        legacy sighash, ECDSA, scriptSig <sig> <pubkey>
        P2SH-P2WPKH  BIP143 sighash, ECDSA, scriptSig <redeem script>, witness <sig> <pubkey>
        P2WPKH       BIP143 sighash, ECDSA, witness <sig> <pubkey>
        P2TR         BIP341 sighash, Schnorr with the BIP86 tweak, witness <sig>

    Transactions are version 2 with final sequence numbers and no lock time.
*/

pub mod sighash;
pub mod sign;

use std::fmt;

use thiserror::Error;

use crate::{
    address::AddressErr,
    hash,
    key::KeyErr,
    script::{Script, ScriptType},
    taproot::TaprootErr,
    util::{compact_size, decode_02x, encode_02x, prefix_compact_size, try_into}
};

pub use sighash::{legacy_sighash, segwit_v0_sighash, taproot_key_spend_sighash, TapSighashType};
pub use sign::{build_and_sign, finalize, sign_input, InputSignature, SignedTx};

pub const TX_VERSION: i32 = 2;
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
pub const SIGHASH_ALL: u32 = 0x01;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TxErr {
    #[error("input {0} has no signature")]
    MissingSignature(usize),
    #[error("signature for input {0} does not satisfy its script")]
    ScriptMismatch(usize),
    #[error("input {0} spends an unsupported script type")]
    UnsupportedInput(usize),
    #[error("outputs total {outputs} exceeds inputs total {inputs}")]
    InsufficientFunds { inputs: u64, outputs: u64 },
    #[error("amounts overflow")]
    AmountOverflow,
    #[error("transaction has no inputs")]
    NoInputs,
    #[error("transaction has no outputs")]
    NoOutputs,
    #[error("bad txid '{0}'")]
    BadTxid(String),
    #[error("input index {0} out of range")]
    InputIndex(usize),
    #[error("expected {expected} signatures, got {got}")]
    SignatureCount { expected: usize, got: usize },
    #[error("expected {expected} spent outputs, got {got}")]
    PrevoutCount { expected: usize, got: usize },
    #[error(transparent)]
    Address(#[from] AddressErr),
    #[error(transparent)]
    Key(#[from] KeyErr),
    #[error(transparent)]
    Taproot(#[from] TaprootErr)
}

/// Reference to an output of a previous transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Internal byte order, the reverse of the hex shown by explorers
    pub txid: [u8; 32],
    pub vout: u32
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Parses a txid in display order
    pub fn from_hex_txid(txid: &str, vout: u32) -> Result<Self, TxErr> {
        let bytes = decode_02x(txid).map_err(|_| TxErr::BadTxid(txid.to_string()))?;
        let mut id: [u8; 32] = try_into(&bytes).map_err(|_| TxErr::BadTxid(txid.to_string()))?;
        id.reverse();
        Ok(Self::new(id, vout))
    }

    /// txid || vout (LE)
    pub fn serialize(&self) -> Vec<u8> {
        let mut v = self.txid.to_vec();
        v.extend_from_slice(&self.vout.to_le_bytes());
        v
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>
}

impl TxIn {
    pub fn new(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            script_sig: Script::default(),
            sequence: SEQUENCE_FINAL,
            witness: vec![]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Script
}

impl TxOut {
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        Self { value, script_pubkey }
    }

    /// value (LE) || compact_size(script) || script
    pub fn serialize(&self) -> Vec<u8> {
        let mut v = self.value.to_le_bytes().to_vec();
        v.extend_from_slice(&self.script_pubkey.prefix_compactsize());
        v
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub lock_time: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>
}

impl Transaction {
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    /**
        Consensus serialization.
        The segwit marker, flag and witnesses are only written when an input carries a witness.
    */
    pub fn serialize(&self) -> Vec<u8> {
        self.encode(self.has_witness())
    }

    /// Serialization without witness data, the txid preimage
    pub fn serialize_legacy(&self) -> Vec<u8> {
        self.encode(false)
    }

    fn encode(&self, with_witness: bool) -> Vec<u8> {
        let mut v = self.version.to_le_bytes().to_vec();
        if with_witness {
            v.extend_from_slice(&[0x00, 0x01]);
        }

        v.extend(compact_size(self.inputs.len() as u64));
        for input in &self.inputs {
            v.extend(input.previous_output.serialize());
            v.extend(input.script_sig.prefix_compactsize());
            v.extend_from_slice(&input.sequence.to_le_bytes());
        }

        v.extend(compact_size(self.outputs.len() as u64));
        for output in &self.outputs {
            v.extend(output.serialize());
        }

        if with_witness {
            for input in &self.inputs {
                v.extend(compact_size(input.witness.len() as u64));
                for item in &input.witness {
                    v.extend(prefix_compact_size(item));
                }
            }
        }

        v.extend_from_slice(&self.lock_time.to_le_bytes());
        v
    }

    /// Double SHA256 of the legacy serialization, internal byte order
    pub fn txid(&self) -> [u8; 32] {
        hash::sha256d(self.serialize_legacy())
    }

    /// txid in display order
    pub fn txid_hex(&self) -> String {
        let mut id = self.txid();
        id.reverse();
        encode_02x(&id)
    }

    pub fn hex(&self) -> String {
        encode_02x(&self.serialize())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

/// How an input is unlocked, read from the script of the output it spends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendKind {
    P2pkh([u8; 20]),
    P2shP2wpkh([u8; 20]),
    P2wpkh([u8; 20]),
    P2trKeyPath([u8; 32])
}

impl SpendKind {
    /**
        P2SH outputs are assumed to wrap a P2WPKH program.
        Bare multisig, P2WSH and non standard scripts are rejected.
    */
    pub fn from_script(script: &Script, index: usize) -> Result<Self, TxErr> {
        match script.classify() {
            ScriptType::P2PKH(h) => Ok(SpendKind::P2pkh(h)),
            ScriptType::P2SH(h) => Ok(SpendKind::P2shP2wpkh(h)),
            ScriptType::P2WPKH(h) => Ok(SpendKind::P2wpkh(h)),
            ScriptType::P2TR(k) => Ok(SpendKind::P2trKeyPath(k)),
            _ => Err(TxErr::UnsupportedInput(index))
        }
    }
}

/// An output to spend: where it is and what it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub outpoint: OutPoint,
    pub prevout: TxOut
}

/**
    A transaction whose inputs are resolved but not yet signed.
    Keeps the spent outputs, every sighash algorithm needs their amounts or scripts.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub tx: Transaction,
    pub prevouts: Vec<TxOut>,
    pub kinds: Vec<SpendKind>
}

impl UnsignedTx {
    pub fn fee(&self) -> u64 {
        let inputs = self.prevouts.iter().fold(0u64, |acc, p| acc.saturating_add(p.value));
        let outputs = self.tx.outputs.iter().fold(0u64, |acc, o| acc.saturating_add(o.value));
        inputs.saturating_sub(outputs)
    }
}

fn checked_total<'a>(mut outputs: impl Iterator<Item = &'a TxOut>) -> Result<u64, TxErr> {
    outputs.try_fold(0u64, |acc, o| acc.checked_add(o.value).ok_or(TxErr::AmountOverflow))
}

/**
    Builds a version 2 transaction spending the given outputs.
    Every input must spend a supported script type and the payments may not
    exceed the value being spent. The difference is left as fee.
*/
pub fn build_transaction(inputs: Vec<TxInput>, outputs: Vec<TxOut>) -> Result<UnsignedTx, TxErr> {
    if inputs.is_empty() { return Err(TxErr::NoInputs) }
    if outputs.is_empty() { return Err(TxErr::NoOutputs) }

    let total_in = checked_total(inputs.iter().map(|i| &i.prevout))?;
    let total_out = checked_total(outputs.iter())?;
    if total_out > total_in {
        return Err(TxErr::InsufficientFunds { inputs: total_in, outputs: total_out })
    }

    let kinds = inputs.iter()
        .enumerate()
        .map(|(i, input)| SpendKind::from_script(&input.prevout.script_pubkey, i))
        .collect::<Result<Vec<SpendKind>, TxErr>>()?;

    let tx = Transaction {
        version: TX_VERSION,
        lock_time: 0,
        inputs: inputs.iter().map(|i| TxIn::new(i.outpoint)).collect(),
        outputs
    };

    Ok(UnsignedTx {
        tx,
        prevouts: inputs.into_iter().map(|i| i.prevout).collect(),
        kinds
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "9f96ade4b41d5433f4eda31e1738ec2b36f6e7d1420d94a6af99801a88f7f7ff";

    fn p2wpkh_output(value: u64) -> TxOut {
        TxOut::new(value, Script::from_hex("00141d0f172a0ecb48aee1be1f2687d2963ae33f71a1").unwrap())
    }

    #[test]
    fn txid_byte_order() {
        let outpoint = OutPoint::from_hex_txid(TXID, 3).unwrap();
        assert_eq!(outpoint.txid[0], 0xff);
        assert_eq!(outpoint.txid[31], 0x9f);
        assert_eq!(&outpoint.serialize()[32..], &[3, 0, 0, 0]);

        assert!(matches!(OutPoint::from_hex_txid("abcd", 0), Err(TxErr::BadTxid(_))));
        assert!(matches!(OutPoint::from_hex_txid("xyz", 0), Err(TxErr::BadTxid(_))));
    }

    #[test]
    fn build_checks() {
        let input = TxInput { outpoint: OutPoint::from_hex_txid(TXID, 0).unwrap(), prevout: p2wpkh_output(10_000) };

        assert_eq!(build_transaction(vec![], vec![p2wpkh_output(1)]), Err(TxErr::NoInputs));
        assert_eq!(build_transaction(vec![input.clone()], vec![]), Err(TxErr::NoOutputs));
        assert_eq!(
            build_transaction(vec![input.clone()], vec![p2wpkh_output(10_001)]),
            Err(TxErr::InsufficientFunds { inputs: 10_000, outputs: 10_001 })
        );
        assert_eq!(
            build_transaction(vec![input.clone()], vec![p2wpkh_output(u64::MAX), p2wpkh_output(1)]),
            Err(TxErr::AmountOverflow)
        );

        let bare = TxInput { prevout: TxOut::new(1, Script::from_hex("6a").unwrap()), ..input.clone() };
        assert_eq!(build_transaction(vec![input.clone(), bare], vec![p2wpkh_output(1)]), Err(TxErr::UnsupportedInput(1)));

        //OP_1 <256 keys> OP_16 OP_CHECKMULTISIG
        let key = "0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe";
        let oversized = Script::from_hex(&format!("51{}60ae", format!("21{}", key).repeat(256))).unwrap();
        assert_eq!(SpendKind::from_script(&oversized, 0), Err(TxErr::UnsupportedInput(0)));

        let unsigned = build_transaction(vec![input], vec![p2wpkh_output(9_000)]).unwrap();
        assert_eq!(unsigned.fee(), 1_000);
        assert_eq!(unsigned.tx.version, 2);
        assert_eq!(unsigned.tx.inputs[0].sequence, SEQUENCE_FINAL);
    }

    #[test]
    fn serialization_layout() {
        let mut tx = Transaction {
            version: TX_VERSION,
            lock_time: 0,
            inputs: vec![TxIn::new(OutPoint::from_hex_txid(TXID, 1).unwrap())],
            outputs: vec![p2wpkh_output(5_000)]
        };

        let legacy = tx.serialize();
        //version + count + outpoint + empty script + sequence + count + output + locktime
        assert_eq!(legacy.len(), 4 + 1 + 36 + 1 + 4 + 1 + 31 + 4);
        assert_eq!(&legacy[..5], &[2, 0, 0, 0, 1]);

        tx.inputs[0].witness = vec![vec![0xaa; 2], vec![]];
        let segwit = tx.serialize();
        assert_eq!(&segwit[4..6], &[0x00, 0x01]);
        assert_eq!(segwit.len(), legacy.len() + 2 + 1 + 3 + 1);
        //Witness data does not change the txid
        assert_eq!(tx.serialize_legacy(), legacy);
        assert_eq!(tx.txid_hex().len(), 64);
    }
}
