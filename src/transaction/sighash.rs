/*
    Signature hash algorithms.

    Legacy and BIP143 digests are computed for SIGHASH_ALL.
    BIP341 key path digests support SIGHASH_DEFAULT and SIGHASH_ALL.

    References:
        https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki
        https://github.com/bitcoin/bips/blob/master/bip-0341.mediawiki
*/

use crate::{
    hash,
    script::Script,
    taproot::{TapSighashHash, TaprootTaggedHash},
    transaction::{Transaction, TxErr, TxOut, SIGHASH_ALL}
};

/// Sighash types usable for a taproot key path spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapSighashType {
    /// Commits to everything, 64 byte signature
    #[default]
    Default = 0x00,
    /// Same commitment as Default, 65 byte signature
    All = 0x01
}

impl TapSighashType {
    pub fn byte(&self) -> u8 {
        *self as u8
    }
}

fn check_index(tx: &Transaction, index: usize) -> Result<(), TxErr> {
    if index >= tx.inputs.len() { return Err(TxErr::InputIndex(index)) }
    Ok(())
}

/**
    Legacy SIGHASH_ALL digest.

    Every scriptSig is emptied except the one being signed, which is replaced by the
    script code. The serialization is followed by the sighash type (4 bytes LE)
    and double SHA256 hashed.
*/
pub fn legacy_sighash(tx: &Transaction, index: usize, script_code: &Script) -> Result<[u8; 32], TxErr> {
    check_index(tx, index)?;

    let mut copy = tx.clone();
    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.witness.clear();
        input.script_sig = if i == index { script_code.clone() } else { Script::default() };
    }

    let mut preimage = copy.serialize_legacy();
    preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
    Ok(hash::sha256d(preimage))
}

/**
    BIP143 SIGHASH_ALL digest for version 0 witness inputs.

    version | hashPrevouts | hashSequence | outpoint | scriptCode | value |
    sequence | hashOutputs | locktime | sighash type
*/
pub fn segwit_v0_sighash(tx: &Transaction, index: usize, script_code: &Script, value: u64) -> Result<[u8; 32], TxErr> {
    check_index(tx, index)?;

    let prevouts: Vec<u8> = tx.inputs.iter().flat_map(|i| i.previous_output.serialize()).collect();
    let sequences: Vec<u8> = tx.inputs.iter().flat_map(|i| i.sequence.to_le_bytes()).collect();
    let outputs: Vec<u8> = tx.outputs.iter().flat_map(|o| o.serialize()).collect();
    let input = &tx.inputs[index];

    let mut preimage = tx.version.to_le_bytes().to_vec();
    preimage.extend_from_slice(&hash::sha256d(prevouts));
    preimage.extend_from_slice(&hash::sha256d(sequences));
    preimage.extend(input.previous_output.serialize());
    preimage.extend(script_code.prefix_compactsize());
    preimage.extend_from_slice(&value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash::sha256d(outputs));
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());

    Ok(hash::sha256d(preimage))
}

/**
    BIP341 digest for a key path spend with no annex.

    The message commits to the amounts and scripts of every spent output,
    so all prevouts must be supplied in input order.
*/
pub fn taproot_key_spend_sighash(tx: &Transaction, index: usize, prevouts: &[TxOut], sighash_type: TapSighashType) -> Result<[u8; 32], TxErr> {
    check_index(tx, index)?;
    if prevouts.len() != tx.inputs.len() {
        return Err(TxErr::PrevoutCount { expected: tx.inputs.len(), got: prevouts.len() })
    }

    let outpoints: Vec<u8> = tx.inputs.iter().flat_map(|i| i.previous_output.serialize()).collect();
    let amounts: Vec<u8> = prevouts.iter().flat_map(|p| p.value.to_le_bytes()).collect();
    let scripts: Vec<u8> = prevouts.iter().flat_map(|p| p.script_pubkey.prefix_compactsize()).collect();
    let sequences: Vec<u8> = tx.inputs.iter().flat_map(|i| i.sequence.to_le_bytes()).collect();
    let outputs: Vec<u8> = tx.outputs.iter().flat_map(|o| o.serialize()).collect();

    //Epoch 0
    let mut msg = vec![0x00, sighash_type.byte()];
    msg.extend_from_slice(&tx.version.to_le_bytes());
    msg.extend_from_slice(&tx.lock_time.to_le_bytes());
    msg.extend_from_slice(&hash::sha256(outpoints));
    msg.extend_from_slice(&hash::sha256(amounts));
    msg.extend_from_slice(&hash::sha256(scripts));
    msg.extend_from_slice(&hash::sha256(sequences));
    msg.extend_from_slice(&hash::sha256(outputs));
    //Spend type: key path, no annex
    msg.push(0x00);
    msg.extend_from_slice(&(index as u32).to_le_bytes());

    Ok(TapSighashHash::from_slice(&msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{OutPoint, TxIn, TX_VERSION};

    fn tx() -> Transaction {
        Transaction {
            version: TX_VERSION,
            lock_time: 0,
            inputs: vec![
                TxIn::new(OutPoint::new([1u8; 32], 0)),
                TxIn::new(OutPoint::new([2u8; 32], 1))
            ],
            outputs: vec![TxOut::new(1_000, Script::from_hex("0014751e76e8199196d454941c45d1b3a323f1433bd6").unwrap())]
        }
    }

    #[test]
    fn index_and_prevout_checks() {
        let tx = tx();
        let script = Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        assert_eq!(legacy_sighash(&tx, 2, &script), Err(TxErr::InputIndex(2)));
        assert_eq!(segwit_v0_sighash(&tx, 5, &script, 1), Err(TxErr::InputIndex(5)));
        assert_eq!(
            taproot_key_spend_sighash(&tx, 0, &[TxOut::new(1, script)], TapSighashType::Default),
            Err(TxErr::PrevoutCount { expected: 2, got: 1 })
        );
    }

    #[test]
    fn digests_depend_on_input() {
        let tx = tx();
        let script = Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        assert_ne!(legacy_sighash(&tx, 0, &script).unwrap(), legacy_sighash(&tx, 1, &script).unwrap());
        assert_ne!(segwit_v0_sighash(&tx, 0, &script, 5).unwrap(), segwit_v0_sighash(&tx, 0, &script, 6).unwrap());

        let prevouts = vec![TxOut::new(5, script.clone()), TxOut::new(6, script)];
        let default = taproot_key_spend_sighash(&tx, 0, &prevouts, TapSighashType::Default).unwrap();
        let all = taproot_key_spend_sighash(&tx, 0, &prevouts, TapSighashType::All).unwrap();
        assert_ne!(default, all);
    }
}
