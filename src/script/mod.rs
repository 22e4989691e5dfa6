/*
    Locking script construction and classification.

    Covers the standard output types: P2PKH, P2SH, P2WPKH, P2WSH,
    bare multisig (P2MS) and P2TR. Nested forms such as P2SH(P2WSH(P2MS))
    are built by hashing one script into the next.
*/

pub mod builder;
pub mod witness_program;

use thiserror::Error;

use crate::{
    encoding::Bech32Err,
    hash,
    key::{
        PubKey,
        SchnorrPublicKey
    },
    util::{
        decode_02x,
        encode_02x,
        prefix_compact_size
    }
};

pub use builder::{Builder as ScriptBuilder, Opcode, opcodes};
pub use witness_program::WitnessProgram;

//OP_1 to OP_16 limits the key count of a multisig script
pub const MAX_MULTISIG_KEYS: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptErr {
    #[error("threshold {threshold} is invalid for {keys} keys")]
    InvalidThreshold { threshold: usize, keys: usize },
    #[error("{0} keys exceed the multisig limit of 16")]
    MaxKeyCountExceeded(usize),
    #[error("witness scripts only take compressed public keys")]
    UncompressedKey,
    #[error("invalid witness version {0}")]
    BadVersion(u8),
    #[error("invalid witness program length {0}")]
    InvalidProgramLength(usize),
    #[error(transparent)]
    Bech32(#[from] Bech32Err)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Script {
    pub code: Vec<u8>
}

/// Output type of a locking script and the data it commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    P2PKH([u8; 20]),
    P2SH([u8; 20]),
    P2WPKH([u8; 20]),
    P2WSH([u8; 32]),
    P2TR([u8; 32]),
    P2MS { required: u8, total: u8 },
    NonStandard
}

impl Script {
    /**
        Create a new instance of self
    */
    pub fn new(code: Vec<u8>) -> Self {
        Self {
            code
        }
    }

    pub fn from_hex(code: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self::new(decode_02x(code)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn hex(&self) -> String {
        encode_02x(&self.code)
    }

    /**
        Hash the script with Hash160
    */
    pub fn hash(&self) -> [u8; 20] {
        hash::hash160(&self.code)
    }

    /// Script with its compact size length prefix, as serialised in transactions
    pub fn prefix_compactsize(&self) -> Vec<u8> {
        prefix_compact_size(&self.code)
    }

    /// P2PKH script pub key
    /// OP_DUP OP_HASH160 <Pubkey Hash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh(pubkey: &PubKey) -> Self {
        Self::p2pkh_from_hash(&pubkey.hash160())
    }

    pub fn p2pkh_from_hash(hash: &[u8; 20]) -> Self {
        ScriptBuilder::new()
            .push_opcode(opcodes::OP_DUP)
            .push_opcode(opcodes::OP_HASH160)
            .push_data(hash)
            .push_opcode(opcodes::OP_EQUALVERIFY)
            .push_opcode(opcodes::OP_CHECKSIG)
            .into_script()
    }

    /// P2SH script pub key
    /// OP_HASH160 <Hash160(redeemScript)> OP_EQUAL
    pub fn p2sh(script: &Self) -> Self {
        Self::p2sh_from_hash(&script.hash())
    }

    pub fn p2sh_from_hash(hash: &[u8; 20]) -> Self {
        ScriptBuilder::new()
            .push_opcode(opcodes::OP_HASH160)
            .push_data(hash)
            .push_opcode(opcodes::OP_EQUAL)
            .into_script()
    }

    /// P2WPKH script pub key
    /// 0x0014 <20-byte-pubkey-hash>
    pub fn p2wpkh(pubkey: &PubKey) -> Self {
        WitnessProgram { version: 0, program: pubkey.hash160().to_vec() }.to_scriptpubkey()
    }

    /// P2WSH script pub key
    /// 0x0020 <32-byte-script-hash>
    pub fn p2wsh(script: &Self) -> Self {
        WitnessProgram { version: 0, program: hash::sha256(&script.code).to_vec() }.to_scriptpubkey()
    }

    /// P2TR script pub key of an already tweaked output key
    /// 0x5120 <32-byte-x-only-key>
    pub fn p2tr(output_key: &SchnorrPublicKey) -> Self {
        WitnessProgram { version: 1, program: output_key.as_bytes().to_vec() }.to_scriptpubkey()
    }

    /**
        Creates the script for an m-of-n multisig wallet (BIP-11).
        OP_m <pubkey 1> ... <pubkey n> OP_n OP_CHECKMULTISIG

        Keys stay in the order given and are pushed in the encoding they were
        supplied in, 33 or 65 bytes.
    */
    pub fn multisig(threshold: usize, keys: &[PubKey]) -> Result<Self, ScriptErr> {
        if threshold < 1 || threshold > keys.len() {
            return Err(ScriptErr::InvalidThreshold { threshold, keys: keys.len() })
        }
        if keys.len() > MAX_MULTISIG_KEYS {
            return Err(ScriptErr::MaxKeyCountExceeded(keys.len()))
        }

        let builder = keys.iter().fold(
            ScriptBuilder::new().push_small_int(threshold as u8),
            |builder, key| builder.push_data(&key.serialize())
        );

        Ok(builder
            .push_small_int(keys.len() as u8)
            .push_opcode(opcodes::OP_CHECKMULTISIG)
            .into_script())
    }

    /**
        Works out which standard template the script follows.
    */
    pub fn classify(&self) -> ScriptType {
        let c = &self.code;
        match c.len() {
            25 if c[0] == 0x76 && c[1] == 0xa9 && c[2] == 0x14 && c[23] == 0x88 && c[24] == 0xac => {
                ScriptType::P2PKH(fixed(&c[3..23]))
            },
            23 if c[0] == 0xa9 && c[1] == 0x14 && c[22] == 0x87 => ScriptType::P2SH(fixed(&c[2..22])),
            22 if c[0] == 0x00 && c[1] == 0x14 => ScriptType::P2WPKH(fixed(&c[2..22])),
            34 if c[0] == 0x00 && c[1] == 0x20 => ScriptType::P2WSH(fixed(&c[2..34])),
            34 if c[0] == 0x51 && c[1] == 0x20 => ScriptType::P2TR(fixed(&c[2..34])),
            _ => self.classify_multisig().unwrap_or(ScriptType::NonStandard)
        }
    }

    /**
        Checks the script can be used as a witness script.
        Segwit only relays compressed keys, so a multisig script holding a
        65 byte key fails with UncompressedKey.
    */
    pub fn check_witness_keys(&self) -> Result<(), ScriptErr> {
        match self.multisig_keys() {
            Some((_, _, keys)) if keys.iter().any(|k| k.len() == 65) => Err(ScriptErr::UncompressedKey),
            _ => Ok(())
        }
    }

    fn classify_multisig(&self) -> Option<ScriptType> {
        self.multisig_keys().map(|(required, total, _)| ScriptType::P2MS { required, total })
    }

    //OP_m <key>... OP_n OP_CHECKMULTISIG with between 1 and 16 keys
    fn multisig_keys(&self) -> Option<(u8, u8, Vec<&[u8]>)> {
        let (last, body) = self.code.split_last()?;
        if *last != opcodes::OP_CHECKMULTISIG.into_u8() { return None }
        let (n_op, body) = body.split_last()?;
        let (m_op, mut rest) = body.split_first()?;

        let required = Opcode::from(*m_op).to_small_int()?;
        let total = Opcode::from(*n_op).to_small_int()?;

        let mut keys: Vec<&[u8]> = Vec::with_capacity(total as usize);
        while let Some((len, tail)) = rest.split_first() {
            let len = *len as usize;
            if !(len == 33 || len == 65) || tail.len() < len || keys.len() == MAX_MULTISIG_KEYS { return None }
            keys.push(&tail[..len]);
            rest = &tail[len..];
        }

        if required == 0 || required > total || keys.len() != total as usize { return None }
        Some((required, total, keys))
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEYS: [&str; 3] = [
        "026477115981fe981a6918a6297d9803c4dc04f328f22041bedff886bbc2962e01",
        "02c96db2302d19b43d4c69368babace7854cc84eb9e061cde51cfa77ca4a22b8b9",
        "03c6103b3b83e4a24a0e33a4df246ef11772f9992663db0c35759a5e2ebf68d8e9"
    ];

    fn keys() -> Vec<PubKey> {
        PUBKEYS.iter().map(|k| PubKey::from_hex(k).unwrap()).collect()
    }

    #[test]
    fn standard_templates() {
        let pk = PubKey::from_hex("0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe").unwrap();
        let h = pk.hash160();

        let p2pkh = Script::p2pkh(&pk);
        assert_eq!(p2pkh.hex(), format!("76a914{}88ac", hex::encode(h)));
        assert_eq!(p2pkh.classify(), ScriptType::P2PKH(h));

        let p2wpkh = Script::p2wpkh(&pk);
        assert_eq!(p2wpkh.hex(), format!("0014{}", hex::encode(h)));
        assert_eq!(p2wpkh.classify(), ScriptType::P2WPKH(h));

        let p2sh = Script::p2sh(&p2wpkh);
        assert_eq!(p2sh.hex(), format!("a914{}87", hex::encode(p2wpkh.hash())));
        assert_eq!(p2sh.classify(), ScriptType::P2SH(p2wpkh.hash()));

        let p2wsh = Script::p2wsh(&p2pkh);
        assert_eq!(p2wsh.classify(), ScriptType::P2WSH(hash::sha256(&p2pkh.code)));

        let p2tr = Script::p2tr(&pk.x_only());
        assert_eq!(p2tr.hex(), format!("5120{}", &pk.hex()[2..]));
        assert_eq!(p2tr.classify(), ScriptType::P2TR(pk.x_only().as_bytes()));
    }

    #[test]
    fn multisig_keeps_key_order() {
        let mut reversed = keys();
        reversed.reverse();
        let script = Script::multisig(2, &reversed).unwrap();

        let mut expected = String::from("52");
        for k in PUBKEYS.iter().rev() {
            expected.push_str("21");
            expected.push_str(k);
        }
        expected.push_str("53ae");
        assert_eq!(script.hex(), expected);
        assert_eq!(script.classify(), ScriptType::P2MS { required: 2, total: 3 });
    }

    #[test]
    fn multisig_threshold_bounds() {
        assert_eq!(Script::multisig(0, &keys()), Err(ScriptErr::InvalidThreshold { threshold: 0, keys: 3 }));
        assert_eq!(Script::multisig(4, &keys()), Err(ScriptErr::InvalidThreshold { threshold: 4, keys: 3 }));
        assert_eq!(Script::multisig(1, &[]), Err(ScriptErr::InvalidThreshold { threshold: 1, keys: 0 }));

        let many = vec![keys()[0]; 17];
        assert_eq!(Script::multisig(2, &many), Err(ScriptErr::MaxKeyCountExceeded(17)));
        assert!(Script::multisig(16, &many[..16]).is_ok());
    }

    #[test]
    fn multisig_keeps_key_encoding() {
        let mut mixed = keys();
        mixed[0] = PubKey::from_hex(&mixed[0].decompressed_hex()).unwrap();
        let script = Script::multisig(2, &mixed).unwrap();

        assert_eq!(&script.hex()[..134], format!("5241{}", mixed[0].decompressed_hex()));
        assert_eq!(script.len(), 1 + 66 + 34 * 2 + 2);
        assert_eq!(script.classify(), ScriptType::P2MS { required: 2, total: 3 });

        assert_eq!(script.check_witness_keys(), Err(ScriptErr::UncompressedKey));
        assert_eq!(Script::multisig(2, &keys()).unwrap().check_witness_keys(), Ok(()));
    }

    #[test]
    fn oversized_multisig_is_nonstandard() {
        //OP_1 <256 keys> OP_16 OP_CHECKMULTISIG
        let mut code = vec![0x51];
        for _ in 0..256 {
            code.push(0x21);
            code.extend_from_slice(&keys()[0].as_bytes());
        }
        code.extend_from_slice(&[0x60, 0xae]);
        let script = Script::new(code);

        assert_eq!(script.classify(), ScriptType::NonStandard);
        assert_eq!(script.check_witness_keys(), Ok(()));

        //17 keys under OP_16
        let seventeen = format!("51{}60ae", format!("21{}", PUBKEYS[0]).repeat(17));
        assert_eq!(Script::from_hex(&seventeen).unwrap().classify(), ScriptType::NonStandard);
    }

    #[test]
    fn nonstandard_scripts() {
        assert_eq!(Script::new(vec![]).classify(), ScriptType::NonStandard);
        assert_eq!(Script::from_hex("6a29052003").unwrap().classify(), ScriptType::NonStandard);
        //Key count does not match OP_n
        assert_eq!(Script::from_hex(&format!("5221{}52ae", PUBKEYS[0])).unwrap().classify(), ScriptType::NonStandard);
    }
}
