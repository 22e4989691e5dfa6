/*
    Module implements segwit address encoding on top of the bech32 crate.

    Witness version 0 uses Bech32 (BIP-173), versions 1 to 16 use Bech32m (BIP-350).
*/
use bech32::{
    primitives::decode::{CharError, ChecksumError, SegwitHrpstringError, UncheckedHrpstring, UncheckedHrpstringError},
    segwit::{self, EncodeError},
    Bech32,
    Bech32m,
    Fe32,
    Hrp
};
use thiserror::Error;

use crate::script::WitnessProgram;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Bech32Err {
    #[error("string mixes upper and lower case")]
    MixedCase,
    #[error("invalid character '{0}'")]
    InvalidChar(char),
    #[error("missing separator")]
    MissingSeparator,
    #[error("invalid human readable part")]
    InvalidHrp,
    #[error("invalid length {0}")]
    InvalidLength(usize),
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("non zero padding")]
    InvalidPadding,
    #[error("invalid witness version {0}")]
    InvalidWitnessVersion(u8),
    #[error("invalid witness program length {0}")]
    InvalidProgramLength(usize),
    #[error("witness version {0} encoded with the wrong checksum variant")]
    WrongVariant(u8)
}

impl From<UncheckedHrpstringError> for Bech32Err {
    fn from(e: UncheckedHrpstringError) -> Self {
        match e {
            UncheckedHrpstringError::Char(CharError::MissingSeparator) => Bech32Err::MissingSeparator,
            UncheckedHrpstringError::Char(CharError::InvalidChar(c)) => Bech32Err::InvalidChar(c),
            UncheckedHrpstringError::Char(CharError::MixedCase) => Bech32Err::MixedCase,
            UncheckedHrpstringError::Char(_) => Bech32Err::InvalidLength(0),
            _ => Bech32Err::InvalidHrp
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Bech32,
    Bech32m
}

impl Variant {
    fn of(unchecked: &UncheckedHrpstring) -> Result<Self, Bech32Err> {
        if unchecked.has_valid_checksum::<Bech32>() { return Ok(Variant::Bech32) }

        match unchecked.validate_checksum::<Bech32m>() {
            Ok(()) => Ok(Variant::Bech32m),
            Err(ChecksumError::InvalidLength) => Err(Bech32Err::InvalidLength(unchecked.data_part_ascii().len())),
            Err(_) => Err(Bech32Err::BadChecksum)
        }
    }
}

/**
    Checks a Bech32 or Bech32m string of any human readable part.
    Returns the lower case human readable part and the checksum variant that validated.
*/
pub fn validate(encoded: &str) -> Result<(String, Variant), Bech32Err> {
    let unchecked = UncheckedHrpstring::new(encoded)?;
    let variant = Variant::of(&unchecked)?;
    Ok((unchecked.hrp().to_lowercase(), variant))
}

/**
    Encodes a witness program as a segwit address under the given human readable part.
    The checksum variant follows the witness version.
*/
pub fn encode(hrp: &str, program: &WitnessProgram) -> Result<String, Bech32Err> {
    let hrp = Hrp::parse(hrp).map_err(|_| Bech32Err::InvalidHrp)?;
    let version = Fe32::try_from(program.version)
        .map_err(|_| Bech32Err::InvalidWitnessVersion(program.version))?;

    segwit::encode(hrp, version, &program.program).map_err(|e| match e {
        EncodeError::WitnessVersion(_) => Bech32Err::InvalidWitnessVersion(program.version),
        EncodeError::WitnessLength(_) => Bech32Err::InvalidProgramLength(program.program.len()),
        _ => Bech32Err::InvalidLength(program.program.len())
    })
}

/**
    Decodes a segwit address into its human readable part and witness program.
    Enforces BIP-173/350 rules on version, program length and checksum variant.
*/
pub fn decode(address: &str) -> Result<(String, WitnessProgram), Bech32Err> {
    let (hrp, version, program) = segwit::decode(address).map_err(|e| decode_error(address, e.0))?;
    Ok((hrp.to_lowercase(), WitnessProgram { version: version.to_u8(), program }))
}

fn decode_error(address: &str, e: SegwitHrpstringError) -> Bech32Err {
    match e {
        SegwitHrpstringError::Unchecked(e) => e.into(),
        SegwitHrpstringError::NoData => Bech32Err::InvalidLength(0),
        SegwitHrpstringError::TooLong(len) => Bech32Err::InvalidLength(len),
        SegwitHrpstringError::InvalidWitnessVersion(v) => Bech32Err::InvalidWitnessVersion(v.to_u8()),
        SegwitHrpstringError::Padding(_) => Bech32Err::InvalidPadding,
        SegwitHrpstringError::WitnessLength(_) => Bech32Err::InvalidProgramLength(program_len(address)),
        _ => checksum_error(address)
    }
}

//The checksum failed under the variant the witness version requires
fn checksum_error(address: &str) -> Bech32Err {
    let unchecked = match UncheckedHrpstring::new(address) {
        Ok(x) => x,
        Err(e) => return e.into()
    };

    match (Variant::of(&unchecked), unchecked.witness_version()) {
        (Ok(_), Some(version)) => Bech32Err::WrongVariant(version.to_u8()),
        (Err(e), _) => e,
        _ => Bech32Err::BadChecksum
    }
}

//Program bytes carried by an address: data part less version and checksum
fn program_len(address: &str) -> usize {
    match address.rfind('1') {
        Some(sep) => (address.len() - sep - 1).saturating_sub(7) * 5 / 8,
        None => 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bip173_valid_checksums() {
        let valid = [
            ("A12UEL5L", "a"),
            ("a12uel5l", "a"),
            ("an83characterlonghumanreadablepartthatcontainsthenumber1andtheexcludedcharactersbio1tt5tgs",
                "an83characterlonghumanreadablepartthatcontainsthenumber1andtheexcludedcharactersbio"),
            ("abcdef1qpzry9x8gf2tvdw0s3jn54khce6mua7lmqqqxw", "abcdef"),
            ("split1checkupstagehandshakeupstreamerranterredcaperred2y9e3w", "split"),
        ];
        for (s, hrp) in valid {
            assert_eq!(validate(s).unwrap(), (hrp.to_string(), Variant::Bech32), "{}", s);
        }
    }

    #[test]
    fn bip350_valid_checksums() {
        let valid = [
            "A1LQFN3A",
            "a1lqfn3a",
            "abcdef1l7aum6echk45nj3s0wdvt2fg8x9yrzpqzd3ryx",
            "split1checkupstagehandshakeupstreamerranterredcaperredlc445v",
        ];
        for s in valid {
            assert_eq!(validate(s).unwrap().1, Variant::Bech32m, "{}", s);
        }
    }

    #[test]
    fn invalid_strings() {
        assert_eq!(validate("pzry9x0s0muk"), Err(Bech32Err::MissingSeparator));
        assert_eq!(validate("1pzry9x0s0muk"), Err(Bech32Err::InvalidHrp));
        assert_eq!(validate("x1b4n0q5v"), Err(Bech32Err::InvalidChar('b')));
        assert_eq!(validate("A1G7SGD8"), Err(Bech32Err::BadChecksum));
        assert_eq!(validate("a12UEL5L"), Err(Bech32Err::MixedCase));
        assert_eq!(validate("li1dgmt3"), Err(Bech32Err::InvalidLength(5)));
    }

    #[test]
    fn segwit_addresses() {
        let (hrp, prog) = decode("BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4").unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(prog.version, 0);
        assert_eq!(hex::encode(&prog.program), "751e76e8199196d454941c45d1b3a323f1433bd6");
        assert_eq!(encode("bc", &prog).unwrap(), "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");

        let (hrp, prog) = decode("bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0").unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(prog.version, 1);
        assert_eq!(hex::encode(&prog.program), "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798");
        assert_eq!(encode("bc", &prog).unwrap(), "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0");
    }

    #[test]
    fn segwit_variant_mismatch() {
        //v1 program with a bech32 checksum
        assert_eq!(
            decode("bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqh2y7hd"),
            Err(Bech32Err::WrongVariant(1))
        );
        //v0 program with a bech32m checksum
        assert_eq!(
            decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kemeawh"),
            Err(Bech32Err::WrongVariant(0))
        );
        //Checksum valid under neither variant
        assert_eq!(
            decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5"),
            Err(Bech32Err::BadChecksum)
        );
    }

    #[test]
    fn encode_rules() {
        let program = WitnessProgram { version: 0, program: vec![0; 21] };
        assert_eq!(encode("bc", &program), Err(Bech32Err::InvalidProgramLength(21)));

        let program = WitnessProgram { version: 17, program: vec![0; 32] };
        assert_eq!(encode("bc", &program), Err(Bech32Err::InvalidWitnessVersion(17)));

        let program = WitnessProgram { version: 0, program: vec![0; 20] };
        assert_eq!(encode("", &program), Err(Bech32Err::InvalidHrp));
    }
}
