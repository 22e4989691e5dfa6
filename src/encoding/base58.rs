use thiserror::Error;

use crate::{
    encoding::version_prefix::VersionPrefix,
    hash
};

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const MAP_BASE58: [i8; 128] = [
        -1,-1,-1,-1,-1,-1,-1,-1, -1,-1,-1,-1,-1,-1,-1,-1,
        -1,-1,-1,-1,-1,-1,-1,-1, -1,-1,-1,-1,-1,-1,-1,-1,
        -1,-1,-1,-1,-1,-1,-1,-1, -1,-1,-1,-1,-1,-1,-1,-1,
        -1, 0, 1, 2, 3, 4, 5, 6,  7, 8,-1,-1,-1,-1,-1,-1,
        -1, 9,10,11,12,13,14,15, 16,-1,17,18,19,20,21,-1,
        22,23,24,25,26,27,28,29, 30,31,32,-1,-1,-1,-1,-1,
        -1,33,34,35,36,37,38,39, 40,41,42,43,-1,44,45,46,
        47,48,49,50,51,52,53,54, 55,56,57,-1,-1,-1,-1,-1,
];


#[derive(Debug)]
pub struct Base58 {
    prefix: Option<VersionPrefix>,
    payload: Vec<u8>
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Base58Error {
    #[error("invalid base58 character '{0}'")]
    BadChar(char),
    #[error("unexpected character after whitespace at {0}")]
    CharAfterSpace(usize),
    #[error("base58 checksum mismatch")]
    BadChecksum,
    #[error("decoded data too short for a checksum")]
    TooShort
}

impl Base58 {
    pub fn new(prefix: Option<VersionPrefix>, payload: &[u8]) -> Base58 {
        Base58 {
            prefix,
            payload: payload.to_vec()
        }
    }

    /// Check encode data by appending the checksum and then encoding it.
    pub fn check_encode(self) -> String {
        //prefix | payload | checksum
        let mut bytes: Vec<u8> = match self.prefix {
            Some(x) => x.to_bytes(),
            None => Vec::new()
        };
        bytes.extend_from_slice(&self.payload);
        let checksum = hash::sha256d(&bytes);
        bytes.extend_from_slice(&checksum[0..4]);

        Self::encode(Self { prefix: None, payload: bytes })
    }

    /// Encode data in base58 format.
    pub fn encode(self) -> String {
        let data = match self.prefix {
            Some(x) => {
                let mut d = x.to_bytes();
                d.extend_from_slice(&self.payload);
                d
            },
            None => self.payload
        };

        //Leading zero bytes map to '1's
        let zcount = data.iter().take_while(|x| **x == 0).count();

        //Little endian base58 digits.
        //Each input byte multiplies the accumulated number by 256 and adds itself.
        let mut result: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
        for d in &data[zcount..] {
            let mut carry = *d as usize;
            for digit in result.iter_mut() {
                let n = *digit as usize * 256 + carry;
                *digit = (n % 58) as u8;
                carry = n / 58;
            }
            while carry > 0 {
                result.push((carry % 58) as u8);
                carry /= 58;
            }
        }

        for _ in 0..zcount {
            result.push(0);
        }
        result.iter().rev().map(|x| BASE58_ALPHABET[*x as usize] as char).collect()
    }


    /// Decodes a base58 string into a byte vector.
    /// DOES NOT remove the checksum or version prefix if present.
    ///
    /// Surrounding whitespace is ignored, anything after inner whitespace is rejected.
    pub fn decode(encoded: &str) -> Result<Vec<u8>, Base58Error> {
        let source = encoded.trim_start();
        let offset = encoded.len() - source.len();
        let body_len = source.find(char::is_whitespace).unwrap_or(source.len());
        let (body, rest) = source.split_at(body_len);
        if !rest.trim().is_empty() {
            let pos = offset + body_len + (rest.len() - rest.trim_start().len());
            return Err(Base58Error::CharAfterSpace(pos));
        }

        //Leading '1's are leading zero bytes
        let zeroes = body.bytes().take_while(|x| *x == b'1').count();

        //Big endian base256 digits, log(58)/log(256) rounded up
        let mut b256: Vec<u8> = vec![0; body.len() * 733 / 1000 + 1];
        for ch in body.chars().skip(zeroes) {
            let value = if ch.is_ascii() { MAP_BASE58[ch as usize] } else { -1 };
            if value < 0 { return Err(Base58Error::BadChar(ch)) }

            let mut carry = value as u32;
            for digit in b256.iter_mut().rev() {
                carry += 58 * (*digit as u32);
                *digit = (carry % 256) as u8;
                carry /= 256;
            }
        }

        let significant = b256.iter().skip_while(|x| **x == 0);
        let mut result = vec![0u8; zeroes];
        result.extend(significant);

        Ok(result)
    }

    /// Checks if a base58 check encoded string is valid
    pub fn validate_checksum(encoded: &str) -> Result<bool, Base58Error> {
        let bytes = Base58::decode(encoded)?;
        if bytes.len() < 4 { return Err(Base58Error::TooShort) }

        let split = bytes.len() - 4;
        Ok(hash::sha256d(&bytes[..split])[0..4] == bytes[split..])
    }

    /// Returns the decoded payload with the checksum removed.
    /// Version prefix is NOT removed as it is variable length depending on context.
    pub fn check_decode(encoded: &str) -> Result<Vec<u8>, Base58Error> {
        let mut bytes = Base58::decode(encoded)?;
        if bytes.len() < 4 { return Err(Base58Error::TooShort) }

        let split = bytes.len() - 4;
        if hash::sha256d(&bytes[..split])[0..4] != bytes[split..] {
            return Err(Base58Error::BadChecksum);
        }
        bytes.truncate(split);
        Ok(bytes)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::decode_02x;


    #[test]
    /// Sourced from https://tools.ietf.org/id/draft-msporny-base58-01.html
    fn base58_ietf_test_vectors() {
        let hello_world = b"Hello World!";
        let fox = b"The quick brown fox jumps over the lazy dog.";
        let int = [0x00, 0x00, 0x28, 0x7f, 0xb4, 0xcd];

        assert_eq!(Base58::new(None, hello_world).encode(), "2NEpo7TZRRrLZSi2U");
        assert_eq!(Base58::new(None, fox).encode(), "USm3fpXnKG5EUBx2ndxBDMPVciP5hGey2Jh4NDv6gmeo1LkMeiKrLJUUBk6Z");
        assert_eq!(Base58::new(None, &int).encode(), "11233QC4");
        assert_eq!(Base58::decode("11233QC4").unwrap(), int.to_vec());
    }

    #[test]
    /// Sourced from the Bitcoin Core repository (src/test/data/base58_encode_decode.json)
    fn base58_bitcoin_core_test_vectors() {
        let test_data: [(&str, &str); 13] = [
            ("", ""),
            ("61", "2g"),
            ("626262", "a3gV"),
            ("636363", "aPEr"),
            ("73696d706c792061206c6f6e6720737472696e67", "2cFupjhnEsSn59qHXstmK2ffpLv2"),
            ("00eb15231dfceb60925886b67d065299925915aeb172c06647", "1NS17iag9jJgTHD1VXjvLCEnZuQ3rJDE9L"),
            ("516b6fcd0f", "ABnLTmg"),
            ("bf4f89001e670274dd", "3SEo3LWLoPntC"),
            ("572e4794", "3EFU7m"),
            ("ecac89cad93923c02321", "EJDM8drfXA6uyA"),
            ("10c8511e", "Rt5zm"),
            ("00000000000000000000", "1111111111"),
            ("000111d38e5fc9071ffcd20b4a763cc9ae4f252bb4e48fd66a835e252ada93ff480d6dd43dc62a641155a5", "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz"),
        ];

        for case in test_data {
            let bytes = decode_02x(case.0).unwrap();
            assert_eq!(Base58::new(None, &bytes).encode(), case.1);
            assert_eq!(Base58::decode(case.1).unwrap(), bytes);
        }
    }

    #[test]
    fn base58_check_encode_decode() {
        let hash = decode_02x("0d2d8a0f3cbf6bc2c1d2f1b09dbc1df1a8c8a3b3").unwrap();
        let encoded = Base58::new(Some(VersionPrefix::BTCAddress), &hash).check_encode();
        let decoded = Base58::check_decode(&encoded).unwrap();

        assert_eq!(decoded[0], 0x00);
        assert_eq!(decoded[1..], hash[..]);
        assert!(Base58::validate_checksum(&encoded).unwrap());
    }

    #[test]
    fn base58_decode_errors() {
        assert_eq!(Base58::decode("3SEo3LWLoPn0C"), Err(Base58Error::BadChar('0')));
        assert_eq!(Base58::decode("3SEoé"), Err(Base58Error::BadChar('é')));
        assert_eq!(Base58::decode("  3SEo 3LW"), Err(Base58Error::CharAfterSpace(7)));
        assert_eq!(Base58::decode(" 3EFU7m \n").unwrap(), decode_02x("572e4794").unwrap());

        //Flip the last character of a valid address
        assert_eq!(Base58::check_decode("124ERAK4SqHMNWXycHPautn5zDYRKr3b2F"), Err(Base58Error::BadChecksum));
        assert_eq!(Base58::check_decode("2g"), Err(Base58Error::TooShort));
    }
}
