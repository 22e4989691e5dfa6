/*
    Hash module includes the hash functions needed to turn
    keys and scripts into addresses, derive child keys and
    compute taproot commitments.
*/

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

/*
    Takes in a byte array and returns the ripemd160 hash of it
*/
pub fn ripemd160<T>(input: T) -> [u8; 20]
where T: AsRef<[u8]>
{
    let mut r = Ripemd160::new();
    r.update(input);
    r.finalize().into()
}

/*
    Takes in a byte array and returns the sha256 hash of it
*/
pub fn sha256<T>(input: T) -> [u8; 32]
where T: AsRef<[u8]>
{
    let mut r = Sha256::new();
    r.update(input);
    r.finalize().into()
}

/// Sha256 applied twice. Used for Base58 checksums, txids and legacy/segwit v0 sighashes.
pub fn sha256d<T>(input: T) -> [u8; 32]
where T: AsRef<[u8]>
{
    sha256(sha256(input))
}

/// Ripemd160(Sha256(data))
pub fn hash160<T>(input: T) -> [u8; 20]
where T: AsRef<[u8]>
{
    ripemd160(sha256(input))
}

/**
    HMAC-SHA512 of data keyed with key.
    Used for BIP32 master key generation and child key derivation.
*/
pub fn hmac_sha512<T, K>(data: T, key: K) -> [u8; 64]
where T: AsRef<[u8]>, K: AsRef<[u8]>
{
    let mut mac = Hmac::<Sha512>::new_from_slice(key.as_ref())
        .expect("HMAC accepts keys of any length");
    mac.update(data.as_ref());

    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/**
    BIP340 tagged hash:
    sha256( sha256(tag) || sha256(tag) || data )
*/
pub fn tagged_hash<T>(tag: &str, data: T) -> [u8; 32]
where T: AsRef<[u8]>
{
    let tag_hash = sha256(tag.as_bytes());
    let mut r = Sha256::new();
    r.update(tag_hash);
    r.update(tag_hash);
    r.update(data);
    r.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash160_of_pubkey() {
        let pubkey = hex::decode("0204664c60ceabd82967055ccbd0f56a1585dfbd42032656efa501c463b16fbdfe").unwrap();
        let address_payload = crate::encoding::base58::Base58::check_decode("124ERAK4SqHMNWXycHPautn5zDYRKr3b2E").unwrap();

        assert_eq!(hash160(&pubkey).to_vec(), address_payload[1..].to_vec());
    }

    #[test]
    fn hmac_sha512_rfc4231_case_2() {
        let mac = hmac_sha512(b"what do ya want for nothing?", b"Jefe");
        assert_eq!(
            hex::encode(mac),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea2505549758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }
}
