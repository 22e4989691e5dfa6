/*
    Elliptic curve primitive layer over secp256k1.

    All arithmetic is delegated to libsecp256k1 which is constant time
    with respect to secret scalars. A single Context is built once and
    shared by reference (or Arc) between every derivation and signing call.
*/

use secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EcError {
    #[error("scalar is zero or not below the curve order")]
    InvalidScalar,
    #[error("bytes do not encode a point on secp256k1")]
    InvalidPoint
}

/// Read only secp256k1 context. Send + Sync, cheap to share.
#[derive(Debug, Clone)]
pub struct Context {
    secp: Secp256k1<All>
}

impl Context {
    pub fn new() -> Self {
        Self { secp: Secp256k1::new() }
    }

    /// Access to the underlying context for signing and verification
    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    /**
        Multiplies the generator by a scalar.
        k * G
    */
    pub fn scalar_to_point(&self, scalar: &[u8; 32]) -> Result<PublicKey, EcError> {
        let k = parse_scalar(scalar)?;
        Ok(PublicKey::from_secret_key(&self.secp, &k))
    }

    /**
        P + Q
        Fails with InvalidPoint if the sum is the point at infinity.
    */
    pub fn point_add(&self, p: &PublicKey, q: &PublicKey) -> Result<PublicKey, EcError> {
        p.combine(q).map_err(|_| EcError::InvalidPoint)
    }

    /**
        k * P
    */
    pub fn scalar_mul(&self, p: &PublicKey, k: &[u8; 32]) -> Result<PublicKey, EcError> {
        let k = tweak_scalar(k)?;
        p.mul_tweak(&self.secp, &k).map_err(|_| EcError::InvalidScalar)
    }

    /**
        P + t * G
        Used by public child key derivation and taproot output keys.
    */
    pub fn tweak_add_point(&self, p: &PublicKey, tweak: &[u8; 32]) -> Result<PublicKey, EcError> {
        let t = Scalar::from_be_bytes(*tweak).map_err(|_| EcError::InvalidScalar)?;
        p.add_exp_tweak(&self.secp, &t).map_err(|_| EcError::InvalidPoint)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// True if the bytes are a 32 byte scalar in [1, n-1]
pub fn is_valid_scalar(bytes: &[u8]) -> bool {
    bytes.len() == 32 && SecretKey::from_slice(bytes).is_ok()
}

/// Parses a private scalar, rejecting zero and values >= n
pub fn parse_scalar(bytes: &[u8]) -> Result<SecretKey, EcError> {
    SecretKey::from_slice(bytes).map_err(|_| EcError::InvalidScalar)
}

/// Parses a compressed (33 byte) or uncompressed (65 byte) point
pub fn parse_point(bytes: &[u8]) -> Result<PublicKey, EcError> {
    PublicKey::from_slice(bytes).map_err(|_| EcError::InvalidPoint)
}

/**
    Adds a tweak to a private scalar.
    (k + t) mod n
    Fails if t >= n or the result is zero.
*/
pub fn scalar_add(k: &SecretKey, tweak: &[u8; 32]) -> Result<SecretKey, EcError> {
    let t = Scalar::from_be_bytes(*tweak).map_err(|_| EcError::InvalidScalar)?;
    k.add_tweak(&t).map_err(|_| EcError::InvalidScalar)
}

//Multiplicative tweaks must be non zero and below the order
fn tweak_scalar(k: &[u8; 32]) -> Result<Scalar, EcError> {
    if !is_valid_scalar(k) { return Err(EcError::InvalidScalar) }
    Scalar::from_be_bytes(*k).map_err(|_| EcError::InvalidScalar)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
    const G: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const TWO_G: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    fn scalar(n: u8) -> [u8; 32] {
        let mut k = [0u8; 32];
        k[31] = n;
        k
    }

    #[test]
    fn scalar_validation() {
        assert!(!is_valid_scalar(&[0u8; 32]));
        assert!(is_valid_scalar(&scalar(1)));
        assert!(!is_valid_scalar(&hex::decode(ORDER).unwrap()));
        assert!(!is_valid_scalar(&[1u8; 31]));

        let ctx = Context::new();
        assert_eq!(ctx.scalar_to_point(&[0u8; 32]), Err(EcError::InvalidScalar));
    }

    #[test]
    fn generator_arithmetic() {
        let ctx = Context::new();
        let g = ctx.scalar_to_point(&scalar(1)).unwrap();
        assert_eq!(hex::encode(g.serialize()), G);

        let two_g = ctx.point_add(&g, &g).unwrap();
        assert_eq!(hex::encode(two_g.serialize()), TWO_G);
        assert_eq!(ctx.scalar_mul(&g, &scalar(2)).unwrap(), two_g);
        assert_eq!(ctx.scalar_to_point(&scalar(2)).unwrap(), two_g);
        assert_eq!(ctx.tweak_add_point(&g, &scalar(1)).unwrap(), two_g);
    }

    #[test]
    fn point_at_infinity_is_rejected() {
        let ctx = Context::new();
        let g = ctx.scalar_to_point(&scalar(1)).unwrap();
        assert_eq!(ctx.point_add(&g, &g.negate(ctx.secp())), Err(EcError::InvalidPoint));
    }

    #[test]
    fn point_parsing() {
        assert!(parse_point(&hex::decode(G).unwrap()).is_ok());
        //x coordinate with no matching y on the curve
        let mut bad = [0u8; 33];
        bad[0] = 0x02;
        bad[32] = 0x05;
        assert_eq!(parse_point(&bad), Err(EcError::InvalidPoint));
    }

    #[test]
    fn scalar_addition() {
        let one = parse_scalar(&scalar(1)).unwrap();
        assert_eq!(scalar_add(&one, &scalar(1)).unwrap().secret_bytes(), scalar(2));

        //n - 1 + 1 = 0 mod n
        let mut n_minus_one: [u8; 32] = crate::util::try_into(&hex::decode(ORDER).unwrap()).unwrap();
        n_minus_one[31] -= 1;
        assert_eq!(scalar_add(&one, &n_minus_one), Err(EcError::InvalidScalar));
    }
}
