use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

/**
    Fills a buffer of the given size from the operating system's CSPRNG.
    OsRng holds no state, so concurrent callers need no synchronisation.
*/
pub fn random_bytes(size: usize) -> Result<Zeroizing<Vec<u8>>, rand::Error> {
    let mut bytes = Zeroizing::new(vec![0u8; size]);
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_have_requested_length() {
        for size in [16, 20, 24, 28, 32] {
            assert_eq!(random_bytes(size).unwrap().len(), size);
        }
        assert_ne!(*random_bytes(32).unwrap(), *random_bytes(32).unwrap());
    }
}
