/*
    Decodes hex strings into a byte vector
*/
pub fn decode_02x(hex: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(hex.trim())
}

/*
    Encodes byte slices into hex string
*/
pub fn encode_02x(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/**
    Converts a slice into an array.
    Returns the length of the slice if it does not match N.
*/
pub fn try_into<T: Copy, const N: usize>(v: &[T]) -> Result<[T; N], usize> {
    v.try_into().map_err(|_| v.len())
}

//Converts a byte array to int
pub fn as_u32_be(array: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*array)
}

/**
    Bitcoin's variable length integer (CompactSize) encoding.
    Used to prefix scripts and count inputs, outputs and witness items.
*/
pub fn compact_size(n: u64) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut v = vec![0xfd];
            v.extend_from_slice(&(n as u16).to_le_bytes());
            v
        },
        0x10000..=0xffff_ffff => {
            let mut v = vec![0xfe];
            v.extend_from_slice(&(n as u32).to_le_bytes());
            v
        },
        _ => {
            let mut v = vec![0xff];
            v.extend_from_slice(&n.to_le_bytes());
            v
        }
    }
}

/// Prefixes data with its CompactSize length
pub fn prefix_compact_size(data: &[u8]) -> Vec<u8> {
    let mut v = compact_size(data.len() as u64);
    v.extend_from_slice(data);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let bytes = decode_02x("00ff10ab").unwrap();
        assert_eq!(bytes, vec![0x00, 0xff, 0x10, 0xab]);
        assert_eq!(encode_02x(&bytes), "00ff10ab");
        assert!(decode_02x("zz").is_err());
    }

    #[test]
    fn slice_to_array() {
        let arr: [u8; 4] = try_into(&[1, 2, 3, 4]).unwrap();
        assert_eq!(as_u32_be(&arr), 0x01020304);
        assert_eq!(try_into::<u8, 4>(&[1, 2, 3]), Err(3));
    }

    #[test]
    fn compact_size_boundaries() {
        assert_eq!(compact_size(0), vec![0x00]);
        assert_eq!(compact_size(0xfc), vec![0xfc]);
        assert_eq!(compact_size(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(compact_size(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(compact_size(0x1_0000_0000), vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0]);
    }
}
