//! Vector codec - f32 sequences as raw little-endian bytes
//!
//! Bit patterns survive a round trip unchanged, NaN payloads and infinities
//! included.

/// Bytes used per vector component
pub const BYTES_PER_COMPONENT: usize = std::mem::size_of::<f32>();

/// Append the encoding of `vector` to `out`
pub fn encode_into(vector: &[f32], out: &mut Vec<u8>) {
    out.reserve(vector.len() * BYTES_PER_COMPONENT);
    for component in vector {
        out.extend_from_slice(&component.to_le_bytes());
    }
}

/// Decode a byte block produced by [`encode_into`]
///
/// Returns `None` if the length is not a multiple of four.
pub fn decode(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % BYTES_PER_COMPONENT != 0 {
        return None;
    }

    let vector = bytes
        .chunks_exact(BYTES_PER_COMPONENT)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Some(vector)
}

/// Number of components a byte block decodes to
pub fn component_count(bytes: &[u8]) -> Option<usize> {
    if bytes.len() % BYTES_PER_COMPONENT == 0 {
        Some(bytes.len() / BYTES_PER_COMPONENT)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(vector: &[f32]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_into(vector, &mut out);
        out
    }

    #[test]
    fn test_encode_layout_is_little_endian() {
        let bytes = encode(&[1.0]);
        assert_eq!(bytes, 1.0f32.to_le_bytes().to_vec());
        assert_eq!(encode(&[1.0, 2.0, 3.0]).len(), 12);
    }

    #[test]
    fn test_decode_preserves_bit_patterns() {
        let quiet_nan = f32::from_bits(0x7fc0_0001);
        let input = [0.1f32, -0.0, f32::INFINITY, f32::NEG_INFINITY, quiet_nan, f32::MIN_POSITIVE];

        let output = decode(&encode(&input)).unwrap();

        let input_bits: Vec<u32> = input.iter().map(|f| f.to_bits()).collect();
        let output_bits: Vec<u32> = output.iter().map(|f| f.to_bits()).collect();
        assert_eq!(input_bits, output_bits);
    }

    #[test]
    fn test_decode_rejects_ragged_length() {
        assert!(decode(&[0u8; 7]).is_none());
        assert_eq!(component_count(&[0u8; 7]), None);
        assert_eq!(component_count(&[0u8; 8]), Some(2));
    }

    #[test]
    fn test_empty_vector() {
        assert!(encode(&[]).is_empty());
        assert_eq!(decode(&[]), Some(Vec::new()));
    }

    #[test]
    fn test_encode_into_appends() {
        let mut out = vec![0xAA];
        encode_into(&[2.5], &mut out);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], 0xAA);
        assert_eq!(decode(&out[1..]), Some(vec![2.5]));
    }
}
