//! The TLG6 filter-type plane: one byte per 8x8 image block, selecting a
//! spatial filter and a color transformer, itself LZSS-compressed against a
//! fixed, non-zero seed dictionary.
//!
//! Grounded on `tlg6_ft_read` in `ext/tlg6.c`.

use crate::error::Error;
use crate::lzss::{self, Dict, DICT_SIZE};
use crate::stream::Reader;

/// The seed dictionary: for `i` in `0..32`, for `j` in `0..16`, four bytes of
/// `i` followed by four bytes of `j`, repeated to fill all 4096 bytes.
fn seeded_dict() -> Dict {
    let mut bytes = [0u8; DICT_SIZE];
    let mut pos = 0usize;
    for i in 0u8..32 {
        for j in 0u8..16 {
            for _ in 0..4 {
                bytes[pos] = i;
                pos += 1;
            }
            for _ in 0..4 {
                bytes[pos] = j;
                pos += 1;
            }
        }
    }
    debug_assert_eq!(pos, DICT_SIZE);
    Dict { bytes, pos: 0 }
}

/// Read and LZSS-decode the filter-type plane: `ft_comp_size(u32 LE) |
/// payload`, producing `x_block_count * y_block_count` bytes.
pub fn read(r: &mut Reader, x_block_count: usize, y_block_count: usize) -> crate::error::Result<Vec<u8>> {
    let comp_size = r.read_u32_le()? as usize;
    let payload = r.read_exact(comp_size)?;
    let plane_size = x_block_count.checked_mul(y_block_count).ok_or(Error::Corrupt)?;
    let mut dict = seeded_dict();
    Ok(lzss::decompress(payload, plane_size, &mut dict))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_pattern_matches_definition() {
        let dict = seeded_dict();
        // first 8 bytes: four 0s then four 0s (i=0, j=0)
        assert_eq!(&dict.bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 0]);
        // next 8 bytes: i=0, j=1
        assert_eq!(&dict.bytes[8..16], &[0, 0, 0, 0, 1, 1, 1, 1]);
        // the 16th group (i=1, j=0) starts at byte 16*8=128
        assert_eq!(&dict.bytes[128..136], &[1, 1, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn empty_payload_yields_zero_bytes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes()); // comp_size = 0
        let mut r = Reader::new(&bytes);
        let plane = read(&mut r, 0, 0).unwrap();
        assert!(plane.is_empty());
    }

    #[test]
    fn single_literal_byte_reproduces_itself() {
        // control byte 0 (literal), one literal token, 0xAB.
        let payload = [0x00u8, 0xAB];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        let mut r = Reader::new(&bytes);
        let plane = read(&mut r, 1, 1).unwrap();
        assert_eq!(plane, vec![0xAB]);
    }
}
