//! Encoder and decoder for the TLG5 and TLG6 lossless image formats.
//!
//! TLG5 supports both decoding and encoding; TLG6 decoding only, matching
//! the scope of the original extension this crate is grounded on (its
//! `encode_tlg6` was never exposed to callers either). See `tlg5` and `tlg6`
//! for the format-specific pipelines, `lzss` for the shared compression
//! engine, `stream` for the byte-cursor primitives, and `pixel` for the BGRA
//! sample type, color transformers and spatial filters TLG6 builds on.
#![forbid(unsafe_code)]

mod error;
mod lzss;
mod pixel;
mod stream;
mod tlg5;
mod tlg6;

pub use error::{Error, Result};
pub use pixel::Pixel;

use stream::Reader;

/// Decode a TLG5 image, returning `(width, height, bgra)` where `bgra` is
/// `width * height * 4` bytes, 4 bytes per pixel in B, G, R, A order.
pub fn decode_tlg5(input: &[u8]) -> Result<(u32, u32, Vec<u8>)> {
    if input.len() < tlg5::MAGIC.len() || &input[..tlg5::MAGIC.len()] != tlg5::MAGIC.as_slice() {
        return Err(Error::InvalidMagic);
    }
    let mut r = Reader::new(&input[tlg5::MAGIC.len()..]);
    tlg5::decode(&mut r)
}

/// Decode a TLG6 image, returning `(width, height, bgra)` in the same layout
/// as [`decode_tlg5`].
pub fn decode_tlg6(input: &[u8]) -> Result<(u32, u32, Vec<u8>)> {
    if input.len() < tlg6::MAGIC.len() || &input[..tlg6::MAGIC.len()] != tlg6::MAGIC.as_slice() {
        return Err(Error::InvalidMagic);
    }
    let mut r = Reader::new(&input[tlg6::MAGIC.len()..]);
    tlg6::decode(&mut r)
}

/// Encode a raw BGRA buffer (4 bytes per pixel, B, G, R, A order) as TLG5.
///
/// There is no `encode_tlg6`: TLG6 encoding is outside this crate's scope
/// (see the module docs above).
pub fn encode_tlg5(width: u32, height: u32, bgra: &[u8]) -> Result<Vec<u8>> {
    tlg5::encode(width, height, bgra)
}

/// Decode either a TLG5 or TLG6 image by sniffing its leading magic bytes.
///
/// This dispatcher is not part of the distilled wire format itself; it is
/// an ergonomics addition for callers that accept either variant without
/// knowing which one in advance.
pub fn decode_tlg(input: &[u8]) -> Result<(u32, u32, Vec<u8>)> {
    if input.starts_with(tlg5::MAGIC.as_slice()) {
        decode_tlg5(input)
    } else if input.starts_with(tlg6::MAGIC.as_slice()) {
        decode_tlg6(input)
    } else {
        Err(Error::InvalidMagic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_tlg5_rejects_bad_magic() {
        let input = [0u8; 16];
        assert_eq!(decode_tlg5(&input).unwrap_err(), Error::InvalidMagic);
    }

    #[test]
    fn decode_tlg6_rejects_bad_magic() {
        let input = [0u8; 16];
        assert_eq!(decode_tlg6(&input).unwrap_err(), Error::InvalidMagic);
    }

    #[test]
    fn decode_tlg_dispatches_on_magic_and_round_trips_tlg5() {
        let bgra = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let encoded = encode_tlg5(2, 1, &bgra).unwrap();
        let (w, h, decoded) = decode_tlg(&encoded).unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(decoded, bgra);
    }

    #[test]
    fn decode_tlg_rejects_unrecognized_input() {
        let input = b"not a tlg file at all!!";
        assert_eq!(decode_tlg(input).unwrap_err(), Error::InvalidMagic);
    }
}
