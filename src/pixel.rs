//! The 4-byte BGRA pixel record, its little-endian u32 packing, the 16 TLG6
//! color-space transformers, and the 2 TLG6 spatial filters.
//!
//! Grounded on `ext/pixel.h`'s `Pixel` struct (referenced but not included in
//! the retrieved source) and the `tlg6_transformer*`/`tlg6_filter_*`
//! functions in `ext/tlg6.c`, which this module reproduces bit-for-bit.

use bytemuck::{Pod, Zeroable};

/// A single BGRA sample. Layout is bit-exact with a little-endian 32-bit
/// BGRA word: `u32::from(pixel) == b | g<<8 | r<<16 | a<<24`.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Pod, Zeroable)]
pub struct Pixel {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Pixel {
    pub const ZERO: Pixel = Pixel {
        b: 0,
        g: 0,
        r: 0,
        a: 0,
    };

    #[inline(always)]
    pub fn to_bgra_u32(self) -> u32 {
        u32::from_le_bytes([self.b, self.g, self.r, self.a])
    }

    #[inline(always)]
    pub fn from_bgra_u32(word: u32) -> Self {
        let [b, g, r, a] = word.to_le_bytes();
        Pixel { b, g, r, a }
    }

    /// Validate that a `Vec<Pixel>` of `count` elements can be allocated
    /// without panicking. `count * size_of::<Pixel>()` can clear `usize`'s
    /// range yet still exceed `isize::MAX`, the real ceiling the global
    /// allocator enforces (`vec![Pixel::ZERO; count]` aborts with "capacity
    /// overflow" rather than returning an error in that case), so both the
    /// `usize` multiplication and the `isize::MAX` bound are checked here.
    pub fn checked_buffer_len(count: usize) -> crate::error::Result<usize> {
        let bytes = count
            .checked_mul(std::mem::size_of::<Pixel>())
            .ok_or(crate::error::Error::Corrupt)?;
        if bytes > isize::MAX as usize {
            return Err(crate::error::Error::Corrupt);
        }
        Ok(bytes)
    }

    /// Componentwise wrapping add, used by both TLG5's row/column prefix
    /// sums and TLG6's encoder-side differencing.
    #[inline(always)]
    pub fn wrapping_add(self, other: Pixel) -> Pixel {
        Pixel {
            b: self.b.wrapping_add(other.b),
            g: self.g.wrapping_add(other.g),
            r: self.r.wrapping_add(other.r),
            a: self.a.wrapping_add(other.a),
        }
    }

    #[inline(always)]
    pub fn wrapping_sub(self, other: Pixel) -> Pixel {
        Pixel {
            b: self.b.wrapping_sub(other.b),
            g: self.g.wrapping_sub(other.g),
            r: self.r.wrapping_sub(other.r),
            a: self.a.wrapping_sub(other.a),
        }
    }
}

/// Apply TLG6 color transformer `index` (0..=15) to `p`, in place. These are
/// the inverses of the encoder-side per-pixel channel differencing and must
/// match the original `tlg6_transformer0..F` bit-for-bit, including the
/// `<< 1` in transformer 0xF (not a typo: green's doubled contribution is
/// part of the on-wire contract).
#[inline]
pub fn apply_transformer(index: u8, p: &mut Pixel) {
    match index {
        0x0 => {}
        0x1 => {
            p.r = p.r.wrapping_add(p.g);
            p.b = p.b.wrapping_add(p.g);
        }
        0x2 => {
            p.g = p.g.wrapping_add(p.b);
            p.r = p.r.wrapping_add(p.g);
        }
        0x3 => {
            p.g = p.g.wrapping_add(p.r);
            p.b = p.b.wrapping_add(p.g);
        }
        0x4 => {
            p.b = p.b.wrapping_add(p.r);
            p.g = p.g.wrapping_add(p.b);
            p.r = p.r.wrapping_add(p.g);
        }
        0x5 => {
            p.b = p.b.wrapping_add(p.r);
            p.g = p.g.wrapping_add(p.b);
        }
        0x6 => {
            p.b = p.b.wrapping_add(p.g);
        }
        0x7 => {
            p.g = p.g.wrapping_add(p.b);
        }
        0x8 => {
            p.r = p.r.wrapping_add(p.g);
        }
        0x9 => {
            p.r = p.r.wrapping_add(p.b);
            p.g = p.g.wrapping_add(p.r);
            p.b = p.b.wrapping_add(p.g);
        }
        0xA => {
            p.b = p.b.wrapping_add(p.r);
            p.g = p.g.wrapping_add(p.r);
        }
        0xB => {
            p.r = p.r.wrapping_add(p.b);
            p.g = p.g.wrapping_add(p.b);
        }
        0xC => {
            p.r = p.r.wrapping_add(p.b);
            p.g = p.g.wrapping_add(p.r);
        }
        0xD => {
            p.b = p.b.wrapping_add(p.g);
            p.r = p.r.wrapping_add(p.b);
            p.g = p.g.wrapping_add(p.r);
        }
        0xE => {
            p.g = p.g.wrapping_add(p.r);
            p.b = p.b.wrapping_add(p.g);
            p.r = p.r.wrapping_add(p.b);
        }
        0xF => {
            p.g = p.g.wrapping_add(p.b.wrapping_shl(1));
            p.r = p.r.wrapping_add(p.b.wrapping_shl(1));
        }
        _ => unreachable!("transformer index is always derived from a 4-bit field"),
    }
}

/// The inverse of [`apply_transformer`], used by the TLG5-style "what would
/// the encoder have subtracted" direction is not needed for TLG6 (the
/// encoder side of TLG6 is out of this crate's scope — only TLG6 decoding is
/// required), but is provided for completeness and tested against
/// [`apply_transformer`] as its mathematical inverse mod 256.
#[inline]
pub fn unapply_transformer(index: u8, p: &mut Pixel) {
    match index {
        0x0 => {}
        0x1 => {
            p.b = p.b.wrapping_sub(p.g);
            p.r = p.r.wrapping_sub(p.g);
        }
        0x2 => {
            p.r = p.r.wrapping_sub(p.g);
            p.g = p.g.wrapping_sub(p.b);
        }
        0x3 => {
            p.b = p.b.wrapping_sub(p.g);
            p.g = p.g.wrapping_sub(p.r);
        }
        0x4 => {
            p.r = p.r.wrapping_sub(p.g);
            p.g = p.g.wrapping_sub(p.b);
            p.b = p.b.wrapping_sub(p.r);
        }
        0x5 => {
            p.g = p.g.wrapping_sub(p.b);
            p.b = p.b.wrapping_sub(p.r);
        }
        0x6 => {
            p.b = p.b.wrapping_sub(p.g);
        }
        0x7 => {
            p.g = p.g.wrapping_sub(p.b);
        }
        0x8 => {
            p.r = p.r.wrapping_sub(p.g);
        }
        0x9 => {
            p.b = p.b.wrapping_sub(p.g);
            p.g = p.g.wrapping_sub(p.r);
            p.r = p.r.wrapping_sub(p.b);
        }
        0xA => {
            p.g = p.g.wrapping_sub(p.r);
            p.b = p.b.wrapping_sub(p.r);
        }
        0xB => {
            p.g = p.g.wrapping_sub(p.b);
            p.r = p.r.wrapping_sub(p.b);
        }
        0xC => {
            p.g = p.g.wrapping_sub(p.r);
            p.r = p.r.wrapping_sub(p.b);
        }
        0xD => {
            p.g = p.g.wrapping_sub(p.r);
            p.r = p.r.wrapping_sub(p.b);
            p.b = p.b.wrapping_sub(p.g);
        }
        0xE => {
            p.r = p.r.wrapping_sub(p.b);
            p.b = p.b.wrapping_sub(p.g);
            p.g = p.g.wrapping_sub(p.r);
        }
        0xF => {
            p.r = p.r.wrapping_sub(p.b.wrapping_shl(1));
            p.g = p.g.wrapping_sub(p.b.wrapping_shl(1));
        }
        _ => unreachable!("transformer index is always derived from a 4-bit field"),
    }
}

/// Byte-parallel "greater than" mask used by [`filter_med`]: for each of the
/// four byte lanes of `a` and `b`, produces `0xFF` if that lane of `a` is
/// greater than the corresponding lane of `b`, else `0x00`. Never lets a
/// carry cross a lane boundary.
#[inline(always)]
fn make_gt_mask(a: u32, b: u32) -> u32 {
    let tmp2 = !b;
    let tmp = (a & tmp2).wrapping_add(((a ^ tmp2) >> 1) & 0x7F7F_7F7F) & 0x8080_8080;
    ((tmp >> 7).wrapping_add(0x7F7F_7F7F)) ^ 0x7F7F_7F7F
}

/// Byte-parallel addition of `a` and `b` with no carry propagation between
/// the four lanes (each lane wraps mod 256 independently).
#[inline(always)]
fn packed_bytes_add(a: u32, b: u32) -> u32 {
    a.wrapping_add(b)
        .wrapping_sub((((a & b) << 1).wrapping_add((a ^ b) & 0xFEFE_FEFE)) & 0x0101_0100)
}

/// MED predictor, byte-parallel across all four BGRA lanes: for each lane,
/// picks `a`, `b`, or `a + b - c` depending on the ordering of `(a, b, c)`
/// (`min(a,b) <= c <= max(a,b)` picks the third option), then adds residual
/// `v` with no cross-lane carry.
#[inline]
pub fn filter_med(a: u32, b: u32, c: u32, v: u32) -> u32 {
    let aa_gt_bb = make_gt_mask(a, b);
    let a_xor_b_and_aa_gt_bb = (a ^ b) & aa_gt_bb;
    let aa = a_xor_b_and_aa_gt_bb ^ a;
    let bb = a_xor_b_and_aa_gt_bb ^ b;
    let n = make_gt_mask(c, bb);
    let nn = make_gt_mask(aa, c);
    let m = !(n | nn);
    let predicted = (n & aa) | (nn & bb) | ((bb & m).wrapping_sub(c & m).wrapping_add(aa & m));
    packed_bytes_add(predicted, v)
}

/// Byte-parallel average of `a` and `b`, plus residual `v`.
#[inline]
pub fn filter_avg(a: u32, b: u32, c: u32, v: u32) -> u32 {
    let _ = c;
    let predicted = (a & b).wrapping_add(((a ^ b) & 0xFEFE_FEFE) >> 1).wrapping_add((a ^ b) & 0x0101_0101);
    packed_bytes_add(predicted, v)
}

/// Selects [`filter_med`] or [`filter_avg`] by the filter-type plane's low
/// bit (`0` = MED, `1` = AVG).
pub type SpatialFilter = fn(u32, u32, u32, u32) -> u32;

#[inline]
pub fn select_filter(filter_bit: u8) -> SpatialFilter {
    if filter_bit & 1 == 0 {
        filter_med
    } else {
        filter_avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_packs_as_little_endian_bgra() {
        let p = Pixel {
            b: 0x10,
            g: 0x20,
            r: 0x30,
            a: 0x40,
        };
        assert_eq!(p.to_bgra_u32(), 0x4030_2010);
        assert_eq!(Pixel::from_bgra_u32(0x4030_2010), p);
    }

    #[test]
    fn every_transformer_round_trips() {
        let samples = [
            Pixel {
                b: 10,
                g: 200,
                r: 37,
                a: 255,
            },
            Pixel {
                b: 0,
                g: 0,
                r: 0,
                a: 0,
            },
            Pixel {
                b: 255,
                g: 255,
                r: 255,
                a: 128,
            },
            Pixel {
                b: 1,
                g: 254,
                r: 77,
                a: 9,
            },
        ];
        for index in 0u8..16 {
            for &original in &samples {
                let mut p = original;
                apply_transformer(index, &mut p);
                unapply_transformer(index, &mut p);
                assert_eq!(p, original, "transformer {index:#x} did not invert");
            }
        }
    }

    #[test]
    fn filters_are_identity_shaped_at_zero_residual() {
        // a == b == c: MED and AVG should both reproduce that shared value
        // for every lane when the residual is zero.
        let shared = Pixel {
            b: 5,
            g: 5,
            r: 5,
            a: 5,
        }
        .to_bgra_u32();
        assert_eq!(filter_med(shared, shared, shared, 0), shared);
        assert_eq!(filter_avg(shared, shared, shared, 0), shared);
    }

    #[test]
    fn filter_med_matches_scalar_med_per_lane() {
        let a = Pixel {
            b: 10,
            g: 200,
            r: 3,
            a: 0,
        };
        let b = Pixel {
            b: 50,
            g: 20,
            r: 250,
            a: 0,
        };
        let c = Pixel {
            b: 30,
            g: 210,
            r: 4,
            a: 0,
        };
        let result = Pixel::from_bgra_u32(filter_med(
            a.to_bgra_u32(),
            b.to_bgra_u32(),
            c.to_bgra_u32(),
            0,
        ));
        let scalar_med = |av: u8, bv: u8, cv: u8| -> u8 {
            let (lo, hi) = if av < bv { (av, bv) } else { (bv, av) };
            if cv <= lo {
                hi
            } else if cv >= hi {
                lo
            } else {
                av.wrapping_add(bv).wrapping_sub(cv)
            }
        };
        assert_eq!(result.b, scalar_med(a.b, b.b, c.b));
        assert_eq!(result.g, scalar_med(a.g, b.g, c.g));
        assert_eq!(result.r, scalar_med(a.r, b.r, c.r));
    }
}
