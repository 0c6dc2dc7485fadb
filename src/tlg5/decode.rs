use crate::error::{Error, Result};
use crate::lzss::{self, Dict};
use crate::pixel::Pixel;
use crate::stream::Reader;

use super::Header;

fn read_header(r: &mut Reader) -> Result<Header> {
    let channel_count = r.read_u8()?;
    let image_width = r.read_u32_le()?;
    let image_height = r.read_u32_le()?;
    let block_height = r.read_u32_le()?;
    if block_height == 0 {
        return Err(Error::Corrupt);
    }
    Ok(Header {
        channel_count,
        image_width,
        image_height,
        block_height,
    })
}

/// Read one (channel, block-row) plane: `mark(u8) | comp_size(u32 LE) |
/// payload(comp_size bytes)`, producing exactly `width * block_height` plane
/// bytes. `mark == 0` means the payload is LZSS-compressed against `dict`;
/// any other value means the payload is raw and must itself be exactly
/// `width * block_height` bytes (see SPEC_FULL.md §4.10 on why this is
/// validated rather than assumed).
fn read_plane(r: &mut Reader, plane_size: usize, dict: &mut Dict) -> Result<Vec<u8>> {
    let mark = r.read_u8()?;
    let comp_size = r.read_u32_le()? as usize;

    if mark == 0 {
        let payload = r.read_exact(comp_size)?;
        Ok(lzss::decompress(payload, plane_size, dict))
    } else {
        if comp_size != plane_size {
            return Err(Error::Corrupt);
        }
        Ok(r.read_exact(plane_size)?.to_vec())
    }
}

/// Reconstruct one band of rows `[band_y, band_y + rows_in_band)` from the
/// four decompressed channel planes into `output`, applying the column
/// prefix sum (against the row above, already reconstructed) and the row
/// prefix sum, in that order, with the `B += G; R += G` color un-transform
/// applied first.
fn reconstruct_band(
    output: &mut [Pixel],
    width: usize,
    band_y: usize,
    rows_in_band: usize,
    planes: &[Vec<u8>; 4],
    has_alpha: bool,
) {
    for row in 0..rows_in_band {
        let y = band_y + row;
        let row_offset = row * width;
        let mut prev = Pixel::ZERO;

        for x in 0..width {
            let idx = row_offset + x;
            let mut pixel = Pixel {
                b: planes[0][idx],
                g: planes[1][idx],
                r: planes[2][idx],
                a: if has_alpha { planes[3][idx] } else { 0xFF },
            };

            pixel.b = pixel.b.wrapping_add(pixel.g);
            pixel.r = pixel.r.wrapping_add(pixel.g);

            prev = prev.wrapping_add(pixel);

            let out_idx = y * width + x;
            let mut result = prev;
            if y > 0 {
                result = result.wrapping_add(output[out_idx - width]);
            }
            if !has_alpha {
                result.a = 0xFF;
            }
            output[out_idx] = result;
        }
    }
}

/// Decode a TLG5 frame (without the leading magic, already consumed by the
/// caller) into `(width, height, bgra)`.
pub fn decode(r: &mut Reader) -> Result<(u32, u32, Vec<u8>)> {
    let header = read_header(r)?;
    if header.channel_count != 3 && header.channel_count != 4 {
        return Err(Error::UnsupportedChannelCount);
    }

    let width = header.image_width as usize;
    let height = header.image_height as usize;
    let block_height = header.block_height as usize;

    let pixel_count = width.checked_mul(height).ok_or(Error::Corrupt)?;
    Pixel::checked_buffer_len(pixel_count)?;

    // Block-size index: seek hints only, opaque to the decoder.
    let block_count = header.block_count() as usize;
    r.skip(4 * block_count)?;

    let mut output = vec![Pixel::ZERO; pixel_count];
    let mut dict = Dict::zeroed();
    let has_alpha = header.channel_count == 4;

    let plane_size = width.checked_mul(block_height).ok_or(Error::Corrupt)?;

    let mut band_y = 0usize;
    while band_y < height {
        let rows_in_band = block_height.min(height - band_y);

        let mut planes: [Vec<u8>; 4] = Default::default();
        for plane in planes.iter_mut().take(header.channel_count as usize) {
            *plane = read_plane(r, plane_size, &mut dict)?;
        }

        reconstruct_band(&mut output, width, band_y, rows_in_band, &planes, has_alpha);

        band_y += block_height;
    }

    let bytes = bytemuck::cast_slice(&output).to_vec();
    Ok((header.image_width, header.image_height, bytes))
}
