use crate::error::{Error, Result};
use crate::pixel::Pixel;
use crate::stream::Writer;

use super::Header;

/// Fixed band height used by this encoder, matching the original's default.
const BLOCK_HEIGHT: u32 = 16;

fn write_header(w: &mut Writer, header: &Header) {
    w.write_u8(header.channel_count);
    w.write_u32_le(header.image_width);
    w.write_u32_le(header.image_height);
    w.write_u32_le(header.block_height);
}

/// Invert one band's worth of reconstructed pixels into four per-channel
/// delta planes: subtract the pixel above (if any), then the running row
/// sum, then apply the inverse color transform (`B -= G; R -= G`).
fn differentiate_band(
    pixels: &[Pixel],
    width: usize,
    band_y: usize,
    rows_in_band: usize,
    planes: &mut [Vec<u8>; 4],
) {
    for row in 0..rows_in_band {
        let y = band_y + row;
        let row_offset = row * width;
        let mut prev = Pixel::ZERO;

        for x in 0..width {
            let idx = y * width + x;
            let mut pixel = pixels[idx];

            if y > 0 {
                pixel = pixel.wrapping_sub(pixels[idx - width]);
            }
            pixel = pixel.wrapping_sub(prev);
            prev = prev.wrapping_add(pixel);

            pixel.b = pixel.b.wrapping_sub(pixel.g);
            pixel.r = pixel.r.wrapping_sub(pixel.g);

            let plane_idx = row_offset + x;
            planes[0][plane_idx] = pixel.b;
            planes[1][plane_idx] = pixel.g;
            planes[2][plane_idx] = pixel.r;
            planes[3][plane_idx] = pixel.a;
        }
    }
}

/// Write one raw-mode block: `mark=1 | comp_size=len | payload`. The TLG5
/// encoder never emits LZSS-compressed blocks: the original's real LZSS
/// compressor made its own output stream unreadable by the consuming game,
/// so it always writes `mark = 1` (see `ext/tlg5.c`'s
/// `tlg5_block_info_write`, which disables the compressed branch with a
/// constant-false `if (0 && ...)`).
fn write_plane_raw(w: &mut Writer, plane: &[u8]) {
    w.write_u8(1);
    w.write_u32_le(plane.len() as u32);
    w.write_data(plane);
}

/// Encode a raw BGRA buffer as a TLG5 frame, always using 4 channels and raw
/// (uncompressed) blocks.
pub fn encode(width: u32, height: u32, bgra: &[u8]) -> Result<Vec<u8>> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or(Error::InvalidArgument)?;
    let expected_len = pixel_count.checked_mul(4).ok_or(Error::InvalidArgument)?;
    if bgra.len() != expected_len {
        return Err(Error::InvalidArgument);
    }

    let pixels: &[Pixel] = bytemuck::cast_slice(bgra);

    let header = Header {
        channel_count: 4,
        image_width: width,
        image_height: height,
        block_height: BLOCK_HEIGHT,
    };

    let mut w = Writer::new();
    w.write_data(super::MAGIC);
    write_header(&mut w, &header);

    let block_count = header.block_count() as usize;
    let block_sizes_offset = w.position();
    for _ in 0..block_count {
        w.write_u32_le(0);
    }

    let width_usize = width as usize;
    let height_usize = height as usize;
    let block_height = BLOCK_HEIGHT as usize;
    let plane_size = width_usize * block_height;

    let mut band_y = 0usize;
    let mut band_index = 0usize;
    while band_y < height_usize {
        let rows_in_band = block_height.min(height_usize - band_y);

        let mut planes: [Vec<u8>; 4] = [
            vec![0u8; plane_size],
            vec![0u8; plane_size],
            vec![0u8; plane_size],
            vec![0u8; plane_size],
        ];
        differentiate_band(pixels, width_usize, band_y, rows_in_band, &mut planes);

        let band_start = w.position();
        for plane in &planes {
            write_plane_raw(&mut w, plane);
        }
        let band_size = (w.position() - band_start) as u32;
        w.patch_u32_le(block_sizes_offset + 4 * band_index, band_size);

        band_y += block_height;
        band_index += 1;
    }

    Ok(w.into_bytes())
}
