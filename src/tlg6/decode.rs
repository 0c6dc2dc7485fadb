use crate::error::{Error, Result};
use crate::pixel::{apply_transformer, select_filter, Pixel};
use crate::stream::Reader;

use super::{filter_map, golomb, Header};

fn read_header(r: &mut Reader) -> Result<Header> {
    let channel_count = r.read_u8()?;
    let data_flags = r.read_u8()?;
    let color_type = r.read_u8()?;
    let external_golomb_table = r.read_u8()?;
    let image_width = r.read_u32_le()?;
    let image_height = r.read_u32_le()?;
    let max_bit_size = r.read_u32_le()?;
    Ok(Header::new(
        channel_count,
        data_flags,
        color_type,
        external_golomb_table,
        image_width,
        image_height,
        max_bit_size,
    ))
}

/// Decode one line's worth of samples out of the block-major `block_data`
/// sample buffer into `current_line`, against the already-reconstructed
/// `prev_line` above it. `start_block..block_limit` is the span of x-blocks
/// this call is responsible for (the full-width blocks and the short tail
/// block are handled by two separate calls sharing the same `block_data`).
///
/// Ported bit-for-bit from `tlg6_decode_line` in `ext/tlg6.c`: `in_start`,
/// `skip_block_bytes` and `odd_skip` thread through the zig-zag pointer
/// arithmetic that converts the Golomb decoder's block-major sample order
/// back into row-major pixels.
#[allow(clippy::too_many_arguments)]
fn decode_line(
    prev_line: &[Pixel],
    current_line: &mut [Pixel],
    start_block: usize,
    block_limit: usize,
    filter_types: &[u8],
    skip_block_bytes: i64,
    block_data: &[Pixel],
    in_start: i64,
    odd_skip: i64,
    dir: i64,
    image_width: u32,
    channel_count: u8,
) {
    const W_BLOCK_SIZE: i64 = super::W_BLOCK_SIZE as i64;

    let mut prev_idx: i64 = (start_block as i64) * W_BLOCK_SIZE;
    let mut cur_idx: i64 = (start_block as i64) * W_BLOCK_SIZE;

    let (mut left, mut top_left) = if start_block != 0 {
        (
            current_line[(cur_idx - 1) as usize],
            prev_line[(prev_idx - 1) as usize],
        )
    } else {
        let edge_a = if channel_count == 3 { 0xFF } else { 0 };
        (
            Pixel { b: 0, g: 0, r: 0, a: edge_a },
            Pixel { b: 0, g: 0, r: 0, a: edge_a },
        )
    };

    let mut in_idx = in_start + skip_block_bytes * start_block as i64;
    let step: i64 = if dir & 1 != 0 { 1 } else { -1 };

    for i in start_block..block_limit {
        let mut w = image_width as i64 - (i as i64) * W_BLOCK_SIZE;
        if w > W_BLOCK_SIZE {
            w = W_BLOCK_SIZE;
        }
        let ww = w;

        if step == -1 {
            in_idx += ww - 1;
        }
        if i & 1 == 1 {
            in_idx += odd_skip * ww;
        }

        let filter = select_filter(filter_types[i] & 1);
        // Masked to 4 bits: only `bits[4..1]` of the filter-type byte carry
        // the transformer index (`bits[5..8]` are always zero in a
        // well-formed stream, but corrupt input shouldn't be able to index
        // past the 16 known transformers).
        let transformer_index = (filter_types[i] >> 1) & 0x0F;

        loop {
            let mut inn = block_data[in_idx as usize];
            apply_transformer(transformer_index, &mut inn);

            let top = prev_line[prev_idx as usize];
            let result_word = filter(
                left.to_bgra_u32(),
                top.to_bgra_u32(),
                top_left.to_bgra_u32(),
                inn.to_bgra_u32(),
            );
            let mut result = Pixel::from_bgra_u32(result_word);
            if channel_count == 3 {
                result.a = 0xFF;
            }
            left = result;
            top_left = top;
            current_line[cur_idx as usize] = left;

            prev_idx += 1;
            cur_idx += 1;
            in_idx += step;

            w -= 1;
            if w == 0 {
                break;
            }
        }

        in_idx += skip_block_bytes + if step == 1 { -ww } else { 1 };
        if i & 1 == 1 {
            in_idx -= odd_skip * ww;
        }
    }
}

/// Decode a TLG6 frame (without the leading magic, already consumed by the
/// caller) into `(width, height, bgra)`.
pub fn decode(r: &mut Reader) -> Result<(u32, u32, Vec<u8>)> {
    let header = read_header(r)?;
    if header.channel_count != 3 && header.channel_count != 4 {
        return Err(Error::UnsupportedChannelCount);
    }

    let width = header.image_width as usize;
    let height = header.image_height as usize;

    let filter_plane = filter_map::read(
        r,
        header.x_block_count as usize,
        header.y_block_count as usize,
    )?;

    let pixel_count_total = width.checked_mul(height).ok_or(Error::Corrupt)?;
    Pixel::checked_buffer_len(pixel_count_total)?;
    let mut image_data = vec![Pixel::ZERO; pixel_count_total];
    let zero_line = vec![Pixel::ZERO; width];

    let mut block_data_bytes = vec![0u8; width * super::H_BLOCK_SIZE as usize * 4];

    let main_count = (header.image_width / super::W_BLOCK_SIZE) as usize;
    let w_block_size = super::W_BLOCK_SIZE as usize;

    let mut prev_row: Vec<Pixel> = zero_line;

    let mut y = 0usize;
    while y < height {
        let ylim = (y + super::H_BLOCK_SIZE as usize).min(height);
        let rows_in_band = ylim - y;
        let pixel_count = rows_in_band * width;

        for c in 0..header.channel_count as usize {
            let bit_size = r.read_u32_le()?;
            let method = (bit_size >> 30) & 3;
            if method != 0 {
                return Err(Error::UnsupportedMethod);
            }
            let byte_size = ((bit_size & 0x3FFF_FFFF) as usize + 7) / 8;
            let bit_pool = r.read_exact(byte_size)?;
            golomb::decode_values(&mut block_data_bytes[c..], pixel_count, bit_pool);
        }

        let block_data: &[Pixel] = bytemuck::cast_slice(&block_data_bytes);

        let band_row = y / super::H_BLOCK_SIZE as usize;
        let ft_row_start = band_row * header.x_block_count as usize;
        let ft_row = &filter_plane[ft_row_start..ft_row_start + header.x_block_count as usize];
        let skip_bytes = (rows_in_band * w_block_size) as i64;

        for yy in y..ylim {
            let dir = ((yy & 1) ^ 1) as i64;
            let odd_skip = ((ylim - yy - 1) as i64) - ((yy - y) as i64);

            let mut current_line = vec![Pixel::ZERO; width];

            if main_count > 0 {
                let start = (width.min(w_block_size) * (yy - y)) as i64;
                decode_line(
                    &prev_row,
                    &mut current_line,
                    0,
                    main_count,
                    ft_row,
                    skip_bytes,
                    block_data,
                    start,
                    odd_skip,
                    dir,
                    header.image_width,
                    header.channel_count,
                );
            }

            if main_count != header.x_block_count as usize {
                let mut ww = width - main_count * w_block_size;
                if ww > w_block_size {
                    ww = w_block_size;
                }
                let start = (ww * (yy - y)) as i64;
                decode_line(
                    &prev_row,
                    &mut current_line,
                    main_count,
                    header.x_block_count as usize,
                    ft_row,
                    skip_bytes,
                    block_data,
                    start,
                    odd_skip,
                    dir,
                    header.image_width,
                    header.channel_count,
                );
            }

            image_data[yy * width..(yy + 1) * width].copy_from_slice(&current_line);
            prev_row = current_line;
        }

        y += super::H_BLOCK_SIZE as usize;
    }

    let bytes = bytemuck::cast_slice(&image_data).to_vec();
    Ok((header.image_width, header.image_height, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 1x1, single full-block, 3-channel image with an all-zero Golomb
    /// stream (every channel's residual run is zero) decodes to a black,
    /// opaque pixel: the zero run-length path and the filter/transformer
    /// identity case at a zero residual, with alpha forced to 0xFF since
    /// `channel_count == 3`.
    #[test]
    fn single_pixel_all_zero_residual_decodes_to_black() {
        let mut body = Vec::new();
        body.push(3u8); // channel_count
        body.push(0u8); // data_flags
        body.push(0u8); // color_type
        body.push(0u8); // external_golomb_table
        body.extend_from_slice(&1u32.to_le_bytes()); // width
        body.extend_from_slice(&1u32.to_le_bytes()); // height
        body.extend_from_slice(&0u32.to_le_bytes()); // max_bit_size (unused by decode)

        // filter-type plane: 1x1 blocks, one byte, filter index 0 (MED, transformer 0).
        let ft_payload = [0x00u8, 0x00u8];
        body.extend_from_slice(&(ft_payload.len() as u32).to_le_bytes());
        body.extend_from_slice(&ft_payload);

        // Three channels, each one byte with bit 0 clear (so `zero` seeds to
        // true) and bit 1 set (so the unary scan terminates immediately with
        // a run length of exactly 1, covering the whole 1-pixel band).
        for _ in 0..3 {
            let bits: u32 = 8; // byte_size = 1
            body.extend_from_slice(&bits.to_le_bytes());
            body.push(0b0000_0010);
        }

        let mut r = Reader::new(&body);
        let (w, h, pixels) = decode(&mut r).unwrap();
        assert_eq!((w, h), (1, 1));
        assert_eq!(pixels, vec![0, 0, 0, 0xFF]);
    }

    #[test]
    fn unsupported_encoding_method_is_rejected() {
        let mut body = Vec::new();
        body.push(4u8);
        body.push(0u8);
        body.push(0u8);
        body.push(0u8);
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());

        let ft_payload = [0x00u8, 0x00u8];
        body.extend_from_slice(&(ft_payload.len() as u32).to_le_bytes());
        body.extend_from_slice(&ft_payload);

        // method bits (30..32) set to 1: unsupported.
        let bits: u32 = (1 << 30) | 8;
        body.extend_from_slice(&bits.to_le_bytes());

        let mut r = Reader::new(&body);
        let err = decode(&mut r).unwrap_err();
        assert_eq!(err, Error::UnsupportedMethod);
    }
}
