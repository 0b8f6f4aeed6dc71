//! PS3 texture unswizzling for 32-bit RGBA payloads.
//!
//! The console stores uncompressed textures in a recursive quadrant order:
//! each square tile (edge = the shorter texture side) is split into four
//! quadrants, top-left, top-right, bottom-left, bottom-right, down to 4x4
//! blocks, which are themselves laid out as four 2x2 groups. Non-square
//! textures are a row (or column) of such tiles.
//!
//! Unswizzling moves whole pixels, so the byte length never changes.

use log::warn;

const BYTES_PER_PIXEL: usize = 4;

/// Pixel order of the 16 source pixels within one 4x4 block, as (dx, dy).
const BLOCK_ORDER: [(usize, usize); 16] = [
    (0, 0), (1, 0), (0, 1), (1, 1),
    (2, 0), (3, 0), (2, 1), (3, 1),
    (0, 2), (1, 2), (0, 3), (1, 3),
    (2, 2), (3, 2), (2, 3), (3, 3),
];

/// Pixel index of the 4x4 block at (x, y) within a square tile of edge `size`.
fn quadrant_offset(mut size: usize, mut x: usize, mut y: usize) -> usize {
    let mut position = 0;
    while size > 4 {
        let half = size / 2;
        let quarter = size * size / 4;
        match (x >= half, y >= half) {
            (false, false) => {}
            (true, false) => {
                position += quarter;
                x -= half;
            }
            (false, true) => {
                position += 2 * quarter;
                y -= half;
            }
            (true, true) => {
                position += 3 * quarter;
                x -= half;
                y -= half;
            }
        }
        size = half;
    }
    position
}

/// Source pixel index of the block at (x, y) in a `width` × `height` level.
fn source_position(width: usize, height: usize, x: usize, y: usize) -> usize {
    let tile = width.min(height);
    let tile_pixels = tile * tile;
    if width > height {
        quadrant_offset(tile, x % tile, y) + (x / tile) * tile_pixels
    } else if width < height {
        quadrant_offset(tile, x, y % tile) + (y / tile) * tile_pixels
    } else {
        quadrant_offset(tile, x, y)
    }
}

/// Unswizzle a single mip level in place. Returns false if the level was left untouched.
fn unswizzle_level(level: &mut [u8], width: usize, height: usize) -> bool {
    let pixels = width * height;
    if width < 4 || height < 4 || width % 4 != 0 || height % 4 != 0 {
        return false;
    }
    if level.len() < pixels * BYTES_PER_PIXEL {
        warn!(
            "unswizzle: level is {} bytes, {}x{} needs {}",
            level.len(),
            width,
            height,
            pixels * BYTES_PER_PIXEL
        );
        return false;
    }

    // Every block must resolve before any pixel moves.
    let mut blocks = Vec::with_capacity(pixels / BLOCK_ORDER.len());
    for y in (0..height).step_by(4) {
        for x in (0..width).step_by(4) {
            let base = source_position(width, height, x, y);
            if base + BLOCK_ORDER.len() > pixels {
                return false;
            }
            blocks.push((x, y, base));
        }
    }

    let source = level[..pixels * BYTES_PER_PIXEL].to_vec();
    for (x, y, base) in blocks {
        for (i, &(dx, dy)) in BLOCK_ORDER.iter().enumerate() {
            let src = (base + i) * BYTES_PER_PIXEL;
            let dst = ((y + dy) * width + x + dx) * BYTES_PER_PIXEL;
            level[dst..dst + BYTES_PER_PIXEL].copy_from_slice(&source[src..src + BYTES_PER_PIXEL]);
        }
    }
    true
}

/// Unswizzle every mip level of an RGBA payload.
///
/// Levels too small for 4x4 blocks, or truncated by the payload, are copied
/// through unchanged.
pub fn unswizzle_rgba(data: &[u8], width: u32, height: u32, mip_levels: u8) -> Vec<u8> {
    let mut output = data.to_vec();
    let (mut w, mut h) = (width as usize, height as usize);
    let mut offset = 0;

    for _ in 0..mip_levels.max(1) {
        let level_len = w * h * BYTES_PER_PIXEL;
        if level_len == 0 || offset >= output.len() {
            break;
        }
        let end = (offset + level_len).min(output.len());
        unswizzle_level(&mut output[offset..end], w, h);

        offset += level_len;
        w /= 2;
        h /= 2;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Payload whose pixel `i` holds the value `i` (big-endian u32).
    fn indexed_pixels(count: usize) -> Vec<u8> {
        (0..count as u32).flat_map(|i| i.to_be_bytes()).collect()
    }

    fn pixel(data: &[u8], width: usize, x: usize, y: usize) -> u32 {
        let at = (y * width + x) * 4;
        u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn test_square_8x8_layout() {
        let data = indexed_pixels(64);
        let out = unswizzle_rgba(&data, 8, 8, 1);

        assert_eq!(out.len(), data.len());
        assert_eq!(pixel(&out, 8, 0, 0), 0);
        assert_eq!(pixel(&out, 8, 1, 0), 1);
        assert_eq!(pixel(&out, 8, 0, 1), 2);
        assert_eq!(pixel(&out, 8, 2, 0), 4);
        assert_eq!(pixel(&out, 8, 3, 3), 15);
        assert_eq!(pixel(&out, 8, 4, 0), 16);
        assert_eq!(pixel(&out, 8, 0, 4), 32);
        assert_eq!(pixel(&out, 8, 4, 4), 48);
    }

    #[test]
    fn test_wide_texture_tiles() {
        let data = indexed_pixels(8 * 4);
        let out = unswizzle_rgba(&data, 8, 4, 1);

        assert_eq!(pixel(&out, 8, 0, 0), 0);
        assert_eq!(pixel(&out, 8, 4, 0), 16);
    }

    #[test]
    fn test_tall_texture_tiles() {
        let data = indexed_pixels(4 * 8);
        let out = unswizzle_rgba(&data, 4, 8, 1);

        assert_eq!(pixel(&out, 4, 0, 4), 16);
        assert_eq!(pixel(&out, 4, 1, 4), 17);
    }

    #[test]
    fn test_mip_chain_keeps_length_and_small_levels() {
        // 8x8 + 4x4 + 2x2 levels
        let len = (64 + 16 + 4) * 4;
        let data = indexed_pixels(len / 4);
        let out = unswizzle_rgba(&data, 8, 8, 3);

        assert_eq!(out.len(), len);
        // The 2x2 level cannot be unswizzled and is copied as-is.
        assert_eq!(&out[(64 + 16) * 4..], &data[(64 + 16) * 4..]);
    }

    #[test]
    fn test_unfit_tile_geometry_is_untouched() {
        // 12x8 splits into 8x8 tiles; the second tile column runs past the level.
        let data = indexed_pixels(12 * 8);
        let mut level = data.clone();

        assert!(!unswizzle_level(&mut level, 12, 8));
        assert_eq!(level, data);
        assert_eq!(unswizzle_rgba(&data, 12, 8, 1), data);
    }

    #[test]
    fn test_truncated_payload_is_untouched() {
        let data = indexed_pixels(10);
        assert_eq!(unswizzle_rgba(&data, 8, 8, 1), data);
    }
}
