use byteorder::{LittleEndian, WriteBytesExt};
use image::RgbaImage;

use crate::pipeline::error::{CursorError, Result};

pub const BITMAP_HEADER_SIZE: u32 = 40;
const BITS_PER_PIXEL: u16 = 32;
const BYTES_PER_PIXEL: usize = 4;

/// DIB pixel block of one cursor image: BITMAPINFOHEADER, BGRA color table
/// and the 1-bit AND mask, without a BMP file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBitmap(Vec<u8>);

impl EncodedBitmap {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

/// Size of the AND mask for a square image: one bit per pixel, padded to
/// whole bytes and then to an even byte count.
pub fn mask_len(resolution: u32) -> usize {
    let pixels = resolution as usize * resolution as usize;
    let bytes = pixels.div_ceil(8);
    bytes + bytes % 2
}

pub fn color_table_len(resolution: u32) -> usize {
    resolution as usize * resolution as usize * BYTES_PER_PIXEL
}

/// Encodes a `resolution`×`resolution` image. The height field is doubled to
/// announce the trailing mask.
pub fn encode_bitmap(image: &RgbaImage, resolution: u32) -> Result<EncodedBitmap> {
    if image.width() != resolution || image.height() != resolution {
        return Err(CursorError::ResolutionMismatch {
            expected: resolution,
            width: image.width(),
            height: image.height(),
        });
    }

    let colors_len = color_table_len(resolution);
    let mask_len = mask_len(resolution);
    let mut out = Vec::with_capacity(BITMAP_HEADER_SIZE as usize + colors_len + mask_len);

    out.write_u32::<LittleEndian>(BITMAP_HEADER_SIZE)?;
    out.write_i32::<LittleEndian>(resolution as i32)?;
    out.write_i32::<LittleEndian>(resolution as i32 * 2)?;
    out.write_u16::<LittleEndian>(1)?; // planes
    out.write_u16::<LittleEndian>(BITS_PER_PIXEL)?;
    out.write_u32::<LittleEndian>(0)?; // BI_RGB
    out.write_u32::<LittleEndian>((colors_len + mask_len) as u32)?;
    out.write_i32::<LittleEndian>(0)?; // x pixels per meter
    out.write_i32::<LittleEndian>(0)?; // y pixels per meter
    out.write_u32::<LittleEndian>(0)?; // colors used
    out.write_u32::<LittleEndian>(0)?; // important colors

    let mut mask = vec![0u8; mask_len];
    let mut bit = 0usize;

    // Bottom-up rows, as DIBs are stored.
    for y in (0..resolution).rev() {
        for x in 0..resolution {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            if a == 0 {
                out.extend_from_slice(&[0, 0, 0, a]);
                mask[bit / 8] |= 0x80 >> (bit % 8);
            } else {
                out.extend_from_slice(&[b, g, r, a]);
            }
            bit += 1;
        }
    }

    out.extend_from_slice(&mask);
    Ok(EncodedBitmap(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn filled(resolution: u32, pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(resolution, resolution, Rgba(pixel))
    }

    fn header_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_mask_len() {
        assert_eq!(mask_len(32), 128);
        assert_eq!(mask_len(48), 288);
        assert_eq!(mask_len(64), 512);
        // 9 pixels -> 2 bytes, already even
        assert_eq!(mask_len(3), 2);
        // 25 pixels -> 4 bytes
        assert_eq!(mask_len(5), 4);
        // 1 pixel -> 1 byte -> padded to 2
        assert_eq!(mask_len(1), 2);
        // 49 pixels -> 7 bytes -> padded to 8
        assert_eq!(mask_len(7), 8);
        // 100 pixels -> 13 bytes -> padded to 14
        assert_eq!(mask_len(10), 14);
    }

    #[test]
    fn test_header() {
        let bitmap = encode_bitmap(&filled(32, [1, 2, 3, 255]), 32).unwrap();
        let bytes = bitmap.as_bytes();

        assert_eq!(header_u32(bytes, 0), 40);
        assert_eq!(header_u32(bytes, 4), 32);
        assert_eq!(header_u32(bytes, 8), 64);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 32);
        assert_eq!(header_u32(bytes, 16), 0);
        assert_eq!(header_u32(bytes, 20), 32 * 32 * 4 + 128);
        assert!(bytes[24..40].iter().all(|&b| b == 0));
        assert_eq!(bitmap.len(), 40 + 32 * 32 * 4 + 128);
    }

    #[test]
    fn test_opaque_image_has_empty_mask() {
        let bitmap = encode_bitmap(&filled(48, [10, 20, 30, 255]), 48).unwrap();
        let bytes = bitmap.as_bytes();
        let colors = &bytes[40..40 + color_table_len(48)];
        let mask = &bytes[40 + color_table_len(48)..];

        assert_eq!(mask.len(), mask_len(48));
        assert!(mask.iter().all(|&b| b == 0));
        assert_eq!(&colors[0..4], &[30, 20, 10, 255]);
    }

    #[test]
    fn test_transparent_image() {
        let bitmap = encode_bitmap(&filled(5, [200, 100, 50, 0]), 5).unwrap();
        let bytes = bitmap.as_bytes();
        let colors = &bytes[40..40 + color_table_len(5)];
        let mask = &bytes[40 + color_table_len(5)..];

        assert!(colors.iter().all(|&b| b == 0));
        // 25 bits set, then 7 padding bits, then one padding byte
        assert_eq!(mask, &[0xFF, 0xFF, 0xFF, 0x80]);
    }

    #[test]
    fn test_rows_are_bottom_up() {
        let mut image = filled(2, [0, 0, 0, 0]);
        image.put_pixel(0, 1, Rgba([255, 0, 0, 255])); // bottom-left
        image.put_pixel(1, 0, Rgba([0, 0, 255, 128])); // top-right

        let bitmap = encode_bitmap(&image, 2).unwrap();
        let bytes = bitmap.as_bytes();
        let colors = &bytes[40..56];

        assert_eq!(&colors[0..4], &[0, 0, 255, 255]);
        assert_eq!(&colors[4..8], &[0, 0, 0, 0]);
        assert_eq!(&colors[8..12], &[0, 0, 0, 0]);
        assert_eq!(&colors[12..16], &[255, 0, 0, 128]);
        // bottom row: opaque, transparent; top row: transparent, opaque
        assert_eq!(&bytes[56..], &[0b0110_0000, 0]);
    }

    #[test]
    fn test_partial_alpha_keeps_color() {
        let bitmap = encode_bitmap(&filled(1, [9, 8, 7, 1]), 1).unwrap();
        let bytes = bitmap.as_bytes();
        assert_eq!(&bytes[40..44], &[7, 8, 9, 1]);
        assert_eq!(&bytes[44..], &[0, 0]);
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let image = RgbaImage::new(32, 30);
        let result = encode_bitmap(&image, 32);
        assert!(matches!(
            result,
            Err(CursorError::ResolutionMismatch {
                expected: 32,
                width: 32,
                height: 30
            })
        ));
    }
}
