use anyhow::{Result as AnyResult, bail};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::RgbaImage;
use std::io::{Cursor, Write};

use super::bitmap::{EncodedBitmap, encode_bitmap};
use crate::pipeline::error::{CursorError, Result};
use crate::pipeline::hotspot::Hotspot;

const ICO_TYPE_CUR: u16 = 2;
pub(crate) const MAGIC: &[u8] = &[0x00, 0x00, 0x02, 0x00];

pub const ICONDIR_SIZE: usize = 6;
pub const ICONDIRENTRY_SIZE: usize = 16;
pub const MAX_RESOLUTION: u32 = 255;

/// One ICONDIRENTRY. For cursors the planes/bit-count pair holds the hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconDirEntry {
    pub width: u8,
    pub height: u8,
    pub color_count: u8,
    pub reserved: u8,
    pub hotspot_x: u16,
    pub hotspot_y: u16,
    pub size_bytes: u32,
    pub offset: u32,
}

impl IconDirEntry {
    fn write<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_u8(self.width)?;
        out.write_u8(self.height)?;
        out.write_u8(self.color_count)?;
        out.write_u8(self.reserved)?;
        out.write_u16::<LittleEndian>(self.hotspot_x)?;
        out.write_u16::<LittleEndian>(self.hotspot_y)?;
        out.write_u32::<LittleEndian>(self.size_bytes)?;
        out.write_u32::<LittleEndian>(self.offset)?;
        Ok(())
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        Ok(Self {
            width: cursor.read_u8()?,
            height: cursor.read_u8()?,
            color_count: cursor.read_u8()?,
            reserved: cursor.read_u8()?,
            hotspot_x: cursor.read_u16::<LittleEndian>()?,
            hotspot_y: cursor.read_u16::<LittleEndian>()?,
            size_bytes: cursor.read_u32::<LittleEndian>()?,
            offset: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Nominal image size; a stored 0 means 256.
    pub fn nominal_size(&self) -> u32 {
        let w = if self.width == 0 { 256 } else { self.width as u32 };
        let h = if self.height == 0 { 256 } else { self.height as u32 };
        w.max(h)
    }
}

/// All resolution variants of one cursor image plus its hotspot.
#[derive(Debug, Clone)]
pub struct IconContainer {
    hotspot: Hotspot,
    images: Vec<(u32, EncodedBitmap)>,
}

impl IconContainer {
    pub fn new(hotspot: Hotspot, images: Vec<(u32, EncodedBitmap)>) -> Result<Self> {
        if let Some(&(resolution, _)) = images
            .iter()
            .find(|(r, _)| *r == 0 || *r > MAX_RESOLUTION)
        {
            return Err(CursorError::UnsupportedResolution(resolution));
        }
        Ok(Self { hotspot, images })
    }

    /// Encodes every image at its resolution and wraps the result.
    pub fn from_images(hotspot: Hotspot, images: &[(u32, &RgbaImage)]) -> Result<Self> {
        let encoded = images
            .iter()
            .map(|&(resolution, image)| {
                encode_bitmap(image, resolution).map(|bitmap| (resolution, bitmap))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(hotspot, encoded)
    }

    /// Serializes to a complete `.cur` file: ICONDIR, entries, then the
    /// bitmaps in entry order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count = self.images.len();
        let blobs_len: usize = self.images.iter().map(|(_, b)| b.len()).sum();
        let mut out = Vec::with_capacity(ICONDIR_SIZE + ICONDIRENTRY_SIZE * count + blobs_len);

        out.write_u16::<LittleEndian>(0)?;
        out.write_u16::<LittleEndian>(ICO_TYPE_CUR)?;
        out.write_u16::<LittleEndian>(count as u16)?;

        let mut offset = ICONDIR_SIZE + ICONDIRENTRY_SIZE * count;
        for (resolution, bitmap) in &self.images {
            let (hotspot_x, hotspot_y) = self.hotspot.scaled(*resolution);
            IconDirEntry {
                width: *resolution as u8,
                height: *resolution as u8,
                color_count: 0,
                reserved: 0,
                hotspot_x,
                hotspot_y,
                size_bytes: bitmap.len() as u32,
                offset: offset as u32,
            }
            .write(&mut out)?;
            offset += bitmap.len();
        }

        for (_, bitmap) in &self.images {
            out.extend_from_slice(bitmap.as_bytes());
        }

        Ok(out)
    }
}

/// Directory of a `.cur` file as read back from bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurSummary {
    pub entries: Vec<IconDirEntry>,
}

impl CurSummary {
    pub fn can_parse(data: &[u8]) -> bool {
        data.len() >= 4 && &data[0..4] == MAGIC
    }

    pub fn read(data: &[u8]) -> AnyResult<Self> {
        if !Self::can_parse(data) {
            bail!("Not a valid .CUR file");
        }

        let mut cursor = Cursor::new(data);

        let reserved = cursor.read_u16::<LittleEndian>()?;
        let ico_type = cursor.read_u16::<LittleEndian>()?;
        let image_count = cursor.read_u16::<LittleEndian>()?;

        if reserved != 0 {
            bail!("Invalid reserved field in CUR header");
        }
        if ico_type != ICO_TYPE_CUR {
            bail!("Not a cursor file (type must be 2)");
        }

        let mut entries = Vec::with_capacity(image_count as usize);
        for _ in 0..image_count {
            let entry = IconDirEntry::read(&mut cursor)?;
            let end = entry.offset as usize + entry.size_bytes as usize;
            if end > data.len() {
                bail!("Image data extends beyond file bounds");
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opaque(resolution: u32) -> RgbaImage {
        RgbaImage::from_pixel(resolution, resolution, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn test_magic_detection() {
        let valid = vec![0x00, 0x00, 0x02, 0x00, 0x01, 0x00];
        assert!(CurSummary::can_parse(&valid));

        let invalid = vec![0x00, 0x00, 0x01, 0x00];
        assert!(!CurSummary::can_parse(&invalid));
    }

    #[test]
    fn test_directory_offsets() {
        let images = [opaque(32), opaque(48), opaque(64)];
        let container = IconContainer::from_images(
            Hotspot::new(0.25, 0.5),
            &[(32, &images[0]), (48, &images[1]), (64, &images[2])],
        )
        .unwrap();
        let bytes = container.to_bytes().unwrap();

        assert_eq!(&bytes[0..6], &[0, 0, 2, 0, 3, 0]);

        let summary = CurSummary::read(&bytes).unwrap();
        let entries = &summary.entries;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].offset, 54);
        assert_eq!(entries[1].offset, entries[0].offset + entries[0].size_bytes);
        assert_eq!(entries[2].offset, entries[1].offset + entries[1].size_bytes);
        assert_eq!(
            bytes.len(),
            (entries[2].offset + entries[2].size_bytes) as usize
        );

        assert_eq!((entries[0].width, entries[0].height), (32, 32));
        assert_eq!((entries[0].hotspot_x, entries[0].hotspot_y), (8, 16));
        assert_eq!((entries[1].hotspot_x, entries[1].hotspot_y), (12, 24));
        assert_eq!((entries[2].hotspot_x, entries[2].hotspot_y), (16, 32));
        assert_eq!(entries[0].size_bytes as usize, 40 + 32 * 32 * 4 + 128);
        assert_eq!(entries[2].nominal_size(), 64);
    }

    #[test]
    fn test_exact_bytes() {
        let mut two = RgbaImage::new(2, 2);
        two.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        two.put_pixel(1, 0, Rgba([9, 9, 9, 0]));
        two.put_pixel(0, 1, Rgba([0, 255, 0, 128]));
        two.put_pixel(1, 1, Rgba([0, 0, 255, 255]));
        let one = opaque(1);

        let container =
            IconContainer::from_images(Hotspot::new(0.5, 0.5), &[(2, &two), (1, &one)]).unwrap();
        let bytes = container.to_bytes().unwrap();

        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            // ICONDIR
            0, 0, 2, 0, 2, 0,
            // 2x2 entry: hotspot (1, 1), 58 bytes at 38
            2, 2, 0, 0, 1, 0, 1, 0, 58, 0, 0, 0, 38, 0, 0, 0,
            // 1x1 entry: 0.5 rounds up, 46 bytes at 96
            1, 1, 0, 0, 1, 0, 1, 0, 46, 0, 0, 0, 96, 0, 0, 0,
            // 2x2 BITMAPINFOHEADER
            40, 0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0, 1, 0, 32, 0,
            0, 0, 0, 0, 18, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0,
            // bottom row, BGRA
            0, 255, 0, 128, 255, 0, 0, 255,
            // top row; the transparent pixel is zeroed
            0, 0, 255, 255, 0, 0, 0, 0,
            // AND mask: fourth pixel set, padded to two bytes
            0x10, 0x00,
            // 1x1 BITMAPINFOHEADER
            40, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 1, 0, 32, 0,
            0, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0,
            255, 255, 255, 255,
            0x00, 0x00,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_entry_order_follows_input() {
        let small = opaque(16);
        let large = opaque(24);
        let container =
            IconContainer::from_images(Hotspot::default(), &[(24, &large), (16, &small)]).unwrap();
        let bytes = container.to_bytes().unwrap();
        let summary = CurSummary::read(&bytes).unwrap();

        assert_eq!(summary.entries[0].width, 24);
        assert_eq!(summary.entries[1].width, 16);
        assert_eq!(summary.entries[0].offset, 6 + 16 * 2);
        // blob starts with its own BITMAPINFOHEADER
        let first = summary.entries[0].offset as usize;
        assert_eq!(&bytes[first..first + 4], &[40, 0, 0, 0]);
    }

    #[test]
    fn test_resolution_limit() {
        let image = opaque(256);
        let result = IconContainer::from_images(Hotspot::default(), &[(256, &image)]);
        assert!(matches!(result, Err(CursorError::UnsupportedResolution(256))));
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let image = opaque(8);
        let container = IconContainer::from_images(Hotspot::default(), &[(8, &image)]).unwrap();
        let bytes = container.to_bytes().unwrap();
        assert!(CurSummary::read(&bytes[..bytes.len() - 1]).is_err());
    }
}
