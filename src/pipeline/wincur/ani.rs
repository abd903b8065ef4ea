use anyhow::{Result as AnyResult, bail};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use super::cur::CurSummary;
use crate::pipeline::ani_config::AniConfig;
use crate::pipeline::error::{CursorError, Result};

const SIGNATURE: &[u8] = b"RIFF";
const ANI_TYPE: &[u8] = b"ACON";
const HEADER_CHUNK: &[u8] = b"anih";
const LIST_CHUNK: &[u8] = b"LIST";
const SEQ_CHUNK: &[u8] = b"seq ";
const RATE_CHUNK: &[u8] = b"rate";
const FRAME_TYPE: &[u8] = b"fram";
const ICON_CHUNK: &[u8] = b"icon";

const CHUNK_HEADER_SIZE: usize = 8;
const ANIH_SIZE: u32 = 36;

/// Frames are stored as icon resources rather than raw bitmaps.
pub const ICON_FLAG: u32 = 0x1;
/// `rate` and `seq ` chunks follow the header.
pub const SEQUENCE_FLAG: u32 = 0x2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnihHeader {
    pub size: u32,
    pub frame_count: u32,
    pub step_count: u32,
    pub width: u32,
    pub height: u32,
    pub bit_count: u32,
    pub planes: u32,
    pub display_rate: u32,
    pub flags: u32,
}

impl AnihHeader {
    pub fn from_config(config: &AniConfig) -> Self {
        let flags = if config.has_sequence() {
            ICON_FLAG | SEQUENCE_FLAG
        } else {
            ICON_FLAG
        };
        Self {
            size: ANIH_SIZE,
            frame_count: config.frame_count,
            step_count: config.step_count(),
            width: 0,
            height: 0,
            bit_count: 0,
            planes: 0,
            display_rate: config.frame_rate,
            flags,
        }
    }

    fn write<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for field in [
            self.size,
            self.frame_count,
            self.step_count,
            self.width,
            self.height,
            self.bit_count,
            self.planes,
            self.display_rate,
            self.flags,
        ] {
            out.write_u32::<LittleEndian>(field)?;
        }
        Ok(())
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        Ok(Self {
            size: cursor.read_u32::<LittleEndian>()?,
            frame_count: cursor.read_u32::<LittleEndian>()?,
            step_count: cursor.read_u32::<LittleEndian>()?,
            width: cursor.read_u32::<LittleEndian>()?,
            height: cursor.read_u32::<LittleEndian>()?,
            bit_count: cursor.read_u32::<LittleEndian>()?,
            planes: cursor.read_u32::<LittleEndian>()?,
            display_rate: cursor.read_u32::<LittleEndian>()?,
            flags: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

fn write_chunk(out: &mut Vec<u8>, id: &[u8], payload: &[u8]) -> std::io::Result<()> {
    out.write_all(id)?;
    out.write_u32::<LittleEndian>(payload.len() as u32)?;
    out.write_all(payload)
}

fn u32_payload(values: &[u32]) -> std::io::Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(values.len() * 4);
    for &value in values {
        payload.write_u32::<LittleEndian>(value)?;
    }
    Ok(payload)
}

/// An animated cursor: the validated configuration and one encoded `.cur`
/// container per physical frame, in frame index order.
#[derive(Debug, Clone)]
pub struct AniContainer {
    config: AniConfig,
    frames: Vec<Vec<u8>>,
}

impl AniContainer {
    pub fn new(config: AniConfig, frames: Vec<Vec<u8>>) -> Result<Self> {
        if frames.len() != config.frame_count as usize {
            return Err(CursorError::FrameCountMismatch {
                expected: config.frame_count,
                actual: frames.len(),
            });
        }
        Ok(Self { config, frames })
    }

    pub fn header(&self) -> AnihHeader {
        AnihHeader::from_config(&self.config)
    }

    /// Serializes the RIFF/ACON file. Chunk order is `anih`, `rate`, `seq `,
    /// `LIST`; the rate and sequence chunks exist only with `SEQUENCE_FLAG`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = self.header();

        let mut body = Vec::new();
        body.write_all(ANI_TYPE)?;

        let mut anih = Vec::with_capacity(ANIH_SIZE as usize);
        header.write(&mut anih)?;
        write_chunk(&mut body, HEADER_CHUNK, &anih)?;

        if header.flags & SEQUENCE_FLAG != 0 {
            write_chunk(&mut body, RATE_CHUNK, &u32_payload(&self.config.step_rates())?)?;
            write_chunk(&mut body, SEQ_CHUNK, &u32_payload(&self.config.step_frames())?)?;
        }

        let frames_len: usize = self
            .frames
            .iter()
            .map(|f| CHUNK_HEADER_SIZE + f.len())
            .sum();
        let mut list = Vec::with_capacity(FRAME_TYPE.len() + frames_len);
        list.write_all(FRAME_TYPE)?;
        for frame in &self.frames {
            write_chunk(&mut list, ICON_CHUNK, frame)?;
        }
        write_chunk(&mut body, LIST_CHUNK, &list)?;

        let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + body.len());
        write_chunk(&mut out, SIGNATURE, &body)?;
        Ok(out)
    }
}

/// Structure of an `.ani` file as read back from bytes.
#[derive(Debug, Clone)]
pub struct AniSummary {
    pub riff_size: u32,
    pub header: AnihHeader,
    pub rates: Option<Vec<u32>>,
    pub sequence: Option<Vec<u32>>,
    pub list_size: u32,
    pub frames: Vec<CurSummary>,
    /// Chunk ids in file order, excluding the outer RIFF.
    pub chunk_order: Vec<[u8; 4]>,
}

impl AniSummary {
    pub fn can_parse(data: &[u8]) -> bool {
        data.len() >= 12 && &data[0..4] == SIGNATURE && &data[8..12] == ANI_TYPE
    }

    pub fn read(data: &[u8]) -> AnyResult<Self> {
        if !Self::can_parse(data) {
            bail!("Not a valid .ANI file");
        }

        let mut cursor = Cursor::new(data);
        cursor.seek(SeekFrom::Start(4))?;
        let riff_size = cursor.read_u32::<LittleEndian>()?;
        cursor.seek(SeekFrom::Start(12))?;

        let mut header = None;
        let mut rates = None;
        let mut sequence = None;
        let mut list_size = 0;
        let mut frames = Vec::new();
        let mut chunk_order = Vec::new();

        while (cursor.position() as usize) + CHUNK_HEADER_SIZE <= data.len() {
            let (name, size, data_start) = Self::read_chunk(&mut cursor)?;
            let end = data_start + size as u64;
            if end as usize > data.len() {
                bail!("Chunk {:?} extends beyond file", String::from_utf8_lossy(&name));
            }
            chunk_order.push(name);

            match &name[..] {
                HEADER_CHUNK => {
                    let anih = AnihHeader::read(&mut cursor)?;
                    if anih.size != ANIH_SIZE {
                        bail!("Invalid ANI header size: {}", anih.size);
                    }
                    header = Some(anih);
                }
                RATE_CHUNK => rates = Some(Self::read_u32_array(&mut cursor, size)?),
                SEQ_CHUNK => sequence = Some(Self::read_u32_array(&mut cursor, size)?),
                LIST_CHUNK => {
                    let mut list_type = [0u8; 4];
                    cursor.read_exact(&mut list_type)?;
                    if list_type == FRAME_TYPE {
                        list_size = size;
                        frames = Self::read_frames(&mut cursor, data, end)?;
                    }
                }
                _ => {}
            }

            cursor.seek(SeekFrom::Start(end))?;
            // Align to word boundary
            if cursor.position() & 1 != 0 {
                cursor.seek(SeekFrom::Current(1))?;
            }
        }

        let Some(header) = header else {
            bail!("Missing anih chunk");
        };
        if frames.len() != header.frame_count as usize {
            bail!(
                "Header declares {} frames but the list holds {}",
                header.frame_count,
                frames.len()
            );
        }

        Ok(Self {
            riff_size,
            header,
            rates,
            sequence,
            list_size,
            frames,
            chunk_order,
        })
    }

    fn read_chunk(cursor: &mut Cursor<&[u8]>) -> AnyResult<([u8; 4], u32, u64)> {
        let mut name = [0u8; 4];
        cursor.read_exact(&mut name)?;
        let size = cursor.read_u32::<LittleEndian>()?;
        let data_start = cursor.position();
        Ok((name, size, data_start))
    }

    fn read_u32_array(cursor: &mut Cursor<&[u8]>, size: u32) -> AnyResult<Vec<u32>> {
        if size % 4 != 0 {
            bail!("Array chunk size {} is not a multiple of 4", size);
        }
        let mut values = Vec::with_capacity(size as usize / 4);
        for _ in 0..size / 4 {
            values.push(cursor.read_u32::<LittleEndian>()?);
        }
        Ok(values)
    }

    fn read_frames(
        cursor: &mut Cursor<&[u8]>,
        full_data: &[u8],
        list_end: u64,
    ) -> AnyResult<Vec<CurSummary>> {
        let mut frames = Vec::new();

        while cursor.position() + CHUNK_HEADER_SIZE as u64 <= list_end {
            let (name, size, data_start) = Self::read_chunk(cursor)?;
            if name != ICON_CHUNK {
                bail!("Expected icon chunk in frame list");
            }

            let start = data_start as usize;
            let end = start + size as usize;
            if end as u64 > list_end {
                bail!("Icon data extends beyond frame list");
            }

            frames.push(CurSummary::read(&full_data[start..end])?);

            cursor.seek(SeekFrom::Start(end as u64))?;
            if cursor.position() & 1 != 0 {
                cursor.seek(SeekFrom::Current(1))?;
            }
        }

        Ok(frames)
    }
}
