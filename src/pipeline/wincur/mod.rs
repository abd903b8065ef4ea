// Windows cursor containers: static .cur and animated .ani

pub mod ani;
pub mod bitmap;
pub mod cur;

pub use ani::{AniContainer, AniSummary, AnihHeader};
pub use bitmap::{EncodedBitmap, encode_bitmap, mask_len};
pub use cur::{CurSummary, IconContainer, IconDirEntry};

use anyhow::Result;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorFormat {
    Cur,
    Ani,
}

impl CursorFormat {
    pub fn detect(data: &[u8]) -> Option<Self> {
        if CurSummary::can_parse(data) {
            Some(CursorFormat::Cur)
        } else if AniSummary::can_parse(data) {
            Some(CursorFormat::Ani)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            CursorFormat::Cur => "cur",
            CursorFormat::Ani => "ani",
        }
    }
}

/// Human readable dump of a cursor file's structure.
pub fn describe(data: &[u8]) -> Result<String> {
    let format = CursorFormat::detect(data)
        .ok_or_else(|| anyhow::anyhow!("Unsupported cursor format"))?;

    let mut out = String::new();
    match format {
        CursorFormat::Cur => {
            let summary = CurSummary::read(data)?;
            writeln!(out, "CUR, {} image(s)", summary.entries.len())?;
            describe_entries(&mut out, &summary, "  ")?;
        }
        CursorFormat::Ani => {
            let summary = AniSummary::read(data)?;
            let h = &summary.header;
            writeln!(out, "ANI, RIFF size {}", summary.riff_size)?;
            writeln!(
                out,
                "  frames {}, steps {}, rate {} jiffies, flags {:#x}",
                h.frame_count, h.step_count, h.display_rate, h.flags
            )?;
            if let Some(rates) = &summary.rates {
                writeln!(out, "  rate {:?}", rates)?;
            }
            if let Some(sequence) = &summary.sequence {
                writeln!(out, "  seq  {:?}", sequence)?;
            }
            for (i, frame) in summary.frames.iter().enumerate() {
                writeln!(out, "  frame {}:", i)?;
                describe_entries(&mut out, frame, "    ")?;
            }
        }
    }
    Ok(out)
}

fn describe_entries(out: &mut String, summary: &CurSummary, indent: &str) -> std::fmt::Result {
    for entry in &summary.entries {
        writeln!(
            out,
            "{}{}x{} hotspot ({}, {}) {} bytes at {}",
            indent,
            entry.nominal_size(),
            entry.nominal_size(),
            entry.hotspot_x,
            entry.hotspot_y,
            entry.size_bytes,
            entry.offset
        )?;
    }
    Ok(())
}
