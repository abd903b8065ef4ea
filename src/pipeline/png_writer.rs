use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

use super::generator::GeneratedCursor;
use super::wincur::CursorFormat;

pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Where the image for `resolution` (and frame `index`, for animations) of
/// cursor `name` is exported.
pub fn export_path(png_dir: &Path, name: &str, resolution: u32, index: Option<usize>) -> PathBuf {
    let dir = png_dir.join(name);
    match index {
        None => dir.join(format!("{}.png", resolution)),
        Some(i) => dir.join(resolution.to_string()).join(format!("{}.png", i)),
    }
}

/// Dumps every image that went into the cursor. Returns the written paths.
pub fn export_images(cursor: &GeneratedCursor, png_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (i, frame) in cursor.frames.iter().enumerate() {
        let index = match cursor.kind {
            CursorFormat::Cur => None,
            CursorFormat::Ani => Some(i),
        };
        for (resolution, image) in frame {
            let path = export_path(png_dir, &cursor.name, *resolution, index);
            write_png(image, &path)?;
            written.push(path);
        }
    }
    Ok(written)
}
