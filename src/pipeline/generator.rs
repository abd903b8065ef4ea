// Turns one drawing into a finished .cur or .ani file

use image::RgbaImage;
use log::debug;

use super::ani_config::AniConfig;
use super::compositor::composite_frame;
use super::diagnostics::Diagnostics;
use super::drawing::{DrawingInfo, DrawingSource, STATIC_LAYER_ID, frame_layer_id};
use super::error::{CursorError, Result};
use super::hotspot::Hotspot;
use super::rasterizer::Rasterizer;
use super::wincur::cur::MAX_RESOLUTION;
use super::wincur::{AniContainer, CursorFormat, IconContainer};

/// Images of one frame, one per requested resolution and in that order.
pub type FrameImages = Vec<(u32, RgbaImage)>;

#[derive(Debug, Clone)]
pub struct GeneratedCursor {
    pub name: String,
    pub kind: CursorFormat,
    pub bytes: Vec<u8>,
    /// Final images that went into the file. A static cursor has exactly
    /// one entry; an animated one has one per frame index.
    pub frames: Vec<FrameImages>,
}

impl GeneratedCursor {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

pub fn generate<R: Rasterizer>(
    source: &DrawingSource,
    rasterizer: &R,
    resolutions: &[u32],
    diags: &mut Diagnostics,
) -> Result<GeneratedCursor> {
    if resolutions.is_empty() {
        return Err(CursorError::NoResolutions);
    }
    if let Some(&r) = resolutions.iter().find(|&&r| r == 0 || r > MAX_RESOLUTION) {
        return Err(CursorError::UnsupportedResolution(r));
    }

    let info = DrawingInfo::read(&source.text)?;
    let hotspot = info.hotspot(diags)?;
    let animation = info.animation(diags)?;

    let doc = rasterizer.load(source)?;

    let (kind, bytes, frames) = match animation {
        None => {
            debug!("{}: static cursor", source.name);
            let images = render_layer(rasterizer, &doc, None, resolutions)?;
            let bytes = encode_icon(hotspot, &images)?;
            (CursorFormat::Cur, bytes, vec![images])
        }
        Some(config) => {
            let (bytes, frames) = generate_animation(rasterizer, &doc, hotspot, config, resolutions)?;
            (CursorFormat::Ani, bytes, frames)
        }
    };

    Ok(GeneratedCursor {
        name: source.name.clone(),
        kind,
        bytes,
        frames,
    })
}

fn generate_animation<R: Rasterizer>(
    rasterizer: &R,
    doc: &R::Document,
    hotspot: Hotspot,
    config: AniConfig,
    resolutions: &[u32],
) -> Result<(Vec<u8>, Vec<FrameImages>)> {
    let static_images = if rasterizer.has_layer(doc, STATIC_LAYER_ID) {
        Some(render_layer(rasterizer, doc, Some(STATIC_LAYER_ID), resolutions)?)
    } else {
        None
    };
    debug!(
        "animated cursor: {} frame(s), static layer: {}",
        config.frame_count,
        static_images.is_some()
    );

    // not pre-sized: frameCount comes straight from the drawing
    let mut frames = Vec::new();
    let mut containers = Vec::new();

    for index in 0..config.frame_count {
        let layer = frame_layer_id(index);
        let rendered = render_layer(rasterizer, doc, Some(&layer), resolutions)?;

        let mut images = Vec::with_capacity(rendered.len());
        for (i, (resolution, image)) in rendered.iter().enumerate() {
            let static_layer = static_images.as_ref().map(|s| &s[i].1);
            let composed = composite_frame(image, static_layer, *resolution)?;
            images.push((*resolution, composed.into_owned()));
        }

        containers.push(encode_icon(hotspot, &images)?);
        frames.push(images);
    }

    let bytes = AniContainer::new(config, containers)?.to_bytes()?;
    Ok((bytes, frames))
}

fn render_layer<R: Rasterizer>(
    rasterizer: &R,
    doc: &R::Document,
    layer: Option<&str>,
    resolutions: &[u32],
) -> Result<FrameImages> {
    resolutions
        .iter()
        .map(|&r| Ok((r, rasterizer.render(doc, layer, r)?)))
        .collect()
}

fn encode_icon(hotspot: Hotspot, images: &[(u32, RgbaImage)]) -> Result<Vec<u8>> {
    let refs: Vec<(u32, &RgbaImage)> = images.iter().map(|(r, image)| (*r, image)).collect();
    IconContainer::from_images(hotspot, &refs)?.to_bytes()
}
