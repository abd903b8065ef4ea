use image::{Rgba, RgbaImage};
use std::collections::HashSet;
use std::path::PathBuf;
use tiny_skia::{Pixmap, Transform};

use super::{RenderError, Rasterizer, element_ids, isolate_element};
use crate::pipeline::drawing::DrawingSource;

/// In-process renderer built on usvg and resvg.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResvgRasterizer;

pub struct ResvgDocument {
    text: String,
    resources_dir: Option<PathBuf>,
    page: usvg::Tree,
    ids: HashSet<String>,
}

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self
    }

    fn options(resources_dir: Option<PathBuf>) -> usvg::Options<'static> {
        usvg::Options {
            resources_dir,
            ..usvg::Options::default()
        }
    }
}

impl Rasterizer for ResvgRasterizer {
    type Document = ResvgDocument;

    fn load(&self, source: &DrawingSource) -> Result<ResvgDocument, RenderError> {
        let resources_dir = source.path.parent().map(|p| p.to_path_buf());
        let page = usvg::Tree::from_str(&source.text, &Self::options(resources_dir.clone()))?;
        Ok(ResvgDocument {
            text: source.text.clone(),
            resources_dir,
            page,
            ids: element_ids(&source.text)?,
        })
    }

    fn has_layer(&self, doc: &ResvgDocument, id: &str) -> bool {
        doc.ids.contains(id)
    }

    fn render(
        &self,
        doc: &ResvgDocument,
        layer: Option<&str>,
        resolution: u32,
    ) -> Result<RgbaImage, RenderError> {
        let Some(id) = layer else {
            return render_tree(&doc.page, resolution);
        };

        let isolated = isolate_element(&doc.text, id)
            .ok_or_else(|| RenderError::MissingLayer(id.to_string()))?;
        let tree = usvg::Tree::from_str(&isolated, &Self::options(doc.resources_dir.clone()))?;
        render_tree(&tree, resolution)
    }
}

/// Renders the page area of `tree` scaled to `resolution`×`resolution`.
fn render_tree(tree: &usvg::Tree, resolution: u32) -> Result<RgbaImage, RenderError> {
    let mut pixmap = Pixmap::new(resolution, resolution).ok_or(RenderError::Canvas(resolution))?;

    let size = tree.size();
    let transform = Transform::from_scale(
        resolution as f32 / size.width(),
        resolution as f32 / size.height(),
    );
    resvg::render(tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha
    let mut image = RgbaImage::new(resolution, resolution);
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAWING: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
<g id="static"><rect x="0" y="0" width="5" height="10" fill="#0000ff"/></g>
<g id="frame_1"><rect x="5" y="0" width="5" height="10" fill="#ff0000"/></g>
</svg>"##;

    fn load() -> ResvgDocument {
        ResvgRasterizer::new()
            .load(&DrawingSource::from_text("test", DRAWING))
            .unwrap()
    }

    #[test]
    fn test_render_page() {
        let doc = load();
        let image = ResvgRasterizer::new().render(&doc, None, 20).unwrap();

        assert_eq!(image.dimensions(), (20, 20));
        assert_eq!(*image.get_pixel(2, 10), Rgba([0, 0, 255, 255]));
        assert_eq!(*image.get_pixel(17, 10), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_render_layer_keeps_page_area() {
        let doc = load();
        let image = ResvgRasterizer::new()
            .render(&doc, Some("frame_1"), 10)
            .unwrap();

        assert_eq!(image.get_pixel(2, 5)[3], 0);
        assert_eq!(*image.get_pixel(7, 5), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_layers() {
        let doc = load();
        let rasterizer = ResvgRasterizer::new();
        assert!(rasterizer.has_layer(&doc, "static"));
        assert!(!rasterizer.has_layer(&doc, "frame_2"));
        assert!(matches!(
            rasterizer.render(&doc, Some("frame_2"), 10),
            Err(RenderError::MissingLayer(_))
        ));
    }
}
