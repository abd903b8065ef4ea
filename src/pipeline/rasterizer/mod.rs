// Vector rasterization collaborators

pub mod inkscape;
pub mod native;

pub use inkscape::InkscapeRasterizer;
pub use native::ResvgRasterizer;

use image::RgbaImage;
use log::warn;
use roxmltree::Node;
use std::collections::HashSet;
use thiserror::Error;

use super::drawing::{DrawingSource, parse_document};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to parse SVG: {0}")]
    Svg(#[from] usvg::Error),

    #[error("invalid SVG: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("layer '{0}' not found")]
    MissingLayer(String),

    #[error("cannot allocate a {0}x{0} canvas")]
    Canvas(u32),

    #[error("failed to decode rendered image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("renderer failed: {0}")]
    Failed(String),

    /// A known intermittent renderer crash; the same call may succeed again.
    #[error("renderer crashed: {0}")]
    Crashed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RenderError::Crashed(_))
    }
}

/// Turns a drawing into square RGBA images.
///
/// `layer = None` renders the whole page. `Some(id)` renders only the element
/// with that id, still over the full page area.
pub trait Rasterizer: Sync {
    type Document;

    fn load(&self, source: &DrawingSource) -> Result<Self::Document, RenderError>;

    fn has_layer(&self, doc: &Self::Document, id: &str) -> bool;

    fn render(
        &self,
        doc: &Self::Document,
        layer: Option<&str>,
        resolution: u32,
    ) -> Result<RgbaImage, RenderError>;
}

/// Retries transient failures of the wrapped rasterizer.
pub struct Retrying<R> {
    inner: R,
    retries: u32,
}

impl<R: Rasterizer> Retrying<R> {
    pub fn new(inner: R, retries: u32) -> Self {
        Self { inner, retries }
    }

    fn attempt<T>(
        &self,
        mut op: impl FnMut() -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!("{}, retrying ({}/{})", e, attempt, self.retries);
                }
                result => return result,
            }
        }
    }
}

impl<R: Rasterizer> Rasterizer for Retrying<R> {
    type Document = R::Document;

    fn load(&self, source: &DrawingSource) -> Result<Self::Document, RenderError> {
        self.attempt(|| self.inner.load(source))
    }

    fn has_layer(&self, doc: &Self::Document, id: &str) -> bool {
        self.inner.has_layer(doc, id)
    }

    fn render(
        &self,
        doc: &Self::Document,
        layer: Option<&str>,
        resolution: u32,
    ) -> Result<RgbaImage, RenderError> {
        self.attempt(|| self.inner.render(doc, layer, resolution))
    }
}

/// Every element id in the drawing.
pub(crate) fn element_ids(text: &str) -> Result<HashSet<String>, RenderError> {
    let doc = parse_document(text)?;
    Ok(doc
        .descendants()
        .filter_map(|n| n.attribute("id"))
        .map(str::to_string)
        .collect())
}

const GRAPHIC_ELEMENTS: &[&str] = &[
    "a",
    "circle",
    "ellipse",
    "foreignObject",
    "g",
    "image",
    "line",
    "path",
    "polygon",
    "polyline",
    "rect",
    "svg",
    "switch",
    "text",
    "use",
];

/// Rewrites the drawing so only the element `id` is drawn. Its ancestors and
/// every non-graphic element (defs, gradients, styles) are kept; any other
/// graphic element is cut out of the source text.
pub(crate) fn isolate_element(text: &str, id: &str) -> Option<String> {
    let doc = parse_document(text).ok()?;
    let target = doc
        .descendants()
        .find(|n| n.is_element() && n.attribute("id") == Some(id))?;
    let path: Vec<Node> = target.ancestors().collect();

    let mut cuts: Vec<_> = path
        .iter()
        .skip(1)
        .flat_map(|ancestor| ancestor.children())
        .filter(|child| child.is_element() && !path.contains(child))
        .filter(|child| GRAPHIC_ELEMENTS.contains(&child.tag_name().name()))
        .map(|child| child.range())
        .collect();
    cuts.sort_by_key(|r| r.start);

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for cut in cuts {
        out.push_str(&text[pos..cut.start]);
        pos = cut.end;
    }
    out.push_str(&text[pos..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const LAYERED: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8">
<defs><linearGradient id="grad"/></defs>
<rect id="hotspot" x="0" y="0" width="1" height="1"/>
<g id="static"><rect id="base" width="8" height="8"/></g>
<g id="frames"><g id="frame_1"><circle r="1"/></g><g id="frame_2"><circle r="2"/></g></g>
</svg>"#;

    #[test]
    fn test_isolate_top_level_layer() {
        let text = isolate_element(LAYERED, "static").unwrap();
        assert!(text.contains(r#"<g id="static">"#));
        assert!(text.contains(r#"<linearGradient id="grad"/>"#));
        assert!(!text.contains("hotspot"));
        assert!(!text.contains("frame_1"));
        assert!(parse_document(&text).is_ok());
    }

    #[test]
    fn test_isolate_nested_layer() {
        let text = isolate_element(LAYERED, "frame_2").unwrap();
        assert!(text.contains(r#"<g id="frames"><g id="frame_2"><circle r="2"/></g></g>"#));
        assert!(!text.contains("frame_1"));
        assert!(!text.contains("static"));
    }

    #[test]
    fn test_isolate_missing_layer() {
        assert!(isolate_element(LAYERED, "frame_3").is_none());
    }

    #[test]
    fn test_element_ids() {
        let ids = element_ids(LAYERED).unwrap();
        assert!(ids.contains("static"));
        assert!(ids.contains("frame_2"));
        assert!(!ids.contains("frame_3"));
    }

    struct Flaky {
        failures: AtomicU32,
        crash: bool,
    }

    impl Rasterizer for Flaky {
        type Document = ();

        fn load(&self, _source: &DrawingSource) -> Result<(), RenderError> {
            Ok(())
        }

        fn has_layer(&self, _doc: &(), _id: &str) -> bool {
            false
        }

        fn render(&self, _doc: &(), _layer: Option<&str>, r: u32) -> Result<RgbaImage, RenderError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(if self.crash {
                    RenderError::Crashed("dbus".to_string())
                } else {
                    RenderError::Failed("bad drawing".to_string())
                });
            }
            Ok(RgbaImage::new(r, r))
        }
    }

    #[test]
    fn test_retry_transient_failures() {
        let flaky = Flaky {
            failures: AtomicU32::new(2),
            crash: true,
        };
        let retrying = Retrying::new(flaky, 2);
        assert!(retrying.render(&(), None, 4).is_ok());
    }

    #[test]
    fn test_retry_gives_up() {
        let flaky = Flaky {
            failures: AtomicU32::new(3),
            crash: true,
        };
        let retrying = Retrying::new(flaky, 2);
        assert!(matches!(
            retrying.render(&(), None, 4),
            Err(RenderError::Crashed(_))
        ));
    }

    #[test]
    fn test_no_retry_for_hard_failures() {
        let flaky = Flaky {
            failures: AtomicU32::new(1),
            crash: false,
        };
        let retrying = Retrying::new(flaky, 5);
        assert!(matches!(
            retrying.render(&(), None, 4),
            Err(RenderError::Failed(_))
        ));
        assert_eq!(retrying.inner.failures.load(Ordering::SeqCst), 0);
    }
}
