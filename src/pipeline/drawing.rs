// SVG drawing sources and the metadata embedded in them

use anyhow::{Context, Result as AnyResult};
use roxmltree::{Document, Node, ParsingOptions};
use std::fs;
use std::path::{Path, PathBuf};

use super::ani_config::AniConfig;
use super::diagnostics::Diagnostics;
use super::error::Result;
use super::hotspot::Hotspot;

pub const HOTSPOT_ID: &str = "hotspot";
pub const ANI_CONFIG_ID: &str = "ani_config";
pub const STATIC_LAYER_ID: &str = "static";

/// Id of the layer holding frame `index` (zero based). Layers are numbered
/// from one in the drawing.
pub fn frame_layer_id(index: u32) -> String {
    format!("frame_{}", index + 1)
}

#[derive(Debug, Clone)]
pub struct DrawingSource {
    pub path: PathBuf,
    pub name: String,
    pub text: String,
}

impl DrawingSource {
    pub fn is_drawing(path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("svg"))
    }

    pub fn load(path: &Path) -> AnyResult<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read drawing {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("cursor")
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            text,
        })
    }

    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(format!("{}.svg", name)),
            name,
            text: text.into(),
        }
    }
}

pub(crate) fn parse_document(text: &str) -> std::result::Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options)
}

/// Raw attribute values read from the drawing, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawingInfo {
    pub width: Option<String>,
    pub height: Option<String>,
    pub hotspot_x: Option<String>,
    pub hotspot_y: Option<String>,
    pub ani_config: Option<String>,
}

impl DrawingInfo {
    /// Reads the root size, the `hotspot` rect and the `ani_config` text.
    /// Only direct children of the root element are considered.
    pub fn read(text: &str) -> Result<Self> {
        let doc = parse_document(text)?;
        let root = doc.root_element();

        let mut info = Self {
            width: root.attribute("width").map(str::to_string),
            height: root.attribute("height").map(str::to_string),
            ..Self::default()
        };

        for element in root.children().filter(Node::is_element) {
            match (element.attribute("id"), element.tag_name().name()) {
                (Some(HOTSPOT_ID), "rect") => {
                    info.hotspot_x = element.attribute("x").map(str::to_string);
                    info.hotspot_y = element.attribute("y").map(str::to_string);
                }
                (Some(ANI_CONFIG_ID), "text") => {
                    let content: String = element
                        .descendants()
                        .filter(Node::is_text)
                        .filter_map(|n| n.text())
                        .collect();
                    info.ani_config = Some(content);
                }
                _ => {}
            }
        }

        Ok(info)
    }

    pub fn hotspot(&self, diags: &mut Diagnostics) -> Result<Hotspot> {
        Hotspot::resolve(
            self.width.as_deref(),
            self.height.as_deref(),
            self.hotspot_x.as_deref(),
            self.hotspot_y.as_deref(),
            diags,
        )
    }

    /// `None` for a static cursor.
    pub fn animation(&self, diags: &mut Diagnostics) -> Result<Option<AniConfig>> {
        self.ani_config
            .as_deref()
            .map(|text| AniConfig::parse(text, diags))
            .transpose()
    }
}
