// Rendering through an external Inkscape process

use image::RgbaImage;
use log::debug;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

use super::{RenderError, Rasterizer, element_ids};
use crate::pipeline::drawing::DrawingSource;

/// Inkscape occasionally aborts at startup with this line on stderr. Running
/// the same export again usually succeeds.
const DBUS_CRASH: &str = "terminate called after throwing an instance of 'Gio::DBus::Error'";

#[derive(Debug, Clone)]
pub struct InkscapeRasterizer {
    executable: PathBuf,
}

pub struct InkscapeDocument {
    path: PathBuf,
    // keeps the temporary copy alive for in-memory sources
    _scratch: Option<NamedTempFile>,
    ids: HashSet<String>,
}

impl Default for InkscapeRasterizer {
    fn default() -> Self {
        Self::new("inkscape")
    }
}

impl InkscapeRasterizer {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

fn export_actions(out_file: &Path, layer: Option<&str>, resolution: u32) -> String {
    let mut actions = vec![
        format!("export-filename:{}", out_file.display()),
        format!("export-width:{}", resolution),
        format!("export-height:{}", resolution),
    ];
    if let Some(id) = layer {
        actions.push(format!("export-id:{}", id));
        actions.push("export-id-only".to_string());
    }
    actions.push("export-area-page".to_string());
    actions.push("export-do".to_string());
    actions.join(";")
}

fn classify_failure(stderr: &str) -> RenderError {
    let stderr = stderr.trim();
    if stderr == DBUS_CRASH {
        RenderError::Crashed(stderr.to_string())
    } else {
        RenderError::Failed(stderr.to_string())
    }
}

impl Rasterizer for InkscapeRasterizer {
    type Document = InkscapeDocument;

    fn load(&self, source: &DrawingSource) -> Result<InkscapeDocument, RenderError> {
        let ids = element_ids(&source.text)?;

        if source.path.is_file() {
            return Ok(InkscapeDocument {
                path: source.path.clone(),
                _scratch: None,
                ids,
            });
        }

        let mut scratch = tempfile::Builder::new()
            .prefix(&source.name)
            .suffix(".svg")
            .tempfile()?;
        scratch.write_all(source.text.as_bytes())?;
        scratch.flush()?;

        Ok(InkscapeDocument {
            path: scratch.path().to_path_buf(),
            _scratch: Some(scratch),
            ids,
        })
    }

    fn has_layer(&self, doc: &InkscapeDocument, id: &str) -> bool {
        doc.ids.contains(id)
    }

    fn render(
        &self,
        doc: &InkscapeDocument,
        layer: Option<&str>,
        resolution: u32,
    ) -> Result<RgbaImage, RenderError> {
        if let Some(id) = layer.filter(|id| !doc.ids.contains(*id)) {
            return Err(RenderError::MissingLayer(id.to_string()));
        }

        let out_file = tempfile::Builder::new().suffix(".png").tempfile()?;
        let actions = export_actions(out_file.path(), layer, resolution);
        debug!("{} {} --actions={}", self.executable.display(), doc.path.display(), actions);

        let output = Command::new(&self.executable)
            .arg(&doc.path)
            .arg(format!("--actions={}", actions))
            .output()?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        Ok(image::open(out_file.path())?.to_rgba8())
    }
}
