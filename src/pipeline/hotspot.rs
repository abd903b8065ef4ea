use super::diagnostics::Diagnostics;
use super::error::{CursorError, Result};

/// Hotspot position as a fraction of the drawing size, always within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hotspot {
    pub x: f64,
    pub y: f64,
}

impl Hotspot {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// Pixel position of the hotspot in an image of `resolution` pixels.
    pub fn scaled(&self, resolution: u32) -> (u16, u16) {
        let r = resolution as f64;
        ((r * self.x).round() as u16, (r * self.y).round() as u16)
    }

    /// Resolves the hotspot from the raw drawing attributes.
    ///
    /// Unreadable drawing dimensions are fatal. Everything wrong with the
    /// marker itself only produces a warning and falls back to the origin.
    pub fn resolve(
        width: Option<&str>,
        height: Option<&str>,
        marker_x: Option<&str>,
        marker_y: Option<&str>,
        diags: &mut Diagnostics,
    ) -> Result<Self> {
        let width = parse_dimension(width)?;
        let height = parse_dimension(height)?;

        if marker_x.is_none() || marker_y.is_none() {
            diags.warn("missing hotspot");
        }

        let x = parse_coordinate(marker_x, "X", diags);
        let y = parse_coordinate(marker_y, "Y", diags);

        if x < 0 || y < 0 || x > width || y > height {
            diags.warn("the hotspot is outside of the drawing");
        }

        Ok(Self::new(x as f64 / width as f64, y as f64 / height as f64))
    }
}

fn parse_dimension(attr: Option<&str>) -> Result<i64> {
    attr.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|&v| v > 0)
        .ok_or(CursorError::InvalidDrawingSize)
}

fn parse_coordinate(attr: Option<&str>, axis: &str, diags: &mut Diagnostics) -> i64 {
    let Some(raw) = attr else {
        return 0;
    };
    match raw.trim().parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            diags.warn(format!("invalid hotspot {} position", axis));
            0
        }
    }
}
