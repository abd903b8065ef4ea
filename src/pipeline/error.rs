use thiserror::Error;

use super::rasterizer::RenderError;

/// Conditions that abort processing of a single drawing.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("failed to query SVG size")]
    InvalidDrawingSize,

    #[error("missing required option 'frameCount'")]
    MissingFrameCount,

    #[error("'frameCount' cannot be zero")]
    ZeroFrameCount,

    #[error("frame index {index} is too big (frameCount is {frame_count})")]
    FrameIndexOutOfRange { index: u32, frame_count: u32 },

    #[error("image is {width}x{height} but resolution {expected} was requested")]
    ResolutionMismatch {
        expected: u32,
        width: u32,
        height: u32,
    },

    #[error("resolution {0} cannot be stored in a cursor directory entry")]
    UnsupportedResolution(u32),

    #[error("animation declares {expected} frames but {actual} were supplied")]
    FrameCountMismatch { expected: u32, actual: usize },

    #[error("no output resolutions configured")]
    NoResolutions,

    #[error("invalid SVG: {0}")]
    Svg(#[from] roxmltree::Error),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CursorError>;
