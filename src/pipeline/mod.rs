pub mod ani_config;
pub mod compositor;
pub mod diagnostics;
pub mod drawing;
pub mod error;
pub mod fs_ops;
pub mod generator;
pub mod hotspot;
pub mod png_writer;
pub mod rasterizer;
pub mod wincur;

pub use diagnostics::Diagnostics;
pub use drawing::DrawingSource;
pub use error::CursorError;
pub use generator::{GeneratedCursor, generate};
