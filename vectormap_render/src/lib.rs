//! Tile-driven rendering pipeline: visible-tile calculation, the painter
//! seam, the style-directed draw loop and collision-avoiding labels.

mod labels;
pub mod painter;
mod renderer;
mod skia;
pub mod viewport;

pub use painter::{PaintEvent, Painter, Pen, Rect, RecordingPainter, TextStyle};
pub use renderer::{PaintSetup, PointAnchor, paint_tiles};
pub use skia::PixmapPainter;
pub use viewport::{TILE_BASE_PX, Viewport, calc_visible_tiles};
