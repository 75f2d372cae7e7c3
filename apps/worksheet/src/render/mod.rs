// Rendering: worksheet → node tree for display and export, and node tree → raster.

pub mod raster;
pub mod sheet;

pub use raster::GridRasterizer;
pub use sheet::{render_sheet, RenderOptions, PREVIEW_ID};
