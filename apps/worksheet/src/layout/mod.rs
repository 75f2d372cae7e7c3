// Layout engine: geometry, segmentation, pagination and per-mode worksheet assembly.
// Everything here is synchronous and pure; callers decide where it runs.

pub mod geometry;
pub mod lookup;
pub mod page_fill;
pub mod pagination;
pub mod segmenter;
pub mod sheet;

// Re-export the public API consumed by the renderer and the binary.
pub use lookup::{CharacterData, StaticCharacterTable};
pub use sheet::build_worksheet;
