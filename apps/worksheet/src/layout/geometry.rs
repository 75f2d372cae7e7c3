//! Grid Geometry — converts physical page dimensions into cell sizes and row counts.
//!
//! Two operations:
//! - `resolve` derives a square cell size from the column count (character grids).
//! - `fit_rows` derives cell height and row count from the font size (four-line
//!   guides used by English and pinyin sheets).
//!
//! Both are pure and total: out-of-range inputs are clamped, never rejected.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Page constants
// ────────────────────────────────────────────────────────────────────────────

/// 96 DPI ÷ 25.4 mm/in, rounded the way browsers round it.
pub const PX_PER_MM: f32 = 3.78;
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
/// Margin applied on each side of an exported page.
pub const PAGE_MARGIN_MM: f32 = 10.0;

/// A4 height in CSS pixels at 96 DPI.
pub const A4_HEIGHT_PX: u32 = 1123;
pub const HEADER_HEIGHT_PX: u32 = 120;
pub const FOOTER_HEIGHT_PX: u32 = 60;
/// Top + bottom margins combined.
pub const VERTICAL_MARGINS_PX: u32 = 80;
/// Gap below each four-line row.
pub const ROW_SPACING_PX: u32 = 8;

pub const MIN_CELL_SIZE_PX: u32 = 30;
pub const MAX_CELL_SIZE_PX: u32 = 80;
/// Four-line cells need room for ascenders and descenders regardless of font size.
pub const MIN_LINE_CELL_HEIGHT_PX: u32 = 100;
const LINE_CELL_HEIGHT_PER_FONT_PX: f32 = 2.8;
/// Font sizes above this are treated as this size when fitting rows.
pub const MAX_FONT_SIZE_PX: u32 = 400;
pub const MIN_FITTED_ROWS: usize = 6;

// ────────────────────────────────────────────────────────────────────────────
// Page geometry
// ────────────────────────────────────────────────────────────────────────────

/// Physical page used for layout and export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    /// Margin on each side.
    pub margin_mm: f32,
    pub px_per_mm: f32,
}

impl PageGeometry {
    pub fn a4_portrait() -> PageGeometry {
        PageGeometry {
            width_mm: A4_WIDTH_MM,
            height_mm: A4_HEIGHT_MM,
            margin_mm: PAGE_MARGIN_MM,
            px_per_mm: PX_PER_MM,
        }
    }

    /// Page width in CSS pixels (≈ 794 for A4).
    pub fn width_px(&self) -> u32 {
        (self.width_mm * self.px_per_mm).round() as u32
    }

    pub fn content_width_mm(&self) -> f32 {
        (self.width_mm - 2.0 * self.margin_mm).max(0.0)
    }

    pub fn content_height_mm(&self) -> f32 {
        (self.height_mm - 2.0 * self.margin_mm).max(0.0)
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::a4_portrait()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolver outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSize {
    pub cell_size_px: u32,
}

/// Height-driven row fit for four-line layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFit {
    pub cell_height_px: u32,
    pub rows: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Computes the square cell size for `cols` columns across the usable page width.
///
/// `margin_mm` is the total horizontal margin (both sides). The result is clamped
/// to `[MIN_CELL_SIZE_PX, MAX_CELL_SIZE_PX]`; `cols == 0` is treated as one column.
pub fn resolve(cols: usize, page_width_mm: f32, margin_mm: f32) -> CellSize {
    let usable_width_px = (page_width_mm - margin_mm).max(0.0) * PX_PER_MM;
    let raw = (usable_width_px / cols.max(1) as f32).floor() as u32;
    CellSize {
        cell_size_px: raw.clamp(MIN_CELL_SIZE_PX, MAX_CELL_SIZE_PX),
    }
}

/// Cell size for `cols` columns on an A4 page with 10 mm side margins.
pub fn resolve_a4(cols: usize) -> CellSize {
    resolve(cols, A4_WIDTH_MM, 2.0 * PAGE_MARGIN_MM)
}

/// Computes cell height and row count for four-line guides.
///
/// Cell height is `font_size × 2.8` floored at 100 px. Rows are whatever fits in the
/// height left after header, footer and margins, never fewer than 6; a huge font
/// still yields a usable sheet, it just runs past the page. Font sizes are clamped
/// to [`MAX_FONT_SIZE_PX`].
pub fn fit_rows(
    font_size: u32,
    page_height_px: u32,
    header_height_px: u32,
    footer_height_px: u32,
    margins_px: u32,
) -> RowFit {
    let font_size = font_size.min(MAX_FONT_SIZE_PX);
    let scaled = (font_size as f32 * LINE_CELL_HEIGHT_PER_FONT_PX).round() as u32;
    let cell_height_px = scaled.max(MIN_LINE_CELL_HEIGHT_PX);

    let available = page_height_px
        .saturating_sub(header_height_px)
        .saturating_sub(footer_height_px)
        .saturating_sub(margins_px);
    let rows = (available / cell_height_px.saturating_add(ROW_SPACING_PX)) as usize;

    RowFit {
        cell_height_px,
        rows: rows.max(MIN_FITTED_ROWS),
    }
}

/// `fit_rows` on an A4 page with the standard footer and margins.
pub fn fit_rows_a4(font_size: u32, include_header: bool) -> RowFit {
    let header = if include_header { HEADER_HEIGHT_PX } else { 0 };
    fit_rows(
        font_size,
        A4_HEIGHT_PX,
        header,
        FOOTER_HEIGHT_PX,
        VERTICAL_MARGINS_PX,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
