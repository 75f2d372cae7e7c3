//! Grid rasterizer — draws a sheet node tree into an RGBA canvas.
//!
//! There is no text shaping here: glyphs are drawn as ink blocks sized by the
//! cell's glyph size and blended at the cell's alpha, which is enough to keep
//! the printed guide text at the right position and weight. Grid lines, guide
//! strokes and the header/footer rules are drawn exactly.

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::export::pipeline::RasterCapture;
use crate::export::ExportError;
use crate::layout::pagination::CellRole;
use crate::models::GridType;
use crate::render::sheet::{CellNode, NodeKind, SheetNode, SHEET_PADDING_PX};

/// Upper bound on canvas area, in pixels (256 MiB of RGBA).
pub const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

const INK: [u8; 3] = [17, 24, 39];
const BORDER: [u8; 3] = [209, 213, 219];
const GUIDE: [u8; 3] = [252, 165, 165];
const RULE: [u8; 3] = [156, 163, 175];
const EXAMPLE_TINT: [u8; 3] = [254, 242, 242];

/// `RasterCapture` backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridRasterizer;

#[async_trait]
impl RasterCapture for GridRasterizer {
    async fn capture(&self, container: &SheetNode, scale: f32) -> Result<RgbaImage, ExportError> {
        let node = container.clone();
        tokio::task::spawn_blocking(move || rasterize(&node, scale))
            .await
            .map_err(|e| ExportError::CaptureFailed(format!("raster task panicked: {e}")))?
    }
}

/// Renders `root` at `scale` raster pixels per CSS pixel.
pub fn rasterize(root: &SheetNode, scale: f32) -> Result<RgbaImage, ExportError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(ExportError::CaptureFailed(format!("invalid scale {scale}")));
    }

    let width_css = root.width_px(0);
    let height_css = root.height_px();
    let width = (width_css as f32 * scale).round() as u32;
    let height = (height_css as f32 * scale).round() as u32;

    if width == 0 || height == 0 {
        return Err(ExportError::CaptureFailed("nothing to capture".into()));
    }
    if width as u64 * height as u64 > MAX_CANVAS_PIXELS {
        return Err(ExportError::CaptureFailed(format!(
            "canvas {width}×{height} exceeds the size limit"
        )));
    }

    let mut canvas = Canvas {
        image: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
        scale,
    };
    canvas.node(root, 0, 0, width_css);

    debug!(width, height, scale, "Sheet rasterized");
    Ok(canvas.image)
}

// ────────────────────────────────────────────────────────────────────────────
// Layout walk
// ────────────────────────────────────────────────────────────────────────────

struct Canvas {
    image: RgbaImage,
    scale: f32,
}

impl Canvas {
    /// Draws `node` with its top-left at CSS `(x, y)`.
    fn node(&mut self, node: &SheetNode, x: u32, y: u32, available: u32) {
        match &node.kind {
            NodeKind::Sheet { width_px } => {
                let inner = width_px.saturating_sub(2 * SHEET_PADDING_PX);
                self.stack(&node.children, x + SHEET_PADDING_PX, y + SHEET_PADDING_PX, inner);
            }
            NodeKind::Page { .. } => self.stack(&node.children, x, y, available),
            NodeKind::Row { .. } => {
                let row_width = node.width_px(available);
                if row_width > available {
                    warn!(row_width, available, "Row wider than the content box; clipping");
                }
                let mut cx = x + available.saturating_sub(row_width) / 2;
                for child in &node.children {
                    self.node(child, cx, y, available);
                    cx += child.width_px(available);
                }
            }
            NodeKind::Cell(cell) => self.cell(cell, x, y),
            NodeKind::Header { title, fields } => {
                let h = node.height_px();
                let title_w = (title.chars().count() as u32 * 24).min(available);
                self.fill(x + (available - title_w) / 2, y + 24, title_w, 24, INK, 0.85);
                self.field_marks(fields.len(), x, y + 72, available);
                self.fill(x, y + h - 8, available, 2, RULE, 1.0);
            }
            NodeKind::Footer { fields } => {
                self.fill(x, y + 8, available, 1, RULE, 1.0);
                self.field_marks(fields.len(), x, y + 28, available);
            }
            NodeKind::SectionLabel { text } => {
                let w = (text.chars().count() as u32 * 14).min(available);
                self.fill(x, y + 8, w, 14, INK, 0.6);
            }
            NodeKind::EmptyState { message } => {
                let h = node.height_px();
                let w = (message.chars().count() as u32 * 14).min(available);
                self.fill(x + (available - w) / 2, y + h / 2 - 7, w, 14, RULE, 0.6);
            }
            NodeKind::Toolbar { .. } => self.fill(x, y, available, node.height_px(), BORDER, 0.5),
            NodeKind::Info { .. } => self.fill(x, y + 8, available / 3, 10, RULE, 0.5),
        }
    }

    fn stack(&mut self, children: &[SheetNode], x: u32, mut y: u32, available: u32) {
        for child in children {
            self.node(child, x, y, available);
            y += child.height_px();
        }
    }

    /// Short underlines standing in for `label: ______` fields, evenly spread.
    fn field_marks(&mut self, count: usize, x: u32, y: u32, available: u32) {
        if count == 0 {
            return;
        }
        let slot = available / count as u32;
        for i in 0..count as u32 {
            self.fill(x + i * slot + 8, y, slot.saturating_sub(16), 1, INK, 0.7);
        }
    }

    fn cell(&mut self, cell: &CellNode, x: u32, y: u32) {
        let (w, h) = (cell.width_px, cell.height_px);

        if cell.role == CellRole::Example {
            self.fill(x, y, w, h, EXAMPLE_TINT, 1.0);
        }

        match cell.grid_type {
            GridType::TianZi => {
                self.dashed_h(x, y + h / 2, w, GUIDE);
                self.dashed_v(x + w / 2, y, h, GUIDE);
            }
            GridType::MiZi => {
                self.dashed_h(x, y + h / 2, w, GUIDE);
                self.dashed_v(x + w / 2, y, h, GUIDE);
                self.diagonal(x, y, w, h, false);
                self.diagonal(x, y, w, h, true);
            }
            GridType::FourLine => {
                for i in 1..4 {
                    let ly = y + h * i / 4;
                    if i == 2 {
                        self.dashed_h(x, ly, w, GUIDE);
                    } else {
                        self.fill(x, ly, w, 1, GUIDE, 1.0);
                    }
                }
            }
            GridType::Blank => {}
        }

        if cell.border_visible {
            self.outline(x, y, w, h, BORDER);
        }

        if cell.text.is_some() && cell.alpha > 0.0 {
            let side = (cell.glyph_px as f32 * 0.7).round() as u32;
            let side = side.min(w).min(h);
            self.fill(x + (w - side) / 2, y + (h - side) / 2, side, side, INK, cell.alpha);
        }

        if cell.pinyin.is_some() {
            let pw = w / 2;
            self.fill(x + (w - pw) / 2, y + 2, pw, 3, INK, 0.5);
        }
    }

    // ── primitives (CSS coordinates, scaled on write) ───────────────────────

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3], alpha: f32) {
        if w == 0 || h == 0 {
            return;
        }
        let x0 = self.px(x);
        let y0 = self.px(y);
        let x1 = self.px(x + w).max(x0 + 1).min(self.image.width());
        let y1 = self.px(y + h).max(y0 + 1).min(self.image.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color, alpha);
            }
        }
    }

    fn outline(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        self.fill(x, y, w, 1, color, 1.0);
        self.fill(x, y + h.saturating_sub(1), w, 1, color, 1.0);
        self.fill(x, y, 1, h, color, 1.0);
        self.fill(x + w.saturating_sub(1), y, 1, h, color, 1.0);
    }

    fn dashed_h(&mut self, x: u32, y: u32, w: u32, color: [u8; 3]) {
        for dx in (0..w).step_by(6) {
            self.fill(x + dx, y, 3.min(w - dx), 1, color, 1.0);
        }
    }

    fn dashed_v(&mut self, x: u32, y: u32, h: u32, color: [u8; 3]) {
        for dy in (0..h).step_by(6) {
            self.fill(x, y + dy, 1, 3.min(h - dy), color, 1.0);
        }
    }

    /// Dotted corner-to-corner guide; `rising` goes bottom-left to top-right.
    fn diagonal(&mut self, x: u32, y: u32, w: u32, h: u32, rising: bool) {
        let steps = (w.max(h) as f32 * self.scale) as u32;
        for i in (0..steps).step_by(4) {
            let t = i as f32 / steps.max(1) as f32;
            let fx = x as f32 + t * w as f32;
            let fy = if rising {
                (y + h) as f32 - t * h as f32
            } else {
                y as f32 + t * h as f32
            };
            let px = (fx * self.scale) as u32;
            let py = (fy * self.scale) as u32;
            if px < self.image.width() && py < self.image.height() {
                self.blend(px, py, GUIDE, 1.0);
            }
        }
    }

    fn px(&self, css: u32) -> u32 {
        (css as f32 * self.scale).round() as u32
    }

    fn blend(&mut self, px: u32, py: u32, color: [u8; 3], alpha: f32) {
        if px >= self.image.width() || py >= self.image.height() {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        let pixel = self.image.get_pixel_mut(px, py);
        for (channel, c) in pixel.0.iter_mut().zip(color) {
            *channel = (*channel as f32 * (1.0 - a) + c as f32 * a).round() as u8;
        }
        pixel.0[3] = 255;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::lookup::StaticCharacterTable;
    use crate::layout::sheet::build_worksheet;
    use crate::models::sheet::MAX_GRID_COLS;
    use crate::models::{InkOpacity, PracticeSheetConfig};
    use crate::render::sheet::{render_sheet, RenderOptions};

    fn is_white(pixel: &Rgba<u8>) -> bool {
        pixel.0[..3] == [255, 255, 255]
    }

    fn sheet(config: &PracticeSheetConfig) -> SheetNode {
        let worksheet = build_worksheet(config, &StaticCharacterTable);
        render_sheet(
            &worksheet,
            &config.text,
            &StaticCharacterTable,
            &RenderOptions::from_config(config),
        )
    }

    fn single_cell(cell: CellNode) -> SheetNode {
        let row = SheetNode {
            id: None,
            kind: NodeKind::Row { gap_px: 0 },
            exclude_from_export: false,
            children: vec![SheetNode {
                id: None,
                kind: NodeKind::Cell(cell),
                exclude_from_export: false,
                children: vec![],
            }],
        };
        SheetNode {
            id: None,
            kind: NodeKind::Sheet { width_px: 100 },
            exclude_from_export: false,
            children: vec![row],
        }
    }

    fn cell(grid_type: GridType, alpha: f32) -> CellNode {
        CellNode {
            grid_type,
            width_px: 60,
            height_px: 60,
            text: Some("永".into()),
            role: CellRole::Normal,
            ink: InkOpacity::Dark,
            fade: 1.0,
            alpha,
            glyph_px: 48,
            pinyin: None,
            border_visible: true,
        }
    }

    #[test]
    fn test_canvas_matches_scaled_layout_size() {
        let root = sheet(&PracticeSheetConfig::default());
        let image = rasterize(&root, 2.0).unwrap();
        assert_eq!(image.width(), 794 * 2);
        assert_eq!(image.height(), root.height_px() * 2);
    }

    #[test]
    fn test_invalid_scale_fails_capture() {
        let root = sheet(&PracticeSheetConfig::default());
        let err = rasterize(&root, 0.0).unwrap_err();
        assert_eq!(err.reason(), "capture-failed");
    }

    #[test]
    fn test_oversized_canvas_fails_capture() {
        let root = sheet(&PracticeSheetConfig::default());
        assert!(rasterize(&root, 40.0).is_err());
    }

    #[test]
    fn test_canvas_just_over_limit_fails_before_allocating() {
        let root = sheet(&PracticeSheetConfig::default());
        let area = f64::from(root.width_px(0)) * f64::from(root.height_px());
        let scale = ((MAX_CANVAS_PIXELS as f64 / area).sqrt() * 1.05) as f32;
        let err = rasterize(&root, scale).unwrap_err();
        assert_eq!(err.reason(), "capture-failed");
        assert!(err.to_string().contains("size limit"));
        assert!(MAX_CANVAS_PIXELS * 4 <= 256 * 1024 * 1024);
    }

    #[test]
    fn test_wide_grid_rows_stay_inside_content_box() {
        let mut config = PracticeSheetConfig::default();
        config.grid.cols = 40;
        config.text.content = "永".repeat(60);
        let root = sheet(&config);
        let inner = 794 - 2 * SHEET_PADDING_PX;

        let rows: Vec<&SheetNode> = root
            .descendants()
            .into_iter()
            .filter(|n| matches!(n.kind, NodeKind::Row { .. }))
            .collect();
        assert!(!rows.is_empty());
        for row in rows {
            assert_eq!(row.children.len(), MAX_GRID_COLS);
            assert!(row.width_px(inner) <= inner);
        }

        let image = rasterize(&root, 1.0).unwrap();
        assert_eq!(image.width(), 794);
    }

    #[test]
    fn test_glyph_alpha_controls_darkness() {
        let dark = rasterize(&single_cell(cell(GridType::Blank, 0.4)), 1.0).unwrap();
        let light = rasterize(&single_cell(cell(GridType::Blank, 0.2)), 1.0).unwrap();
        // 60 px cell centred in the 68 px content box: x 20..80, y 16..76
        let d = dark.get_pixel(50, 46).0[0];
        let l = light.get_pixel(50, 46).0[0];
        assert!(d < l, "dark {d} should be darker than light {l}");
        assert!(l < 255);
    }

    #[test]
    fn test_blank_cell_has_no_ink() {
        let mut blank = cell(GridType::Blank, 0.0);
        blank.text = None;
        let image = rasterize(&single_cell(blank), 1.0).unwrap();
        assert!(is_white(image.get_pixel(50, 40)));
    }

    #[test]
    fn test_tian_zi_guides_are_drawn() {
        let mut c = cell(GridType::TianZi, 0.0);
        c.text = None;
        let image = rasterize(&single_cell(c), 1.0).unwrap();
        // horizontal guide row at the cell's vertical centre (16 + 30)
        let inked = (20..80).filter(|&x| !is_white(image.get_pixel(x, 46))).count();
        assert!(inked > 20);
    }

    #[test]
    fn test_hidden_border_leaves_edge_white() {
        let mut c = cell(GridType::Blank, 0.0);
        c.text = None;
        c.border_visible = false;
        let image = rasterize(&single_cell(c), 1.0).unwrap();
        assert!(is_white(image.get_pixel(50, 16)));
    }

    #[tokio::test]
    async fn test_capture_trait_runs_rasterizer() {
        let root = single_cell(cell(GridType::MiZi, 0.3));
        let image = GridRasterizer.capture(&root, 1.5).await.unwrap();
        assert_eq!(image.width(), 150);
    }
}
