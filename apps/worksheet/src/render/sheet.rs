//! Sheet Renderer — turns a laid-out `Worksheet` into a visual node tree.
//!
//! The tree is what a host displays and what the export pipeline clones, strips and
//! rasterizes. Nodes carry their own pixel sizes so any rasterizer can lay them out
//! by stacking children vertically (rows stack their cells horizontally).
//!
//! # Tree shape
//! ```text
//! Sheet (id = practice-sheet-preview)
//! ├── Toolbar            (excluded from export)
//! ├── Info               (excluded from export)
//! ├── Page 0
//! │   ├── Header         (optional, first page only)
//! │   ├── SectionLabel   (when a row starts a section)
//! │   ├── Row → Cell × cols
//! │   └── ...
//! ├── Page n
//! │   └── Footer         (optional, last page only)
//! ```

use serde::{Deserialize, Serialize};

use crate::layout::geometry::{
    PageGeometry, FOOTER_HEIGHT_PX, HEADER_HEIGHT_PX, ROW_SPACING_PX,
};
use crate::layout::lookup::CharacterData;
use crate::layout::pagination::{CellAssignment, CellRole};
use crate::layout::sheet::Worksheet;
use crate::models::{GridType, InkOpacity, PracticeMode, PracticeSheetConfig, Script, TextSpec};

/// DOM-style id of the printable sheet.
pub const PREVIEW_ID: &str = "practice-sheet-preview";

pub const SHEET_PADDING_PX: u32 = 16;
pub const TOOLBAR_HEIGHT_PX: u32 = 48;
pub const INFO_HEIGHT_PX: u32 = 24;
pub const SECTION_LABEL_HEIGHT_PX: u32 = 28;
pub const PAGE_GAP_PX: u32 = 24;
pub const EMPTY_STATE_HEIGHT_PX: u32 = 200;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetNode {
    pub id: Option<String>,
    pub kind: NodeKind,
    /// Interactive chrome that never reaches an exported artifact.
    pub exclude_from_export: bool,
    pub children: Vec<SheetNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Sheet { width_px: u32 },
    Toolbar { title: String },
    Info { text: String },
    EmptyState { message: String },
    Header { title: String, fields: Vec<String> },
    Page { index: usize },
    SectionLabel { text: String },
    Row { gap_px: u32 },
    Cell(CellNode),
    Footer { fields: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellNode {
    pub grid_type: GridType,
    pub width_px: u32,
    pub height_px: u32,
    pub text: Option<String>,
    pub role: CellRole,
    pub ink: InkOpacity,
    pub fade: f32,
    /// Glyph alpha actually drawn; preview or export values.
    pub alpha: f32,
    pub glyph_px: u32,
    pub pinyin: Option<String>,
    pub border_visible: bool,
}

/// Per-render switches taken from the stored configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub include_header: bool,
    pub include_footer: bool,
    /// False renders the empty-state prompt instead of pages.
    pub has_content: bool,
}

impl RenderOptions {
    pub fn from_config(config: &PracticeSheetConfig) -> Self {
        RenderOptions {
            include_header: config.header_enabled(),
            include_footer: config.footer_enabled(),
            has_content: config.has_content(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Node operations
// ────────────────────────────────────────────────────────────────────────────

impl SheetNode {
    fn new(kind: NodeKind) -> Self {
        SheetNode {
            id: None,
            kind,
            exclude_from_export: false,
            children: Vec::new(),
        }
    }

    fn excluded(kind: NodeKind) -> Self {
        SheetNode {
            exclude_from_export: true,
            ..SheetNode::new(kind)
        }
    }

    /// Depth-first search for the node with `id`.
    pub fn find(&self, id: &str) -> Option<&SheetNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Removes every descendant tagged `exclude_from_export`.
    pub fn strip_excluded(&mut self) {
        self.children.retain(|c| !c.exclude_from_export);
        for child in &mut self.children {
            child.strip_excluded();
        }
    }

    /// Forces export ink levels and visible cell borders throughout the subtree.
    pub fn apply_export_overrides(&mut self) {
        if let NodeKind::Cell(cell) = &mut self.kind {
            cell.alpha = if cell.text.is_some() {
                cell.ink.export_alpha() * cell.fade
            } else {
                0.0
            };
            cell.border_visible = true;
        }
        for child in &mut self.children {
            child.apply_export_overrides();
        }
    }

    /// All nodes in document order, self first.
    pub fn descendants(&self) -> Vec<&SheetNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellNode> {
        self.descendants().into_iter().filter_map(|n| match &n.kind {
            NodeKind::Cell(cell) => Some(cell),
            _ => None,
        })
    }

    /// Laid-out height in CSS pixels.
    pub fn height_px(&self) -> u32 {
        let children: u32 = self.children.iter().map(SheetNode::height_px).sum();
        match &self.kind {
            NodeKind::Sheet { .. } => children + 2 * SHEET_PADDING_PX,
            NodeKind::Toolbar { .. } => TOOLBAR_HEIGHT_PX,
            NodeKind::Info { .. } => INFO_HEIGHT_PX,
            NodeKind::EmptyState { .. } => EMPTY_STATE_HEIGHT_PX,
            NodeKind::Header { .. } => HEADER_HEIGHT_PX,
            NodeKind::Page { .. } => children + PAGE_GAP_PX,
            NodeKind::SectionLabel { .. } => SECTION_LABEL_HEIGHT_PX,
            NodeKind::Row { gap_px } => {
                let tallest = self.children.iter().map(SheetNode::height_px).max();
                tallest.unwrap_or(0) + gap_px
            }
            NodeKind::Cell(cell) => cell.height_px,
            NodeKind::Footer { .. } => FOOTER_HEIGHT_PX,
        }
    }

    /// Laid-out width; cells report their own, rows their sum, everything else fills.
    pub fn width_px(&self, available: u32) -> u32 {
        match &self.kind {
            NodeKind::Sheet { width_px } => *width_px,
            NodeKind::Cell(cell) => cell.width_px,
            NodeKind::Row { .. } => self.children.iter().map(|c| c.width_px(available)).sum(),
            _ => available,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Renders `worksheet` into a node tree rooted at the printable sheet.
pub fn render_sheet(
    worksheet: &Worksheet,
    text: &TextSpec,
    data: &dyn CharacterData,
    options: &RenderOptions,
) -> SheetNode {
    let geometry = PageGeometry::a4_portrait();
    let mut root = SheetNode::new(NodeKind::Sheet {
        width_px: geometry.width_px(),
    });
    root.id = Some(PREVIEW_ID.to_string());

    root.children.push(SheetNode::excluded(NodeKind::Toolbar {
        title: "字帖预览".to_string(),
    }));

    if !options.has_content {
        root.children.push(SheetNode::new(NodeKind::EmptyState {
            message: "请输入练习内容以生成字帖预览".to_string(),
        }));
        return root;
    }

    root.children.push(SheetNode::excluded(NodeKind::Info {
        text: format!(
            "{} · 共 {} 页 · {}",
            worksheet.mode.practice_type_label(),
            worksheet.page_count(),
            worksheet.grid.grid_type.label()
        ),
    }));

    let show_pinyin =
        text.show_pinyin && worksheet.script == Script::Chinese && !text.font.is_latin();
    let glyph_px = ((text.font_size as f32) * worksheet.glyph_scale).round() as u32;
    let last_index = worksheet.pages.len().saturating_sub(1);

    for (index, page) in worksheet.pages.iter().enumerate() {
        let mut page_node = SheetNode::new(NodeKind::Page { index });

        if index == 0 && options.include_header {
            page_node.children.push(SheetNode::new(NodeKind::Header {
                title: worksheet.title.clone(),
                fields: header_fields(worksheet, data),
            }));
        }

        for row in &page.rows {
            if let Some(section) = &row.section {
                page_node
                    .children
                    .push(SheetNode::new(NodeKind::SectionLabel { text: section.clone() }));
            }
            let mut row_node = SheetNode::new(NodeKind::Row {
                gap_px: row_gap(worksheet),
            });
            row_node.children = row
                .cells
                .iter()
                .map(|cell| {
                    let node = cell_node(worksheet, cell, glyph_px, show_pinyin, data);
                    SheetNode::new(NodeKind::Cell(node))
                })
                .collect();
            page_node.children.push(row_node);
        }

        if index == last_index && options.include_footer {
            page_node.children.push(SheetNode::new(NodeKind::Footer {
                fields: footer_fields(worksheet.mode),
            }));
        }

        root.children.push(page_node);
    }

    root
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

fn cell_node(
    worksheet: &Worksheet,
    cell: &CellAssignment,
    glyph_px: u32,
    show_pinyin: bool,
    data: &dyn CharacterData,
) -> CellNode {
    let text = cell.text().map(str::to_string);
    let pinyin = if show_pinyin {
        cell.text().and_then(single_char).and_then(|c| data.pinyin(c)).map(str::to_string)
    } else {
        None
    };

    CellNode {
        grid_type: worksheet.grid.grid_type,
        width_px: worksheet.grid.cell_size,
        height_px: worksheet.cell_height_px,
        text,
        role: cell.role,
        ink: cell.ink,
        fade: cell.fade,
        alpha: cell.alpha(),
        glyph_px,
        pinyin,
        border_visible: worksheet.grid.grid_type != GridType::Blank,
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn row_gap(worksheet: &Worksheet) -> u32 {
    match worksheet.grid.grid_type {
        GridType::FourLine => ROW_SPACING_PX,
        _ => worksheet.grid.spacing,
    }
}

const BLANK_FIELD: &str = "___________";

fn header_fields(worksheet: &Worksheet, data: &dyn CharacterData) -> Vec<String> {
    let field = |label: &str| format!("{label}: {BLANK_FIELD}");
    match worksheet.mode {
        PracticeMode::Article | PracticeMode::StrokeOrder => {
            vec![field("姓名"), field("练习日期"), field("签名")]
        }
        PracticeMode::SingleChar => {
            let target = worksheet
                .pages
                .first()
                .and_then(|p| p.unit_texts().next())
                .unwrap_or_default()
                .to_string();
            let pinyin = single_char(&target)
                .and_then(|c| data.pinyin(c))
                .unwrap_or_default()
                .to_string();
            vec![
                format!("练习汉字: {target}"),
                format!("拼音: {pinyin}"),
                field("姓名"),
            ]
        }
        PracticeMode::BlankPaper => vec![
            format!("格子类型: {}", worksheet.grid.grid_type.label()),
            format!("规格: {} × {}", worksheet.grid.rows, worksheet.grid.cols),
            field("姓名"),
        ],
        PracticeMode::Pinyin => vec!["拼音练习".to_string(), "四线格".to_string(), field("姓名")],
        PracticeMode::English | PracticeMode::Alphabet => {
            vec![field("Name"), field("Date"), field("Signature")]
        }
    }
}

fn footer_fields(mode: PracticeMode) -> Vec<String> {
    let labels: [&str; 3] = match mode.script() {
        Script::English => ["Practice Date", "Completion Time", "Signature"],
        _ => ["练习日期", "完成时间", "评分"],
    };
    labels
        .iter()
        .map(|label| format!("{label}: {BLANK_FIELD}"))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::lookup::StaticCharacterTable;
    use crate::layout::sheet::build_worksheet;

    fn render(config: &PracticeSheetConfig) -> SheetNode {
        let sheet = build_worksheet(config, &StaticCharacterTable);
        render_sheet(
            &sheet,
            &config.text,
            &StaticCharacterTable,
            &RenderOptions::from_config(config),
        )
    }

    fn article(content: &str) -> PracticeSheetConfig {
        let mut config = PracticeSheetConfig::default();
        config.text.content = content.to_string();
        config
    }

    fn count(root: &SheetNode, pred: impl Fn(&NodeKind) -> bool) -> usize {
        root.descendants().iter().filter(|n| pred(&n.kind)).count()
    }

    #[test]
    fn test_root_carries_preview_id() {
        let root = render(&article("汉字"));
        assert!(root.find(PREVIEW_ID).is_some());
        assert!(root.find("missing").is_none());
        assert!(matches!(root.kind, NodeKind::Sheet { width_px: 794 }));
    }

    #[test]
    fn test_cells_match_grid() {
        let root = render(&article("汉字练习"));
        assert_eq!(root.cells().count(), 120);
        assert_eq!(count(&root, |k| matches!(k, NodeKind::Page { .. })), 1);
        assert_eq!(count(&root, |k| matches!(k, NodeKind::Header { .. })), 1);
        assert_eq!(count(&root, |k| matches!(k, NodeKind::Footer { .. })), 0);
        let first = root.cells().next().unwrap();
        assert_eq!(first.text.as_deref(), Some("汉"));
        assert!((first.alpha - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_strip_excluded_removes_chrome_only() {
        let mut root = render(&article("汉字"));
        let before = root.cells().count();
        root.strip_excluded();
        assert_eq!(count(&root, |k| matches!(k, NodeKind::Toolbar { .. })), 0);
        assert_eq!(count(&root, |k| matches!(k, NodeKind::Info { .. })), 0);
        assert_eq!(root.cells().count(), before);
    }

    #[test]
    fn test_export_overrides_raise_alpha_and_borders() {
        let mut config = article("汉");
        config.grid.grid_type = GridType::Blank;
        let mut root = render(&config);
        assert!(!root.cells().next().unwrap().border_visible);

        root.apply_export_overrides();
        let cells: Vec<&CellNode> = root.cells().collect();
        assert!((cells[0].alpha - 0.20).abs() < 1e-6);
        assert_eq!(cells[1].alpha, 0.0);
        assert!(cells.iter().all(|c| c.border_visible));
    }

    #[test]
    fn test_pinyin_annotation_for_chinese_fonts_only() {
        let mut config = article("汉龙");
        config.text.show_pinyin = true;
        let root = render(&config);
        let cells: Vec<&CellNode> = root.cells().collect();
        assert_eq!(cells[0].pinyin.as_deref(), Some("hàn"));
        assert_eq!(cells[1].pinyin, None);

        config.text.font = crate::models::sheet::FontType::EnglishSerif;
        let root = render(&config);
        assert!(root.cells().all(|c| c.pinyin.is_none()));
    }

    #[test]
    fn test_empty_state_when_mode_needs_text() {
        let mut config = article("");
        config.mode = PracticeMode::StrokeOrder;
        let root = render(&config);
        assert_eq!(root.cells().count(), 0);
        assert_eq!(count(&root, |k| matches!(k, NodeKind::EmptyState { .. })), 1);
    }

    #[test]
    fn test_footer_on_last_page_and_height_accounts_for_it() {
        let mut config = article(&"字".repeat(130));
        config.include_footer = Some(true);
        let root = render(&config);
        let pages: Vec<&SheetNode> = root
            .children
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Page { .. }))
            .collect();
        assert_eq!(pages.len(), 2);
        assert!(matches!(pages[1].children.last().map(|n| &n.kind), Some(NodeKind::Footer { .. })));
        assert!(!pages[0].children.iter().any(|n| matches!(n.kind, NodeKind::Footer { .. })));

        // page 2: 12 rows of (71 + 2) + footer + gap
        assert_eq!(pages[1].height_px(), 12 * 73 + FOOTER_HEIGHT_PX + PAGE_GAP_PX);
    }

    #[test]
    fn test_section_labels_become_nodes() {
        let mut config = article("人大");
        config.mode = PracticeMode::StrokeOrder;
        let root = render(&config);
        let labels: Vec<String> = root
            .descendants()
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::SectionLabel { text } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["练习字符: 人", "练习字符: 大"]);
    }

    #[test]
    fn test_single_char_header_shows_pinyin() {
        let mut config = article("汉");
        config.mode = PracticeMode::SingleChar;
        let root = render(&config);
        let header = root
            .descendants()
            .into_iter()
            .find_map(|n| match &n.kind {
                NodeKind::Header { fields, .. } => Some(fields.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(header[0], "练习汉字: 汉");
        assert_eq!(header[1], "拼音: hàn");
    }
}
