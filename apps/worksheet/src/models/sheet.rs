//! Worksheet configuration — grid, text and mode settings as persisted by the host.
//!
//! Serialized as camelCase JSON so stored configurations stay readable by hand.
//! Defaults mirror a fresh session: article mode, 田字格 cells, 12 × 10 grid.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Grid
// ────────────────────────────────────────────────────────────────────────────

/// Guide lines drawn inside each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridType {
    /// 空白格 — no guides.
    Blank,
    /// 田字格 — horizontal and vertical cross.
    TianZi,
    /// 米字格 — cross plus both diagonals.
    MiZi,
    /// 四线格 — four horizontal writing lines, height follows the font size.
    FourLine,
}

impl GridType {
    pub fn label(&self) -> &'static str {
        match self {
            GridType::Blank => "空白格",
            GridType::TianZi => "田字格",
            GridType::MiZi => "米字格",
            GridType::FourLine => "四线格",
        }
    }
}

/// Grid geometry for one render pass.
///
/// `cell_size` and `rows` may be recomputed by the geometry resolver when `cols`
/// changes or the grid type needs height-driven row fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    #[serde(rename = "type")]
    pub grid_type: GridType,
    /// Cell edge length in pixels.
    #[serde(rename = "size")]
    pub cell_size: u32,
    pub rows: usize,
    pub cols: usize,
    /// Gap between cells in pixels.
    pub spacing: u32,
}

/// Widest grid that still fits the A4 content box at the 30 px cell floor.
pub const MAX_GRID_COLS: usize = 25;
pub const MAX_GRID_ROWS: usize = 100;
pub const MAX_GRID_SPACING_PX: u32 = 20;

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec {
            grid_type: GridType::TianZi,
            cell_size: 60,
            rows: 12,
            cols: 10,
            spacing: 2,
        }
    }
}

impl GridSpec {
    /// Returns a copy with `rows`, `cols` and `spacing` clamped to what a page can
    /// hold, and `cell_size > 0`.
    pub fn normalized(&self) -> GridSpec {
        GridSpec {
            grid_type: self.grid_type,
            cell_size: self.cell_size.max(1),
            rows: self.rows.clamp(1, MAX_GRID_ROWS),
            cols: self.cols.clamp(1, MAX_GRID_COLS),
            spacing: self.spacing.min(MAX_GRID_SPACING_PX),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text
// ────────────────────────────────────────────────────────────────────────────

/// Writing system of the practice content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Chinese,
    Pinyin,
    English,
}

/// How faint the guide text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkOpacity {
    Light,
    Medium,
    Dark,
}

impl InkOpacity {
    /// Alpha used by the on-screen preview.
    pub fn preview_alpha(&self) -> f32 {
        match self {
            InkOpacity::Light => 0.15,
            InkOpacity::Medium => 0.25,
            InkOpacity::Dark => 0.35,
        }
    }

    /// Alpha forced onto exported artifacts.
    pub fn export_alpha(&self) -> f32 {
        match self {
            InkOpacity::Light => 0.20,
            InkOpacity::Medium => 0.30,
            InkOpacity::Dark => 0.40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontType {
    ChineseRegular,
    ChineseCalligraphy,
    StrokeOrder,
    English,
    EnglishSerif,
    EnglishMono,
    EnglishHand,
}

impl FontType {
    pub fn is_latin(&self) -> bool {
        matches!(
            self,
            FontType::English | FontType::EnglishSerif | FontType::EnglishMono | FontType::EnglishHand
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpec {
    /// Raw user text; unbounded, may be empty.
    pub content: String,
    pub font: FontType,
    pub opacity: InkOpacity,
    /// Glyph size in pixels.
    #[serde(rename = "size")]
    pub font_size: u32,
    #[serde(default)]
    pub show_pinyin: bool,
    #[serde(default)]
    pub show_stroke_order: bool,
}

impl Default for TextSpec {
    fn default() -> Self {
        TextSpec {
            content: String::new(),
            font: FontType::ChineseRegular,
            opacity: InkOpacity::Light,
            font_size: 48,
            show_pinyin: false,
            show_stroke_order: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mode + sheet
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PracticeMode {
    /// 带笔顺字帖 — one row per distinct character with its stroke progression.
    StrokeOrder,
    /// 文章字帖 — free text filling every cell.
    Article,
    /// 单字强化帖 — one character across tracing, copying and recall sections.
    SingleChar,
    /// 英文字帖 — English words on four-line guides.
    English,
    /// 空格子纸 — empty grid paper.
    BlankPaper,
    /// 拼音字帖 — pinyin syllables on four-line guides.
    Pinyin,
    /// 字母字帖 — fixed A–Z / a–z letter drill.
    Alphabet,
}

impl PracticeMode {
    /// Script the mode's content is segmented as.
    pub fn script(&self) -> Script {
        match self {
            PracticeMode::English | PracticeMode::Alphabet => Script::English,
            PracticeMode::Pinyin => Script::Pinyin,
            _ => Script::Chinese,
        }
    }

    /// Human label used in export filenames.
    pub fn practice_type_label(&self) -> &'static str {
        match self {
            PracticeMode::StrokeOrder => "笔顺字帖",
            PracticeMode::Article => "文章字帖",
            PracticeMode::SingleChar => "单字练习",
            PracticeMode::English => "英文字帖",
            PracticeMode::BlankPaper => "空格子纸",
            PracticeMode::Pinyin => "拼音字帖",
            PracticeMode::Alphabet => "字母字帖",
        }
    }

    /// Title shown when the configuration does not carry one.
    pub fn default_title(&self) -> &'static str {
        match self {
            PracticeMode::StrokeOrder => "带笔顺练习字帖",
            PracticeMode::Article => "文章练习字帖",
            PracticeMode::SingleChar => "单字强化练习",
            PracticeMode::English => "English Practice Sheet",
            PracticeMode::BlankPaper => "练习格子纸",
            PracticeMode::Pinyin => "拼音练习字帖",
            PracticeMode::Alphabet => "Alphabet Practice Sheet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
}

/// Complete persisted worksheet configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSheetConfig {
    pub mode: PracticeMode,
    pub grid: GridSpec,
    pub text: TextSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub paper_size: PaperSize,
    #[serde(default)]
    pub include_header: Option<bool>,
    #[serde(default)]
    pub include_footer: Option<bool>,
}

impl Default for PracticeSheetConfig {
    fn default() -> Self {
        PracticeSheetConfig {
            mode: PracticeMode::Article,
            grid: GridSpec::default(),
            text: TextSpec::default(),
            title: Some("汉字练习字帖".to_string()),
            paper_size: PaperSize::A4,
            include_header: Some(true),
            include_footer: Some(false),
        }
    }
}

impl PracticeSheetConfig {
    pub fn header_enabled(&self) -> bool {
        self.include_header.unwrap_or(true)
    }

    pub fn footer_enabled(&self) -> bool {
        self.include_footer.unwrap_or(false)
    }

    /// Whether the sheet is worth previewing and exporting.
    ///
    /// Grid paper, article and alphabet sheets always are; modes that need practice
    /// text require non-blank content.
    pub fn has_content(&self) -> bool {
        match self.mode {
            PracticeMode::BlankPaper | PracticeMode::Article | PracticeMode::Alphabet => true,
            PracticeMode::StrokeOrder
            | PracticeMode::SingleChar
            | PracticeMode::English
            | PracticeMode::Pinyin => !self.text.content.trim().is_empty(),
        }
    }

    /// Title to print: the configured one unless blank, else the mode's default.
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => self.mode.default_title().to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
