//! Worksheet builder — picks segmentation, geometry and layout strategy per practice mode.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::geometry::{fit_rows_a4, resolve_a4};
use crate::layout::lookup::CharacterData;
use crate::layout::pagination::{
    paginate, AlphabetDrill, ExampleRowPolicy, ExampleTarget, LayoutStrategy, Page,
    PracticeSection,
};
use crate::layout::segmenter::{segment, unique_ordered, units_to_string, ContentUnit};
use crate::models::{GridSpec, GridType, InkOpacity, PracticeMode, PracticeSheetConfig, Script};

/// Target used by single-character practice when the text holds no usable character.
pub const DEFAULT_SINGLE_CHAR: char = '字';
pub const ALPHABET_REPEATS_PER_LETTER: usize = 5;
/// Units echoed in the layout debug log.
const LOG_PREVIEW_UNITS: usize = 16;

/// Fully laid-out worksheet, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub mode: PracticeMode,
    pub script: Script,
    pub title: String,
    /// Grid after cell-size resolution and grid-type overrides.
    pub grid: GridSpec,
    /// Row height; equals `grid.cell_size` except for four-line layouts.
    pub cell_height_px: u32,
    /// Glyph size relative to the configured font size.
    pub glyph_scale: f32,
    pub pages: Vec<Page>,
}

impl Worksheet {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Builds the worksheet for `config`, pulling stroke data from `data`.
pub fn build_worksheet(config: &PracticeSheetConfig, data: &dyn CharacterData) -> Worksheet {
    let mode = config.mode;
    let script = mode.script();
    let ink = config.text.opacity;

    let mut grid = config.grid.normalized();
    grid.cell_size = resolve_a4(grid.cols).cell_size_px;
    let mut cell_height_px = grid.cell_size;
    let mut glyph_scale = 1.0;

    let (units, strategy) = match mode {
        PracticeMode::Article => (
            segment(&config.text.content, script),
            LayoutStrategy::DenseFill { ink },
        ),
        PracticeMode::BlankPaper => (Vec::new(), LayoutStrategy::DenseFill { ink }),
        PracticeMode::StrokeOrder => {
            let units = unique_ordered(&segment(&config.text.content, script));
            let policy = stroke_order_policy(&units, data);
            (units, LayoutStrategy::ExampleRow(policy))
        }
        PracticeMode::SingleChar => {
            let target = config
                .text
                .content
                .trim()
                .chars()
                .next()
                .map_or_else(|| ContentUnit::new(DEFAULT_SINGLE_CHAR), ContentUnit::new);
            let policy = single_char_policy(target.clone(), ink);
            (vec![target], LayoutStrategy::ExampleRow(policy))
        }
        PracticeMode::English | PracticeMode::Pinyin => {
            let fit = fit_rows_a4(config.text.font_size, config.header_enabled());
            grid.grid_type = GridType::FourLine;
            cell_height_px = fit.cell_height_px;
            glyph_scale = if mode == PracticeMode::English { 0.8 } else { 0.6 };
            (
                segment(&config.text.content, script),
                LayoutStrategy::WordWrap { fit, ink },
            )
        }
        PracticeMode::Alphabet => (
            Vec::new(),
            LayoutStrategy::FixedAlphabet(AlphabetDrill {
                repeats_per_letter: ALPHABET_REPEATS_PER_LETTER,
                flag_examples: true,
                ink,
            }),
        ),
    };

    let mut pages = paginate(&units, &grid, &strategy);
    if let Some(label) = word_section_label(mode) {
        if !units.is_empty() {
            if let Some(first) = pages.first_mut().and_then(|p| p.rows.first_mut()) {
                first.section = Some(label.to_string());
            }
        }
    }

    debug!(
        mode = ?mode,
        units = units.len(),
        preview = %units_to_string(&units[..units.len().min(LOG_PREVIEW_UNITS)], script),
        pages = pages.len(),
        cell_size = grid.cell_size,
        "Worksheet laid out"
    );

    Worksheet {
        mode,
        script,
        title: config.display_title(),
        grid,
        cell_height_px,
        glyph_scale,
        pages,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

fn stroke_order_policy(units: &[ContentUnit], data: &dyn CharacterData) -> ExampleRowPolicy {
    let progressions: Vec<(ContentUnit, Vec<String>)> = units
        .iter()
        .filter_map(|unit| {
            let c = unit.text.chars().next()?;
            let steps = data.stroke_progression(c)?;
            Some((unit.clone(), steps.iter().map(|s| s.to_string()).collect()))
        })
        .collect();

    ExampleRowPolicy {
        target: ExampleTarget::EachDistinct,
        sections: vec![PracticeSection {
            title: Some("练习字符: {unit}".to_string()),
            rows: 1,
            example_rows: 1,
            tracing_rows: 1,
        }],
        tracing_ink: InkOpacity::Light,
        fade: None,
        progressions,
    }
}

fn single_char_policy(target: ContentUnit, ink: InkOpacity) -> ExampleRowPolicy {
    ExampleRowPolicy {
        target: ExampleTarget::Repeat(target),
        sections: vec![
            PracticeSection {
                title: Some("描红练习".to_string()),
                rows: 3,
                example_rows: 1,
                tracing_rows: 2,
            },
            PracticeSection {
                title: Some("临摹练习".to_string()),
                rows: 3,
                example_rows: 1,
                tracing_rows: 0,
            },
            PracticeSection {
                title: Some("默写练习".to_string()),
                rows: 4,
                example_rows: 0,
                tracing_rows: 0,
            },
        ],
        tracing_ink: ink,
        fade: None,
        progressions: Vec::new(),
    }
}

fn word_section_label(mode: PracticeMode) -> Option<&'static str> {
    match mode {
        PracticeMode::English => Some("Word Practice"),
        PracticeMode::Pinyin => Some("描红练习"),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::lookup::StaticCharacterTable;
    use crate::layout::pagination::CellRole;
    use crate::models::TextSpec;

    fn config(mode: PracticeMode, content: &str) -> PracticeSheetConfig {
        PracticeSheetConfig {
            mode,
            text: TextSpec {
                content: content.to_string(),
                ..TextSpec::default()
            },
            ..PracticeSheetConfig::default()
        }
    }

    fn build(mode: PracticeMode, content: &str) -> Worksheet {
        build_worksheet(&config(mode, content), &StaticCharacterTable)
    }

    #[test]
    fn test_article_fills_grid() {
        let sheet = build(PracticeMode::Article, "汉字练习".repeat(40).as_str());
        assert_eq!(sheet.pages.len(), 2, "160 characters over 120-cell pages");
        assert_eq!(sheet.grid.cell_size, 71);
        assert_eq!(sheet.title, "汉字练习字帖");
    }

    #[test]
    fn test_blank_paper_ignores_text() {
        let sheet = build(PracticeMode::BlankPaper, "汉字");
        assert_eq!(sheet.pages.len(), 1);
        assert!(sheet.pages[0].is_blank());
        assert_eq!(sheet.pages[0].rows.len(), 12);
    }

    #[test]
    fn test_stroke_order_uses_progressions() {
        let sheet = build(PracticeMode::StrokeOrder, "大大人龙");
        let rows = &sheet.pages[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cells[0].text(), Some("大"));
        assert_eq!(rows[0].cells[1].text(), Some("一"));
        assert_eq!(rows[1].cells[1].text(), Some("丿"));
        // no progression for 龙: the character itself is traced
        assert_eq!(rows[2].cells[1].text(), Some("龙"));
        assert_eq!(rows[2].section.as_deref(), Some("练习字符: 龙"));
    }

    #[test]
    fn test_stroke_order_empty_is_blank_grid() {
        let sheet = build(PracticeMode::StrokeOrder, "");
        assert_eq!(sheet.pages.len(), 1);
        assert_eq!(sheet.pages[0].rows.len(), 12);
        assert!(sheet.pages[0].rows.iter().all(|r| r.cells.len() == 10));
        assert!(sheet.pages[0].is_blank());
    }

    #[test]
    fn test_single_char_defaults_and_sections() {
        let sheet = build(PracticeMode::SingleChar, "  ");
        let rows = &sheet.pages[0].rows;
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].cells[0].text(), Some("字"));
        assert_eq!(rows[0].cells[0].role, CellRole::Example);

        let first = build(PracticeMode::SingleChar, "书法");
        assert_eq!(first.pages[0].rows[0].cells[0].text(), Some("书"));
    }

    #[test]
    fn test_single_char_takes_first_non_whitespace_char() {
        let sheet = build(PracticeMode::SingleChar, "  @字");
        let rows = &sheet.pages[0].rows;
        assert_eq!(rows[0].cells[0].text(), Some("@"));
        assert_eq!(rows[0].section.as_deref(), Some("描红练习"));
    }

    #[test]
    fn test_english_forces_four_line_and_fits_rows() {
        let sheet = build(PracticeMode::English, "the quick brown fox");
        assert_eq!(sheet.grid.grid_type, GridType::FourLine);
        assert_eq!(sheet.cell_height_px, 134);
        assert_eq!(sheet.pages[0].rows.len(), 6);
        assert_eq!(sheet.pages[0].rows[0].section.as_deref(), Some("Word Practice"));
        assert!((sheet.glyph_scale - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_english_without_words_has_no_section() {
        let sheet = build(PracticeMode::English, "123");
        assert!(sheet.pages[0].rows[0].section.is_none());
        assert!(sheet.pages[0].is_blank());
    }

    #[test]
    fn test_pinyin_segments_tone_marks() {
        let sheet = build(PracticeMode::Pinyin, "nǐ hǎo");
        let words: Vec<&str> = sheet.pages[0].unit_texts().collect();
        assert_eq!(words, vec!["nǐ", "hǎo"]);
        assert_eq!(sheet.script, Script::Pinyin);
    }

    #[test]
    fn test_alphabet_drill_flags_examples() {
        let sheet = build(PracticeMode::Alphabet, "ignored");
        let first = &sheet.pages[0].rows[0].cells;
        assert_eq!(first[0].role, CellRole::Example);
        assert_eq!(first[1].role, CellRole::Tracing);
        assert_eq!(first[5].text(), Some("B"));
        assert_eq!(sheet.pages.len(), 3, "260 cells over 120-cell pages");
    }
}
