//! Pagination Engine — assigns content units to cells, rows and pages.
//!
//! # Strategies
//! - `DenseFill`: row-major fill of every cell, `rows × cols` per page (article mode).
//! - `ExampleRow`: one dark example cell followed by tracing cells, grouped into
//!   sections (stroke-order and single-character modes).
//! - `FixedAlphabet`: A–Z then a–z, ignoring the input units (letter drills).
//! - `WordWrap`: dense fill whose rows per page come from `fit_rows`, so capacity
//!   follows the font size (English and pinyin modes).
//!
//! # Invariants
//! - Every row has exactly `grid.cols` cells; short rows are padded with blanks.
//! - Unit order is preserved.
//! - `paginate` is a pure function of its inputs.
//! - At least one page is always produced.

use serde::{Deserialize, Serialize};

use crate::layout::geometry::RowFit;
use crate::layout::segmenter::ContentUnit;
use crate::models::{GridSpec, InkOpacity};

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// Visual role of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellRole {
    /// Practice text at the configured ink.
    Normal,
    /// Dark model glyph, highlighted.
    Example,
    /// Faint glyph to write over.
    Tracing,
    /// Empty cell.
    Blank,
}

/// Floor for progressively faded tracing cells so the last column stays visible.
const MIN_FADE: f32 = 0.05;

/// The unit (if any) placed in one cell and how it is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellAssignment {
    pub unit: Option<ContentUnit>,
    pub role: CellRole,
    pub ink: InkOpacity,
    /// Multiplier on the ink alpha, 1.0 unless tracing cells fade out.
    pub fade: f32,
}

impl CellAssignment {
    pub fn blank() -> Self {
        CellAssignment {
            unit: None,
            role: CellRole::Blank,
            ink: InkOpacity::Light,
            fade: 1.0,
        }
    }

    fn with_unit(unit: ContentUnit, role: CellRole, ink: InkOpacity) -> Self {
        CellAssignment {
            unit: Some(unit),
            role,
            ink,
            fade: 1.0,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.role == CellRole::Blank
    }

    pub fn text(&self) -> Option<&str> {
        self.unit.as_ref().map(|u| u.text.as_str())
    }

    /// Effective preview alpha for the glyph (0 for blank cells).
    pub fn alpha(&self) -> f32 {
        if self.unit.is_none() {
            return 0.0;
        }
        self.ink.preview_alpha() * self.fade
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<CellAssignment>,
    /// Heading printed above this row; set on the first row of a section.
    pub section: Option<String>,
}

impl Row {
    fn blank(cols: usize) -> Row {
        Row {
            cells: vec![CellAssignment::blank(); cols],
            section: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub rows: Vec<Row>,
}

impl Page {
    /// Non-blank unit texts in reading order.
    pub fn unit_texts(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| !c.is_blank())
            .filter_map(|c| c.text())
    }

    pub fn is_blank(&self) -> bool {
        self.rows.iter().flat_map(|r| r.cells.iter()).all(|c| c.is_blank())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy types
// ────────────────────────────────────────────────────────────────────────────

/// Placement policy selected per practice mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutStrategy {
    DenseFill { ink: InkOpacity },
    ExampleRow(ExampleRowPolicy),
    FixedAlphabet(AlphabetDrill),
    WordWrap { fit: RowFit, ink: InkOpacity },
}

/// Which units get example rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExampleTarget {
    /// Every distinct unit, capped at the configured row count.
    EachDistinct,
    /// One unit repeated through every section.
    Repeat(ContentUnit),
}

/// A block of rows practising one target.
///
/// Within the section, row `r` carries an example in cell 0 when
/// `r < example_rows` and tracing glyphs in cells 1.. when `r < tracing_rows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSection {
    /// Heading; `{unit}` is replaced with the target's text.
    pub title: Option<String>,
    pub rows: usize,
    pub example_rows: usize,
    pub tracing_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRowPolicy {
    pub target: ExampleTarget,
    pub sections: Vec<PracticeSection>,
    pub tracing_ink: InkOpacity,
    /// Per-column alpha multiplier for tracing cells (e.g. 0.85); `None` = flat.
    pub fade: Option<f32>,
    /// Tracing glyphs per target; cell `i` shows `steps[min(i - 1, len - 1)]`.
    pub progressions: Vec<(ContentUnit, Vec<String>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphabetDrill {
    pub repeats_per_letter: usize,
    /// Mark each letter's first cell as an example and its repeats as tracing.
    pub flag_examples: bool,
    pub ink: InkOpacity,
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// Partitions `units` into pages according to `strategy`.
pub fn paginate(units: &[ContentUnit], grid: &GridSpec, strategy: &LayoutStrategy) -> Vec<Page> {
    let grid = grid.normalized();
    match strategy {
        LayoutStrategy::DenseFill { ink } => {
            fill_pages(normal_cells(units, *ink), grid.rows, grid.cols)
        }
        LayoutStrategy::WordWrap { fit, ink } => {
            fill_pages(normal_cells(units, *ink), fit.rows.max(1), grid.cols)
        }
        LayoutStrategy::FixedAlphabet(drill) => {
            fill_pages(alphabet_cells(drill), grid.rows, grid.cols)
        }
        LayoutStrategy::ExampleRow(policy) => example_row_pages(units, &grid, policy),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dense fill
// ────────────────────────────────────────────────────────────────────────────

fn normal_cells(units: &[ContentUnit], ink: InkOpacity) -> Vec<CellAssignment> {
    units
        .iter()
        .map(|u| CellAssignment::with_unit(u.clone(), CellRole::Normal, ink))
        .collect()
}

/// Lays cells out row-major, `rows_per_page × cols` per page, padding the tail.
///
/// Produces `max(1, ceil(n / capacity))` pages, each exactly `rows_per_page` rows.
fn fill_pages(cells: Vec<CellAssignment>, rows_per_page: usize, cols: usize) -> Vec<Page> {
    let capacity = rows_per_page.saturating_mul(cols).max(1);
    let page_count = cells.len().div_ceil(capacity).max(1);

    let mut remaining = cells.into_iter();
    (0..page_count)
        .map(|_| {
            let rows = (0..rows_per_page)
                .map(|_| {
                    let mut row_cells: Vec<CellAssignment> = remaining.by_ref().take(cols).collect();
                    row_cells.resize(cols, CellAssignment::blank());
                    Row {
                        cells: row_cells,
                        section: None,
                    }
                })
                .collect();
            Page { rows }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Fixed alphabet
// ────────────────────────────────────────────────────────────────────────────

fn alphabet_cells(drill: &AlphabetDrill) -> Vec<CellAssignment> {
    let repeats = drill.repeats_per_letter.max(1);
    ('A'..='Z')
        .chain('a'..='z')
        .flat_map(|letter| {
            (0..repeats).map(move |i| {
                let unit = ContentUnit::new(letter);
                match (drill.flag_examples, i) {
                    (true, 0) => CellAssignment::with_unit(unit, CellRole::Example, InkOpacity::Dark),
                    (true, _) => CellAssignment::with_unit(unit, CellRole::Tracing, drill.ink),
                    (false, _) => CellAssignment::with_unit(unit, CellRole::Normal, drill.ink),
                }
            })
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Example rows
// ────────────────────────────────────────────────────────────────────────────

fn example_row_pages(units: &[ContentUnit], grid: &GridSpec, policy: &ExampleRowPolicy) -> Vec<Page> {
    let targets = resolve_targets(units, grid, &policy.target);
    if targets.is_empty() {
        // Nothing to practise: one page of the configured blank grid.
        return vec![Page {
            rows: (0..grid.rows).map(|_| Row::blank(grid.cols)).collect(),
        }];
    }

    let mut rows = Vec::new();
    for target in &targets {
        let steps = policy
            .progressions
            .iter()
            .find(|(unit, _)| unit == target)
            .map(|(_, steps)| steps.as_slice())
            .filter(|steps| !steps.is_empty());

        for section in policy.sections.iter().filter(|s| s.rows > 0) {
            for r in 0..section.rows {
                let mut row = build_example_row(target, steps, section, r, grid.cols, policy);
                if r == 0 {
                    row.section = section
                        .title
                        .as_ref()
                        .map(|t| t.replace("{unit}", &target.text));
                }
                rows.push(row);
            }
        }
    }

    if rows.is_empty() {
        return vec![Page {
            rows: (0..grid.rows).map(|_| Row::blank(grid.cols)).collect(),
        }];
    }

    rows.chunks(grid.rows)
        .map(|chunk| Page {
            rows: chunk.to_vec(),
        })
        .collect()
}

/// Picks the units that get sections.
///
/// `EachDistinct` keeps first occurrences and stops at `grid.rows` targets; the rest
/// are dropped, so the sheet previews only the first window of characters.
fn resolve_targets(units: &[ContentUnit], grid: &GridSpec, target: &ExampleTarget) -> Vec<ContentUnit> {
    if units.is_empty() {
        return Vec::new();
    }
    match target {
        ExampleTarget::Repeat(unit) => vec![unit.clone()],
        ExampleTarget::EachDistinct => {
            let mut distinct: Vec<ContentUnit> = Vec::new();
            for unit in units {
                if !distinct.contains(unit) {
                    distinct.push(unit.clone());
                }
                if distinct.len() == grid.rows {
                    break;
                }
            }
            distinct
        }
    }
}

fn build_example_row(
    target: &ContentUnit,
    steps: Option<&[String]>,
    section: &PracticeSection,
    r: usize,
    cols: usize,
    policy: &ExampleRowPolicy,
) -> Row {
    let cells = (0..cols)
        .map(|col| {
            if col == 0 {
                return if r < section.example_rows {
                    CellAssignment::with_unit(target.clone(), CellRole::Example, InkOpacity::Dark)
                } else {
                    CellAssignment::blank()
                };
            }
            if r >= section.tracing_rows {
                return CellAssignment::blank();
            }

            let text = match steps {
                Some(steps) => steps[(col - 1).min(steps.len() - 1)].clone(),
                None => target.text.clone(),
            };
            let fade = policy
                .fade
                .map(|f| f.powi(col as i32 - 1).max(MIN_FADE))
                .unwrap_or(1.0);

            CellAssignment {
                unit: Some(ContentUnit::new(text)),
                role: CellRole::Tracing,
                ink: policy.tracing_ink,
                fade,
            }
        })
        .collect();

    Row {
        cells,
        section: None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
