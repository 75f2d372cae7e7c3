//! Page Fill Analysis — how much of the laid-out worksheet carries content.
//!
//! Used for logging after layout: a sheet whose last page is nearly empty usually
//! means the grid could be shrunk, and a fully blank sheet means the text held
//! nothing the mode could place.

use serde::{Deserialize, Serialize};

use crate::layout::pagination::Page;

/// Last-page fill at or above this ratio counts as well used.
const FULL_PAGE_RATIO: f32 = 0.92;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFillVerdict {
    /// Every page is at least 92% filled.
    Full,
    /// The last page trails off.
    PartialLastPage,
    /// No cell carries content.
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFillAnalysis {
    pub pages: usize,
    pub filled_cells: usize,
    pub total_cells: usize,
    pub fill_ratio: f32,
    pub last_page_ratio: f32,
    pub verdict: PageFillVerdict,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

pub fn analyze_page_fill(pages: &[Page]) -> PageFillAnalysis {
    let (filled_cells, total_cells) = pages.iter().map(count_cells).fold((0, 0), |acc, c| {
        (acc.0 + c.0, acc.1 + c.1)
    });
    let last_page_ratio = pages.last().map(|p| ratio(count_cells(p))).unwrap_or(0.0);

    let verdict = if pages.iter().all(Page::is_blank) {
        PageFillVerdict::Blank
    } else if last_page_ratio >= FULL_PAGE_RATIO {
        PageFillVerdict::Full
    } else {
        PageFillVerdict::PartialLastPage
    };

    PageFillAnalysis {
        pages: pages.len(),
        filled_cells,
        total_cells,
        fill_ratio: ratio((filled_cells, total_cells)),
        last_page_ratio,
        verdict,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// (non-blank cells, all cells) on one page.
fn count_cells(page: &Page) -> (usize, usize) {
    page.rows
        .iter()
        .flat_map(|r| r.cells.iter())
        .fold((0, 0), |(filled, total), c| {
            (filled + usize::from(!c.is_blank()), total + 1)
        })
}

fn ratio((filled, total): (usize, usize)) -> f32 {
    if total == 0 {
        0.0
    } else {
        filled as f32 / total as f32
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::pagination::{paginate, LayoutStrategy};
    use crate::layout::segmenter::ContentUnit;
    use crate::models::{GridSpec, InkOpacity};

    fn pages_for(n: usize) -> Vec<Page> {
        let units: Vec<ContentUnit> = (0..n).map(|i| ContentUnit::new(i.to_string())).collect();
        let grid = GridSpec {
            rows: 5,
            cols: 10,
            ..GridSpec::default()
        };
        paginate(&units, &grid, &LayoutStrategy::DenseFill { ink: InkOpacity::Light })
    }

    #[test]
    fn test_full_pages() {
        let analysis = analyze_page_fill(&pages_for(100));
        assert_eq!(analysis.verdict, PageFillVerdict::Full);
        assert_eq!(analysis.pages, 2);
        assert_eq!(analysis.filled_cells, 100);
        assert!((analysis.fill_ratio - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_last_page() {
        let analysis = analyze_page_fill(&pages_for(60));
        assert_eq!(analysis.verdict, PageFillVerdict::PartialLastPage);
        assert!((analysis.last_page_ratio - 0.2).abs() < 1e-6);
        assert!((analysis.fill_ratio - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_blank_sheet() {
        let analysis = analyze_page_fill(&pages_for(0));
        assert_eq!(analysis.verdict, PageFillVerdict::Blank);
        assert_eq!(analysis.total_cells, 50);
    }

    #[test]
    fn test_no_pages_is_blank() {
        let analysis = analyze_page_fill(&[]);
        assert_eq!(analysis.verdict, PageFillVerdict::Blank);
        assert_eq!(analysis.last_page_ratio, 0.0);
    }
}
