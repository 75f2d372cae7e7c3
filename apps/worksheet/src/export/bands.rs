//! Page planning for document export.
//!
//! A captured raster is mapped onto A4 at full page width. If its physical height
//! fits on one page it is placed once inside the margins; otherwise it is cut into
//! page-height bands, top first, the last band keeping whatever height remains.

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::layout::geometry::PageGeometry;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Where an image sits on a page, in millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// A horizontal strip of the raster destined for one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub y_px: u32,
    pub height_px: u32,
    /// Printed height at full page width.
    pub height_mm: f32,
}

impl Band {
    pub fn placement(&self, geometry: &PageGeometry) -> Placement {
        Placement {
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm: geometry.width_mm,
            height_mm: self.height_mm.min(geometry.height_mm),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PagePlan {
    /// Whole raster on one page, scaled into the margin box.
    Single(Placement),
    /// One page per band.
    Bands(Vec<Band>),
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        match self {
            PagePlan::Single(_) => 1,
            PagePlan::Bands(bands) => bands.len(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Exact page height in raster pixels for a raster `width_px` wide.
pub fn page_height_px(width_px: u32, geometry: &PageGeometry) -> f64 {
    let ratio = f64::from(geometry.height_mm) / f64::from(geometry.width_mm);
    (f64::from(width_px.max(1)) * ratio).max(1.0)
}

/// Decides how a `width_px × height_px` raster maps onto pages.
///
/// The page count is taken from the exact page height with half a pixel of
/// tolerance, so a raster that is N pages tall to the nearest pixel gets N pages.
/// Band edges fall on `round(i × page_height)`; the last band ends at the raster edge.
pub fn plan_bands(width_px: u32, height_px: u32, geometry: &PageGeometry) -> PagePlan {
    let width = width_px.max(1) as f32;
    let page_px = page_height_px(width_px, geometry);
    let count = ((f64::from(height_px) - 0.5) / page_px).ceil().max(1.0) as u32;

    if count == 1 {
        return PagePlan::Single(fit_in_margins(width_px, height_px, geometry));
    }

    let edge = |i: u32| ((f64::from(i) * page_px).round() as u32).min(height_px);
    let bands = (0..count)
        .map(|i| {
            let y_px = edge(i);
            let end = if i + 1 == count { height_px } else { edge(i + 1) };
            let band_height = end - y_px;
            Band {
                y_px,
                height_px: band_height,
                height_mm: band_height as f32 * geometry.width_mm / width,
            }
        })
        .collect();

    PagePlan::Bands(bands)
}

/// Crops each band out of `raster` at full width.
pub fn slice_bands(raster: &RgbaImage, bands: &[Band]) -> Vec<RgbaImage> {
    bands
        .iter()
        .map(|band| {
            imageops::crop_imm(raster, 0, band.y_px, raster.width(), band.height_px).to_image()
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Scales the raster to the content width, shrinking further if it would overrun
/// the content height, and centres it horizontally below the top margin.
fn fit_in_margins(width_px: u32, height_px: u32, geometry: &PageGeometry) -> Placement {
    let max_w = geometry.content_width_mm();
    let max_h = geometry.content_height_mm();
    let aspect = height_px as f32 / width_px.max(1) as f32;

    let (mut width_mm, mut height_mm) = (max_w, max_w * aspect);
    if height_mm > max_h {
        height_mm = max_h;
        width_mm = if aspect > 0.0 { max_h / aspect } else { max_w };
    }

    Placement {
        x_mm: geometry.margin_mm + (max_w - width_mm) / 2.0,
        y_mm: geometry.margin_mm,
        width_mm,
        height_mm,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn a4() -> PageGeometry {
        PageGeometry::a4_portrait()
    }

    fn band_edges(plan: &PagePlan) -> Vec<(u32, u32)> {
        match plan {
            PagePlan::Bands(bands) => bands.iter().map(|b| (b.y_px, b.height_px)).collect(),
            PagePlan::Single(_) => panic!("expected bands"),
        }
    }

    #[test]
    fn test_page_height_matches_a4_ratio() {
        // 297 × 1000 / 210 = 1414.2857
        assert!((page_height_px(1000, &a4()) - 1414.2857).abs() < 1e-3);
        assert!((page_height_px(1588, &a4()) - 2245.8857).abs() < 1e-3);
    }

    #[test]
    fn test_three_page_slicing_with_short_last_band() {
        let plan = plan_bands(1000, 3 * 1414 - 100, &a4());
        let PagePlan::Bands(bands) = plan else {
            panic!("expected bands");
        };
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].y_px, 0);
        assert_eq!(bands[1].y_px, 1414);
        // round(2 × 1414.2857)
        assert_eq!(bands[2].y_px, 2829);
        assert_eq!(bands[2].height_px, 1313);
        assert!((bands[0].height_mm - 296.94).abs() < 0.01);
        assert!(bands[2].height_mm < bands[0].height_mm);
        let covered: u32 = bands.iter().map(|b| b.height_px).sum();
        assert_eq!(covered, 4142);
    }

    #[test]
    fn test_exact_multiple_has_no_extra_page() {
        let plan = plan_bands(1000, 2 * 1414, &a4());
        assert_eq!(plan.page_count(), 2);
    }

    #[test]
    fn test_three_pages_tall_to_the_pixel_is_three_pages() {
        // 3 × 1414.2857 = 4242.86 → 4243
        let edges = band_edges(&plan_bands(1000, 4243, &a4()));
        assert_eq!(edges, vec![(0, 1414), (1414, 1415), (2829, 1414)]);

        // 3 × 1684.4571 = 5053.37 → 5053
        let edges = band_edges(&plan_bands(1191, 5053, &a4()));
        assert_eq!(edges.len(), 3);
        assert_eq!(edges.iter().map(|&(_, h)| h).sum::<u32>(), 5053);

        for width in [794, 1000, 1191, 1588] {
            let tall = (3.0 * page_height_px(width, &a4())).round() as u32;
            assert_eq!(plan_bands(width, tall, &a4()).page_count(), 3, "width {width}");
        }
    }

    #[test]
    fn test_short_raster_is_single_page_in_margins() {
        let plan = plan_bands(1000, 1000, &a4());
        let PagePlan::Single(p) = plan else {
            panic!("expected single page");
        };
        assert!((p.width_mm - 190.0).abs() < 1e-3);
        assert!((p.height_mm - 190.0).abs() < 1e-3);
        assert!((p.x_mm - 10.0).abs() < 1e-3);
        assert!((p.y_mm - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_single_page_boundary() {
        // 1414 px at 1000 wide is 296.94 mm: still one page
        assert_eq!(plan_bands(1000, 1414, &a4()).page_count(), 1);
        let PagePlan::Bands(bands) = plan_bands(1000, 1415, &a4()) else {
            panic!("expected bands");
        };
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[1].height_px, 1);
    }

    #[test]
    fn test_single_page_shrinks_to_content_height() {
        let landscape = PageGeometry {
            width_mm: 297.0,
            height_mm: 210.0,
            ..PageGeometry::a4_portrait()
        };
        // 207.9 mm tall at full width fits the page but not the 190 mm content box
        let PagePlan::Single(p) = plan_bands(1000, 700, &landscape) else {
            panic!("expected single page");
        };
        assert!((p.height_mm - 190.0).abs() < 1e-3);
        assert!(p.width_mm < 277.0);
        assert!(p.x_mm > 10.0, "narrowed image is centred");
    }

    #[test]
    fn test_slice_bands_crops_rows() {
        let mut raster = RgbaImage::from_pixel(4, 10, Rgba([255, 255, 255, 255]));
        raster.put_pixel(0, 7, Rgba([0, 0, 0, 255]));
        let bands = [
            Band { y_px: 0, height_px: 6, height_mm: 0.0 },
            Band { y_px: 6, height_px: 4, height_mm: 0.0 },
        ];
        let slices = slice_bands(&raster, &bands);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].dimensions(), (4, 6));
        assert_eq!(slices[1].dimensions(), (4, 4));
        assert_eq!(slices[1].get_pixel(0, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_band_placement_spans_page_width() {
        let band = Band { y_px: 0, height_px: 1414, height_mm: 296.94 };
        let p = band.placement(&a4());
        assert_eq!(p.x_mm, 0.0);
        assert_eq!(p.width_mm, 210.0);
    }
}
