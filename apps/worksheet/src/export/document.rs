//! Document assembly — writes planned pages into a PDF.
//!
//! Each page carries one JPEG image XObject drawn by a compressed content stream.
//! PDF work is CPU-bound and runs inside `tokio::task::spawn_blocking`.

use async_trait::async_trait;
use image::RgbaImage;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref};

use crate::export::bands::{slice_bands, PagePlan, Placement};
use crate::export::encode::encode_jpeg;
use crate::export::ExportError;
use crate::layout::geometry::PageGeometry;

const PT_PER_MM: f32 = 72.0 / 25.4;
const IMAGE_NAME: &[u8] = b"Im1";

/// Turns a captured raster plus its page plan into document bytes.
#[async_trait]
pub trait DocumentAssembler: Send + Sync {
    async fn assemble(
        &self,
        raster: RgbaImage,
        plan: PagePlan,
        quality: f32,
    ) -> Result<Vec<u8>, ExportError>;
}

/// Default assembler backed by `pdf-writer`.
#[derive(Debug, Clone, Default)]
pub struct PdfAssembler {
    pub geometry: PageGeometry,
}

#[async_trait]
impl DocumentAssembler for PdfAssembler {
    async fn assemble(
        &self,
        raster: RgbaImage,
        plan: PagePlan,
        quality: f32,
    ) -> Result<Vec<u8>, ExportError> {
        let geometry = self.geometry;
        tokio::task::spawn_blocking(move || build_pdf(&raster, &plan, &geometry, quality))
            .await
            .map_err(|e| ExportError::AssemblyFailed(format!("PDF task panicked: {e}")))?
    }
}

/// One page image with its position on the page.
struct PageImage {
    jpeg: Vec<u8>,
    width_px: u32,
    height_px: u32,
    placement: Placement,
}

/// Builds the PDF synchronously.
pub fn build_pdf(
    raster: &RgbaImage,
    plan: &PagePlan,
    geometry: &PageGeometry,
    quality: f32,
) -> Result<Vec<u8>, ExportError> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(ExportError::AssemblyFailed("raster is empty".into()));
    }

    let pages: Vec<PageImage> = match plan {
        PagePlan::Single(placement) => vec![PageImage {
            jpeg: encode_jpeg(raster, quality)?,
            width_px: raster.width(),
            height_px: raster.height(),
            placement: *placement,
        }],
        PagePlan::Bands(bands) => slice_bands(raster, bands)
            .iter()
            .zip(bands)
            .map(|(slice, band)| {
                Ok(PageImage {
                    jpeg: encode_jpeg(slice, quality)?,
                    width_px: slice.width(),
                    height_px: slice.height(),
                    placement: band.placement(geometry),
                })
            })
            .collect::<Result<_, ExportError>>()?,
    };

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let page_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();

    let page_w = geometry.width_mm * PT_PER_MM;
    let page_h = geometry.height_mm * PT_PER_MM;

    for (page, page_id) in pages.iter().zip(&page_ids) {
        let image_id = alloc();
        let content_id = alloc();

        {
            let mut xobj = pdf.image_xobject(image_id, &page.jpeg);
            xobj.filter(Filter::DctDecode);
            xobj.width(page.width_px as i32);
            xobj.height(page.height_px as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }

        let p = page.placement;
        let mut content = Content::new();
        content.save_state();
        content.transform([
            p.width_mm * PT_PER_MM,
            0.0,
            0.0,
            p.height_mm * PT_PER_MM,
            p.x_mm * PT_PER_MM,
            page_h - (p.y_mm + p.height_mm) * PT_PER_MM,
        ]);
        content.x_object(Name(IMAGE_NAME));
        content.restore_state();

        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

        let mut page_writer = pdf.page(*page_id);
        page_writer
            .media_box(Rect::new(0.0, 0.0, page_w, page_h))
            .parent(pages_id)
            .contents(content_id);
        page_writer
            .resources()
            .x_objects()
            .pair(Name(IMAGE_NAME), image_id);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    Ok(pdf.finish())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
