//! Raster Export Pipeline — capture a rendered sheet and write it to disk.
//!
//! # Sequence
//! 1. Validate options.
//! 2. Find the target subtree in the host; missing → `TargetMissing`.
//! 3. Wait for host fonts.
//! 4. Clone the subtree into an off-screen container one page wide and mount it.
//! 5. Strip nodes excluded from export; force export ink and visible borders.
//! 6. Inject the export style and wait for the settle delay.
//! 7. Capture once.
//! 8. Assemble a document (banded PDF) or encode a single image.
//! 9. Save atomically into the output directory.
//!
//! Mounted containers and injected styles are released by guards, so every exit
//! path (including errors and panics) leaves the host as it was.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::RgbaImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::export::bands::plan_bands;
use crate::export::document::DocumentAssembler;
use crate::export::encode::encode_raster;
use crate::export::{ExportError, ExportFormat, ExportOptions};
use crate::layout::geometry::PageGeometry;
use crate::render::sheet::{NodeKind, SheetNode};

/// Default wait between injecting the export style and capturing.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Style injected while an export is in progress.
pub const EXPORT_STYLE: &str = "\
.practice-text-light { opacity: 0.2 !important; }
.practice-text-medium { opacity: 0.3 !important; }
.practice-text-dark { opacity: 0.4 !important; }
.grid-cell { border: 1px solid #d1d5db !important; }
.no-print, .preview-header, .preview-info { display: none !important; }
";

// ────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleId(pub u64);

/// The document the rendered sheet lives in.
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Deep copy of the subtree whose root has `id`.
    fn find_subtree(&self, id: &str) -> Option<SheetNode>;
    fn mount(&self, container: SheetNode) -> ContainerId;
    fn unmount(&self, id: ContainerId);
    fn inject_style(&self, css: &str) -> StyleId;
    fn remove_style(&self, id: StyleId);
    /// Resolves once every font the sheet uses is loaded.
    async fn fonts_ready(&self);
}

/// Rasterizes a mounted container.
#[async_trait]
pub trait RasterCapture: Send + Sync {
    async fn capture(&self, container: &SheetNode, scale: f32) -> Result<RgbaImage, ExportError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Cleanup guards
// ────────────────────────────────────────────────────────────────────────────

struct MountGuard<'a> {
    host: &'a dyn DocumentHost,
    id: ContainerId,
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        self.host.unmount(self.id);
    }
}

struct StyleGuard<'a> {
    host: &'a dyn DocumentHost,
    id: StyleId,
}

impl Drop for StyleGuard<'_> {
    fn drop(&mut self) {
        self.host.remove_style(self.id);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// A file written by a successful export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub pages: usize,
    pub bytes: usize,
}

pub struct ExportPipeline {
    host: Arc<dyn DocumentHost>,
    capture: Arc<dyn RasterCapture>,
    assembler: Arc<dyn DocumentAssembler>,
    output_dir: PathBuf,
    settle: Duration,
    geometry: PageGeometry,
}

impl ExportPipeline {
    pub fn new(
        host: Arc<dyn DocumentHost>,
        capture: Arc<dyn RasterCapture>,
        assembler: Arc<dyn DocumentAssembler>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        ExportPipeline {
            host,
            capture,
            assembler,
            output_dir: output_dir.into(),
            settle: DEFAULT_SETTLE,
            geometry: PageGeometry::a4_portrait(),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub async fn capture_and_export(
        &self,
        target_id: &str,
        format: ExportFormat,
        options: &ExportOptions,
    ) -> Result<ExportArtifact, ExportError> {
        options.validate()?;

        let subtree = self
            .host
            .find_subtree(target_id)
            .ok_or_else(|| ExportError::TargetMissing(target_id.to_string()))?;

        info!(target_id, format = ?format, "Export started");
        self.host.fonts_ready().await;

        let container = prepare_container(subtree, self.geometry.width_px());
        let _mount = MountGuard {
            host: self.host.as_ref(),
            id: self.host.mount(container.clone()),
        };
        let _style = StyleGuard {
            host: self.host.as_ref(),
            id: self.host.inject_style(EXPORT_STYLE),
        };

        tokio::time::sleep(self.settle).await;

        let raster = self.capture.capture(&container, options.scale).await?;
        if raster.width() == 0 || raster.height() == 0 {
            return Err(ExportError::CaptureFailed("capture produced an empty raster".into()));
        }
        debug!(
            width = raster.width(),
            height = raster.height(),
            "Raster captured"
        );

        let (bytes, pages) = match format {
            ExportFormat::Document => {
                let plan = plan_bands(raster.width(), raster.height(), &self.geometry);
                let pages = plan.page_count();
                let bytes = self.assembler.assemble(raster, plan, options.quality).await?;
                (bytes, pages)
            }
            ExportFormat::Png | ExportFormat::Jpeg => {
                (encode_raster(&raster, format, options.quality)?, 1)
            }
        };

        let bytes = Bytes::from(bytes);
        let filename = options.filename(format);
        let path = save_atomically(&self.output_dir, &filename, bytes.clone()).await?;

        info!(path = %path.display(), pages, bytes = bytes.len(), "Export saved");

        Ok(ExportArtifact {
            path,
            format,
            pages,
            bytes: bytes.len(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Builds the off-screen copy: one page wide, chrome removed, export ink applied.
fn prepare_container(mut subtree: SheetNode, width_px: u32) -> SheetNode {
    subtree.strip_excluded();
    subtree.apply_export_overrides();

    if let NodeKind::Sheet { width_px: w } = &mut subtree.kind {
        *w = width_px;
        return subtree;
    }
    SheetNode {
        id: None,
        kind: NodeKind::Sheet { width_px },
        exclude_from_export: false,
        children: vec![subtree],
    }
}

/// Writes `bytes` to a temp file in `dir` and renames it to `filename`.
///
/// Nothing named `filename` exists unless the whole write succeeded.
async fn save_atomically(dir: &Path, filename: &str, bytes: Bytes) -> Result<PathBuf, ExportError> {
    let dir = dir.to_path_buf();
    let target = dir.join(filename);

    tokio::task::spawn_blocking(move || {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| {
            ExportError::AssemblyFailed(format!("cannot create temp file in {}: {e}", dir.display()))
        })?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ExportError::AssemblyFailed(format!("write failed: {e}")))?;
        tmp.persist(&target)
            .map_err(|e| ExportError::AssemblyFailed(format!("save failed: {}", e.error)))?;
        Ok(target)
    })
    .await
    .map_err(|e| ExportError::AssemblyFailed(format!("save task panicked: {e}")))?
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory host
// ────────────────────────────────────────────────────────────────────────────

/// Host keeping documents, mounted containers and styles in memory.
#[derive(Default)]
pub struct MemoryHost {
    documents: Mutex<Vec<SheetNode>>,
    mounted: Mutex<HashMap<ContainerId, SheetNode>>,
    styles: Mutex<HashMap<StyleId, String>>,
    next_id: AtomicU64,
    font_load: Duration,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryHost {
    pub fn new() -> Self {
        MemoryHost::default()
    }

    /// Simulated font loading time awaited by `fonts_ready`.
    #[cfg(test)]
    pub fn with_font_load(mut self, delay: Duration) -> Self {
        self.font_load = delay;
        self
    }

    /// Adds a rendered tree to the document.
    pub fn attach(&self, root: SheetNode) {
        lock(&self.documents).push(root);
    }

    pub fn mounted_count(&self) -> usize {
        lock(&self.mounted).len()
    }

    pub fn style_count(&self) -> usize {
        lock(&self.styles).len()
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentHost for MemoryHost {
    fn find_subtree(&self, id: &str) -> Option<SheetNode> {
        lock(&self.documents)
            .iter()
            .find_map(|root| root.find(id))
            .cloned()
    }

    fn mount(&self, container: SheetNode) -> ContainerId {
        let id = ContainerId(self.next());
        lock(&self.mounted).insert(id, container);
        debug!(container = id.0, "Container mounted");
        id
    }

    fn unmount(&self, id: ContainerId) {
        if lock(&self.mounted).remove(&id).is_none() {
            warn!(container = id.0, "Unmount of unknown container");
        }
    }

    fn inject_style(&self, css: &str) -> StyleId {
        let id = StyleId(self.next());
        lock(&self.styles).insert(id, css.to_string());
        id
    }

    fn remove_style(&self, id: StyleId) {
        lock(&self.styles).remove(&id);
    }

    async fn fonts_ready(&self) {
        if !self.font_load.is_zero() {
            tokio::time::sleep(self.font_load).await;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
