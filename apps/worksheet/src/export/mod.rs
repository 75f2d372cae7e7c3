// Raster export: capture the rendered sheet, slice it into A4 bands and write a
// PDF or a single PNG/JPEG. Every failure surfaces as an `ExportError`.

pub mod bands;
pub mod document;
pub mod encode;
pub mod pipeline;
pub mod trigger;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pipeline::{ExportPipeline, MemoryHost};
pub use trigger::{ExportStatus, ExportTrigger, TriggerOutcome};

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid export options: {0}")]
    Validation(String),

    #[error("Export target '{0}' not found")]
    TargetMissing(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Assembly failed: {0}")]
    AssemblyFailed(String),
}

impl ExportError {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            ExportError::Validation(_) => "validation",
            ExportError::TargetMissing(_) => "target-missing",
            ExportError::CaptureFailed(_) => "capture-failed",
            ExportError::AssemblyFailed(_) => "assembly-failed",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Options
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Multi-page PDF.
    Document,
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Document => "pdf",
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    /// Idle button label.
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Document => "导出PDF",
            ExportFormat::Png => "导出PNG",
            ExportFormat::Jpeg => "导出JPEG",
        }
    }

    pub fn parse(raw: &str) -> Option<ExportFormat> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pdf" | "document" => Some(ExportFormat::Document),
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    A4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
}

pub const MIN_QUALITY: f32 = 0.1;
pub const MAX_QUALITY: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// File name without extension.
    pub filename_base: String,
    /// JPEG quality in `[0.1, 1.0]`; ignored for PNG.
    pub quality: f32,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    /// Raster pixels per CSS pixel.
    pub scale: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            filename_base: "practice-sheet".to_string(),
            quality: 0.9,
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            scale: 2.0,
        }
    }
}

impl ExportOptions {
    /// Options named `{practiceType}_{title}` for a sheet.
    pub fn for_sheet(practice_type: &str, title: &str, quality: f32, scale: f32) -> Self {
        ExportOptions {
            filename_base: format!("{practice_type}_{}", sanitize_title(title)),
            quality,
            scale,
            ..ExportOptions::default()
        }
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if self.filename_base.trim().is_empty() {
            return Err(ExportError::Validation("filename must not be empty".into()));
        }
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.quality) {
            return Err(ExportError::Validation(format!(
                "quality {} outside [{MIN_QUALITY}, {MAX_QUALITY}]",
                self.quality
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ExportError::Validation(format!(
                "scale {} must be positive",
                self.scale
            )));
        }
        Ok(())
    }

    pub fn filename(&self, format: ExportFormat) -> String {
        format!("{}.{}", self.filename_base, format.extension())
    }
}

/// Replaces every character outside basic CJK and ASCII alphanumerics with `_`.
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ('\u{4E00}'..='\u{9FA5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{title}_{practiceType}_{YYYY-MM-DD}_{HHMMSS}`; the title part is dropped when blank.
pub fn timestamped_filename_base(practice_type: &str, title: &str, at: NaiveDateTime) -> String {
    let stamped = format!("{practice_type}_{}", at.format("%Y-%m-%d_%H%M%S"));
    if title.trim().is_empty() {
        stamped
    } else {
        format!("{}_{stamped}", sanitize_title(title))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("我的 字帖!"), "我的_字帖_");
        assert_eq!(sanitize_title("  Week-1 ✓ "), "Week_1__");
        assert_eq!(sanitize_title(""), "");
    }

    #[test]
    fn test_for_sheet_filename() {
        let options = ExportOptions::for_sheet("文章字帖", "春 晓", 0.9, 2.0);
        assert_eq!(options.filename(ExportFormat::Document), "文章字帖_春_晓.pdf");
        assert_eq!(options.filename(ExportFormat::Jpeg), "文章字帖_春_晓.jpg");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_filename() {
        let options = ExportOptions {
            filename_base: "   ".into(),
            ..ExportOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert_eq!(err.reason(), "validation");
    }

    #[test]
    fn test_validate_quality_bounds() {
        for (quality, ok) in [(0.05, false), (0.1, true), (1.0, true), (1.01, false)] {
            let options = ExportOptions {
                quality,
                ..ExportOptions::default()
            };
            assert_eq!(options.validate().is_ok(), ok, "quality {quality}");
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_scale() {
        let options = ExportOptions {
            scale: 0.0,
            ..ExportOptions::default()
        };
        assert!(matches!(options.validate(), Err(ExportError::Validation(_))));
    }

    #[test]
    fn test_timestamped_filename() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 30)
            .unwrap();
        assert_eq!(
            timestamped_filename_base("笔顺字帖", "", at),
            "笔顺字帖_2024-03-09_070530"
        );
        assert_eq!(
            timestamped_filename_base("笔顺字帖", "一年级", at),
            "一年级_笔顺字帖_2024-03-09_070530"
        );
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("PDF"), Some(ExportFormat::Document));
        assert_eq!(ExportFormat::parse("jpg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::parse("gif"), None);
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(ExportError::TargetMissing("x".into()).reason(), "target-missing");
        assert_eq!(ExportError::CaptureFailed("x".into()).reason(), "capture-failed");
        assert_eq!(ExportError::AssemblyFailed("x".into()).reason(), "assembly-failed");
    }
}
