use thiserror::Error;

use crate::export::ExportError;

/// Application-level error type for the host driver.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config store error: {0}")]
    Store(String),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short code used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Export(e) => match e {
                ExportError::Validation(_) => "EXPORT_VALIDATION",
                ExportError::TargetMissing(_) => "EXPORT_TARGET_MISSING",
                ExportError::CaptureFailed(_) => "EXPORT_CAPTURE_FAILED",
                ExportError::AssemblyFailed(_) => "EXPORT_ASSEMBLY_FAILED",
            },
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Store(format!("invalid JSON: {e}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Store(e.to_string())
    }
}
