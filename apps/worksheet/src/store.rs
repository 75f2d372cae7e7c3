//! Config store — persists the sheet configuration as JSON on disk.
//!
//! The file holds a JSON object; the configuration lives under
//! [`STORE_KEY`]. Other keys in the same file are preserved on save.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::PracticeSheetConfig;

pub const STORE_KEY: &str = "practice-sheet-config";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ConfigStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored configuration.
    ///
    /// Never fails: a missing file yields defaults, and an unreadable or corrupt
    /// one is logged and also yields defaults.
    pub async fn load(&self) -> PracticeSheetConfig {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored config; using defaults");
                return PracticeSheetConfig::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Config store unreadable: {e}");
                return PracticeSheetConfig::default();
            }
        };

        match parse_stored(&raw) {
            Ok(Some(config)) => {
                info!(path = %self.path.display(), mode = ?config.mode, "Loaded stored config");
                config
            }
            Ok(None) => PracticeSheetConfig::default(),
            Err(e) => {
                warn!(path = %self.path.display(), "Stored config is corrupt, using defaults: {e}");
                PracticeSheetConfig::default()
            }
        }
    }

    /// Writes `config` under [`STORE_KEY`], replacing the file atomically.
    pub async fn save(&self, config: &PracticeSheetConfig) -> Result<(), AppError> {
        let mut document = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            Err(_) => Map::new(),
        };
        document.insert(STORE_KEY.to_string(), serde_json::to_value(config)?);
        let bytes = serde_json::to_vec_pretty(&Value::Object(document))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| AppError::Store(format!("save task panicked: {e}")))??;

        debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }
}

/// `Ok(None)` when the document has no entry for [`STORE_KEY`].
fn parse_stored(raw: &str) -> Result<Option<PracticeSheetConfig>, serde_json::Error> {
    let document: Value = serde_json::from_str(raw)?;
    match document.get(STORE_KEY) {
        Some(entry) => serde_json::from_value(entry.clone()).map(Some),
        None => Ok(None),
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| AppError::Store(e.error.to_string()))?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
