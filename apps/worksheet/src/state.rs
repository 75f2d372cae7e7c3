use std::sync::Arc;

use crate::config::Config;
use crate::export::{ExportTrigger, MemoryHost};
use crate::layout::CharacterData;
use crate::store::ConfigStore;

/// Shared application state handed to the export driver.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: ConfigStore,
    /// Pluggable character tables. Default: StaticCharacterTable.
    pub character_data: Arc<dyn CharacterData>,
    /// Document the rendered sheet is mounted in.
    pub host: Arc<MemoryHost>,
    pub trigger: Arc<ExportTrigger>,
}
