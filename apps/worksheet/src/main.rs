mod config;
mod errors;
mod export;
mod layout;
mod models;
mod render;
mod state;
mod store;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::AppError;
use crate::export::document::PdfAssembler;
use crate::export::{
    timestamped_filename_base, ExportOptions, ExportPipeline, ExportStatus, ExportTrigger,
    MemoryHost, TriggerOutcome,
};
use crate::layout::page_fill::analyze_page_fill;
use crate::layout::{build_worksheet, StaticCharacterTable};
use crate::models::PracticeSheetConfig;
use crate::render::{render_sheet, GridRasterizer, RenderOptions, PREVIEW_ID};
use crate::state::AppState;
use crate::store::ConfigStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Worksheet v{}", env!("CARGO_PKG_VERSION"));

    // Load (or initialise) the stored sheet configuration
    let store = ConfigStore::new(&config.store_path);
    let sheet_config = store.load().await;
    store.save(&sheet_config).await?;

    let state = assemble_state(config, store);
    tokio::spawn(log_status_changes(state.trigger.subscribe()));

    mount_sheet(&state, &sheet_config);

    if let Err(e) = run_export(&state, &sheet_config).await {
        error!(code = e.code(), "{e}");
        return Err(e.into());
    }
    Ok(())
}

/// Export stack: in-memory document host, rasterizer, PDF assembler.
fn assemble_state(config: Config, store: ConfigStore) -> AppState {
    let host = Arc::new(MemoryHost::new());
    let pipeline = ExportPipeline::new(
        host.clone(),
        Arc::new(GridRasterizer),
        Arc::new(PdfAssembler::default()),
        &config.output_dir,
    )
    .with_settle(config.export_settle);
    let trigger = Arc::new(ExportTrigger::new(Arc::new(pipeline), PREVIEW_ID));

    AppState {
        config,
        store,
        character_data: Arc::new(StaticCharacterTable),
        host,
        trigger,
    }
}

/// Lays out and renders the sheet, then attaches it to the host document.
fn mount_sheet(state: &AppState, sheet_config: &PracticeSheetConfig) {
    let data = state.character_data.as_ref();
    let worksheet = build_worksheet(sheet_config, data);
    let fill = analyze_page_fill(&worksheet.pages);
    info!(
        mode = ?worksheet.mode,
        pages = worksheet.page_count(),
        fill_ratio = fill.fill_ratio,
        verdict = ?fill.verdict,
        "Worksheet laid out"
    );

    let root = render_sheet(
        &worksheet,
        &sheet_config.text,
        data,
        &RenderOptions::from_config(sheet_config),
    );
    state.host.attach(root);
}

/// Runs one export of the mounted sheet. Export failures are logged, not returned.
async fn run_export(state: &AppState, sheet_config: &PracticeSheetConfig) -> Result<(), AppError> {
    if !sheet_config.has_content() {
        info!(mode = ?sheet_config.mode, "No practice content; export skipped");
        return Ok(());
    }

    let options = export_options(&state.config, sheet_config);
    options.validate()?;

    let format = state.config.export_format;
    info!(
        button = state.trigger.status_label(format),
        store = %state.store.path().display(),
        "Exporting worksheet"
    );

    match state.trigger.trigger(format, &options).await {
        TriggerOutcome::Completed(artifact) => info!(
            path = %artifact.path.display(),
            pages = artifact.pages,
            bytes = artifact.bytes,
            "Export complete"
        ),
        TriggerOutcome::Failed(reason) => warn!(%reason, "Export did not complete"),
        TriggerOutcome::Ignored => warn!("Export already in progress"),
    }
    debug!(
        mounted = state.host.mounted_count(),
        styles = state.host.style_count(),
        "Host released export containers"
    );
    Ok(())
}

/// Follows the export button status until the trigger is dropped.
async fn log_status_changes(mut status: watch::Receiver<ExportStatus>) {
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        debug!(status = ?current, "Export status changed");
    }
}

fn export_options(config: &Config, sheet_config: &PracticeSheetConfig) -> ExportOptions {
    let practice_type = sheet_config.mode.practice_type_label();
    let title = sheet_config.display_title();
    let mut options =
        ExportOptions::for_sheet(practice_type, &title, config.export_quality, config.export_scale);
    if config.export_timestamped {
        options.filename_base =
            timestamped_filename_base(practice_type, &title, chrono::Local::now().naive_local());
    }
    options
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::export::pipeline::DocumentHost;
    use crate::export::ExportFormat;
    use crate::models::PracticeMode;

    fn state_in(dir: &tempfile::TempDir) -> AppState {
        let config = Config {
            store_path: dir.path().join("store.json"),
            output_dir: dir.path().to_path_buf(),
            export_format: ExportFormat::Png,
            export_quality: 0.9,
            export_scale: 1.0,
            export_settle: Duration::ZERO,
            export_timestamped: false,
            rust_log: "info".to_string(),
        };
        let store = ConfigStore::new(&config.store_path);
        assemble_state(config, store)
    }

    fn exported_files(dir: &tempfile::TempDir) -> Vec<String> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".png"))
            .collect()
    }

    #[tokio::test]
    async fn test_mounted_sheet_exports_through_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);
        let sheet_config = PracticeSheetConfig::default();

        mount_sheet(&state, &sheet_config);
        assert!(state.host.find_subtree(PREVIEW_ID).is_some());

        run_export(&state, &sheet_config).await.unwrap();
        assert_eq!(exported_files(&dir).len(), 1);
        assert_eq!(state.host.mounted_count(), 0);
        assert_eq!(state.host.style_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_content_skips_export() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);
        let sheet_config = PracticeSheetConfig {
            mode: PracticeMode::StrokeOrder,
            ..PracticeSheetConfig::default()
        };
        mount_sheet(&state, &sheet_config);
        run_export(&state, &sheet_config).await.unwrap();
        assert!(exported_files(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_bad_quality_reports_validation_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(&dir);
        state.config.export_quality = 1.5;
        let sheet_config = PracticeSheetConfig::default();
        mount_sheet(&state, &sheet_config);

        let err = run_export(&state, &sheet_config).await.unwrap_err();
        assert_eq!(err.code(), "EXPORT_VALIDATION");
        assert!(exported_files(&dir).is_empty());
    }
}
