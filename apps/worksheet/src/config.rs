use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::export::ExportFormat;

/// Runtime configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub output_dir: PathBuf,
    pub export_format: ExportFormat,
    pub export_quality: f32,
    pub export_scale: f32,
    pub export_settle: Duration,
    /// Name files `{title}_{type}_{date}_{time}` instead of `{type}_{title}`.
    pub export_timestamped: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let format = env_or("EXPORT_FORMAT", "pdf");
        let export_format = ExportFormat::parse(&format)
            .with_context(|| format!("EXPORT_FORMAT must be pdf, png or jpeg (got '{format}')"))?;

        Ok(Config {
            store_path: env_or("WORKSHEET_STORE_PATH", "./practice-sheet-config.json").into(),
            output_dir: env_or("WORKSHEET_OUTPUT_DIR", ".").into(),
            export_format,
            export_quality: parse_env("EXPORT_QUALITY", "0.9")
                .context("EXPORT_QUALITY must be a number")?,
            export_scale: parse_env("EXPORT_SCALE", "2")
                .context("EXPORT_SCALE must be a number")?,
            export_settle: Duration::from_millis(
                parse_env("EXPORT_SETTLE_MS", "500")
                    .context("EXPORT_SETTLE_MS must be a whole number of milliseconds")?,
            ),
            export_timestamped: parse_env("EXPORT_TIMESTAMPED", "false")
                .context("EXPORT_TIMESTAMPED must be true or false")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env_or(key, default);
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("invalid value '{raw}' for {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let v: u64 = parse_env("WORKSHEET_TEST_UNSET_VARIABLE", "500").unwrap();
        assert_eq!(v, 500);
    }

    #[test]
    fn test_parse_env_rejects_garbage_default() {
        let err = parse_env::<f32>("WORKSHEET_TEST_UNSET_VARIABLE", "fast").unwrap_err();
        assert!(err.to_string().contains("WORKSHEET_TEST_UNSET_VARIABLE"));
    }
}
