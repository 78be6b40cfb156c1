use crate::scene::guidance::GuidanceSnapshot;
use crate::scene::{SceneConfiguration, ValidationError};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("imported configuration is out of range: {0}")]
    Invalid(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// The document written by "export configuration": the full scene plus the
/// guidance computed for it at export time.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportDocument<'a> {
    pub config: &'a SceneConfiguration,
    pub summary: GuidanceSnapshot,
}

impl<'a> ExportDocument<'a> {
    pub fn new(config: &'a SceneConfiguration) -> Self {
        Self {
            config,
            summary: GuidanceSnapshot::of(config),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}

pub fn export_file_name(millis: u128) -> String {
    format!("valo_lab_config_{millis}.json")
}

pub fn save_export_to_file(config: &SceneConfiguration, path: &Path) -> Result<()> {
    let json = ExportDocument::new(config).to_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Writes the export document into `dir` under a timestamped name.
pub fn export_to_dir(config: &SceneConfiguration, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(unix_millis()));
    save_export_to_file(config, &path)?;
    Ok(path)
}

/// Reads back the `config` half of an export document. Values outside the
/// configuration's domain are rejected.
pub fn load_config_from_export(path: &Path) -> Result<SceneConfiguration> {
    #[derive(serde::Deserialize)]
    struct Envelope {
        config: SceneConfiguration,
    }

    let json = std::fs::read_to_string(path)?;
    let envelope: Envelope = serde_json::from_str(&json)?;
    envelope.config.validate()?;
    Ok(envelope.config)
}
