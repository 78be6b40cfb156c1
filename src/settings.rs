use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Application settings. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabSettings {
    /// Root of the key-value storage (presets, likes).
    pub data_dir: PathBuf,
    /// Where renders and exported configurations are written.
    pub output_dir: PathBuf,
    /// Scratch space for staged custom models.
    pub cache_dir: PathBuf,
    pub debounce_ms: u64,
    pub render_delay_ms: u64,
    pub notification_ms: u64,
    pub preview_width: u32,
}

impl Default for LabSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("lightlab-data"),
            output_dir: PathBuf::from("."),
            cache_dir: std::env::temp_dir().join("lightlab-models"),
            debounce_ms: 300,
            render_delay_ms: 2000,
            notification_ms: 5000,
            preview_width: 640,
        }
    }
}

impl LabSettings {
    /// Reads settings from `path`. A missing file yields the defaults; an
    /// unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| SettingsError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn render_delay(&self) -> Duration {
        Duration::from_millis(self.render_delay_ms)
    }

    pub fn notification(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LabSettings::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings, LabSettings::default());
        assert_eq!(settings.debounce(), Duration::from_millis(300));
        assert_eq!(settings.render_delay(), Duration::from_millis(2000));
        assert_eq!(settings.notification(), Duration::from_millis(5000));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "render_delay_ms": 500, "output_dir": "renders" }"#).unwrap();

        let settings = LabSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.render_delay_ms, 500);
        assert_eq!(settings.output_dir, PathBuf::from("renders"));
        assert_eq!(settings.debounce_ms, 300);
        assert_eq!(settings.preview_width, 640);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LabSettings::load(Some(&path)),
            Err(SettingsError::Json { .. })
        ));
    }
}
