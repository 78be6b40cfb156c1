use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File extensions accepted for dropped models.
pub const MODEL_EXTENSIONS: [&str; 2] = ["glb", "gltf"];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("'{name}' is not a glTF model (expected .glb or .gltf)")]
    UnsupportedExtension { name: String },
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to stage model into {path}: {source}")]
    Cache {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The accepted extension `name` ends with, ignoring case. A bare `.glb`
/// counts.
pub fn model_extension(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    MODEL_EXTENSIONS
        .into_iter()
        .find(|ext| lower.strip_suffix(ext).is_some_and(|stem| stem.ends_with('.')))
}


/// A staged copy of a dropped model. The copy lives exactly as long as the
/// handle: dropping it deletes the file.
#[derive(Debug)]
pub struct ModelHandle {
    reference: String,
    source_name: String,
    staged_path: PathBuf,
    digest: String,
}

impl ModelHandle {
    /// Opaque reference handed to the rendering surface.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn path(&self) -> &Path {
        &self.staged_path
    }

    /// SHA-256 of the model bytes, hex encoded.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.staged_path) {
            Ok(()) => log::debug!("Released model {}", self.reference),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::warn!(
                "Failed to release model {} at {}: {}",
                self.reference,
                self.staged_path.display(),
                err
            ),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Holds at most one custom model at a time.
pub struct CustomAssetLoader {
    cache_dir: PathBuf,
    current: Option<ModelHandle>,
    sequence: u64,
}

impl CustomAssetLoader {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            current: None,
            sequence: 0,
        }
    }

    pub fn current(&self) -> Option<&ModelHandle> {
        self.current.as_ref()
    }

    /// Stages `path` and makes it the current model, releasing the previous
    /// one. Anything but `.glb`/`.gltf` is rejected without touching state.
    pub fn load_from_dropped_file(&mut self, path: &Path) -> Result<&ModelHandle, AssetError> {
        let source_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let Some(extension) = model_extension(&source_name) else {
            return Err(AssetError::UnsupportedExtension { name: source_name });
        };

        let bytes = std::fs::read(path).map_err(|source| AssetError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let digest = hex(&Sha256::digest(&bytes));

        self.sequence += 1;
        let staged_path = self
            .cache_dir
            .join(format!("{}_{}.{}", &digest[..16], self.sequence, extension));
        let cache_error = |path: &Path, source: std::io::Error| AssetError::Cache {
            path: path.display().to_string(),
            source,
        };
        std::fs::create_dir_all(&self.cache_dir).map_err(|err| cache_error(&self.cache_dir, err))?;

        // Created before the write so a failed write still cleans up.
        let handle = ModelHandle {
            reference: format!("model://{}/{}", &digest[..16], self.sequence),
            source_name,
            staged_path,
            digest,
        };
        std::fs::write(&handle.staged_path, &bytes).map_err(|err| cache_error(&handle.staged_path, err))?;

        log::info!(
            "Loaded custom model '{}' as {}",
            handle.source_name,
            handle.reference
        );
        // Replacing drops the previous handle, releasing its file.
        Ok(&*self.current.insert(handle))
    }

    /// Releases the current model; the preview falls back to the resin sphere.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }
}
