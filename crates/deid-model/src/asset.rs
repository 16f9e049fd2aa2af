use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MODEL_NAME: &str = "de_core_news_lg";
pub const DEFAULT_MODEL_VERSION: &str = "3.7.0";
pub const DEFAULT_BASE_URL: &str = "https://github.com/explosion/spacy-models/releases/download";

/// Metadata file whose presence marks a complete install.
pub const MARKER_FILE: &str = "meta.json";

/// Lifecycle of the model on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Absent,
    Downloading,
    Extracting,
    Available,
    Failed,
}

/// Identity and location of a model asset.
///
/// Layout under `root`:
/// `{name}-{version}/{name}/{name}-{version}/meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub version: String,
    pub base_url: String,
    pub root: PathBuf,
}

impl ModelSpec {
    /// The default German model under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            version: DEFAULT_MODEL_VERSION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            root: root.into(),
        }
    }

    pub fn with_model(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn versioned_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn archive_url(&self) -> String {
        let versioned = self.versioned_name();
        format!(
            "{}/{}/{}.tar.gz",
            self.base_url.trim_end_matches('/'),
            versioned,
            versioned
        )
    }

    /// Top-level directory the archive unpacks into.
    pub fn package_dir(&self) -> PathBuf {
        self.root.join(self.versioned_name())
    }

    /// Directory the recognizer loads from.
    pub fn model_path(&self) -> PathBuf {
        self.package_dir()
            .join(&self.name)
            .join(self.versioned_name())
    }

    pub fn marker_path(&self) -> PathBuf {
        self.model_path().join(MARKER_FILE)
    }

    pub fn is_available(&self) -> bool {
        self.marker_path().is_file()
    }

    /// Rough download size for display, known only for the default model.
    pub fn approximate_size_mb(&self) -> Option<f64> {
        (self.name == DEFAULT_MODEL_NAME).then_some(541.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_url() {
        let spec = ModelSpec::new("/models");
        assert_eq!(
            spec.archive_url(),
            "https://github.com/explosion/spacy-models/releases/download/de_core_news_lg-3.7.0/de_core_news_lg-3.7.0.tar.gz"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let spec = ModelSpec::new("/models")
            .with_model("tiny", "1.0")
            .with_base_url("http://127.0.0.1:8080/");
        assert_eq!(spec.archive_url(), "http://127.0.0.1:8080/tiny-1.0/tiny-1.0.tar.gz");
    }

    #[test]
    fn test_nested_layout() {
        let spec = ModelSpec::new("/models");
        assert_eq!(
            spec.marker_path(),
            Path::new("/models/de_core_news_lg-3.7.0/de_core_news_lg/de_core_news_lg-3.7.0/meta.json")
        );
    }

    #[test]
    fn test_availability_follows_marker() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ModelSpec::new(dir.path()).with_model("tiny", "1.0");
        assert!(!spec.is_available());

        std::fs::create_dir_all(spec.model_path()).unwrap();
        assert!(!spec.is_available());

        std::fs::write(spec.marker_path(), "{}").unwrap();
        assert!(spec.is_available());
    }
}
