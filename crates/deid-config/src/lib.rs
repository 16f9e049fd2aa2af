use deid_model::asset::{DEFAULT_BASE_URL, DEFAULT_MODEL_NAME, DEFAULT_MODEL_VERSION};
use deid_model::{DownloadSettings, ModelSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for deid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub download: DownloadSettings,

    #[serde(default)]
    pub anonymize: AnonymizeConfig,

    #[serde(default)]
    pub terms: TermsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory the model archive is unpacked into.
    #[serde(default = "default_model_root")]
    pub root: PathBuf,

    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_model_version")]
    pub version: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizeConfig {
    #[serde(default = "default_true")]
    pub fuzzy: bool,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_value_column")]
    pub value_column: String,

    #[serde(default = "default_category_column")]
    pub category_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsConfig {
    /// Persisted blacklist, one term per line.
    #[serde(default = "default_terms_path")]
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            root: default_model_root(),
            name: default_model_name(),
            version: default_model_version(),
            base_url: default_base_url(),
        }
    }
}

impl Default for AnonymizeConfig {
    fn default() -> Self {
        Self {
            fuzzy: true,
            threshold: default_threshold(),
            value_column: default_value_column(),
            category_column: default_category_column(),
        }
    }
}

impl Default for TermsConfig {
    fn default() -> Self {
        Self {
            path: default_terms_path(),
        }
    }
}

fn data_dir() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "deid", "deid") {
        dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".deid")
    }
}

fn default_model_root() -> PathBuf {
    data_dir().join("models")
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_model_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    85.0
}

fn default_value_column() -> String {
    "value".to_string()
}

fn default_category_column() -> String {
    "category".to_string()
}

fn default_terms_path() -> PathBuf {
    data_dir().join("blacklist.txt")
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "deid", "deid") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from(".deid/config.toml")
        }
    }

    /// Model location described by the `[model]` section.
    pub fn model_spec(&self) -> ModelSpec {
        ModelSpec::new(&self.model.root)
            .with_model(&self.model.name, &self.model.version)
            .with_base_url(&self.model.base_url)
    }
}
