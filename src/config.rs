//! Configuration for archive harvesting.
//!
//! Every field has a default, so running without a config file targets the
//! Danmarks Nationalbank knowledge archive. A TOML or JSON file can override
//! any subset; CLI flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::discovery::{default_patterns, DiscoverySettings};
use crate::scrapers::BrowserEngineConfig;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["archive-harvest.toml", "archive-harvest.json"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Site root used to absolutize article links.
    pub base_url: String,
    /// First results page.
    pub start_url: String,
    /// Directory holding documents, sidecars and metadata files.
    pub store_dir: PathBuf,
    /// Results pages to crawl; 0 means no limit.
    pub max_pages: u32,
    /// Extension of the documents to collect, without the dot.
    pub document_extension: String,
    /// Selector for result items on a results page.
    pub result_item_selector: String,
    /// Selector whose presence means an article page has rendered.
    pub readiness_selector: String,
    pub readiness_timeout_secs: u64,
    /// Pause after each navigation for late-hydrating components.
    pub settle_delay_ms: u64,
    /// Timeout for document downloads.
    pub request_timeout_secs: u64,
    /// User agent ("impersonate" picks a real browser agent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Link selectors, most specific first. Empty uses the built-in list.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_patterns: Vec<String>,
    /// Attribute holding JSON link descriptors.
    pub structured_link_attribute: String,
    /// Name of the combined metadata file inside `store_dir`.
    pub combined_metadata_file: String,
    pub browser: BrowserEngineConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.nationalbanken.dk".to_string(),
            start_url: "https://www.nationalbanken.dk/da/soeg-i-vidensarkivet".to_string(),
            store_dir: PathBuf::from("docs"),
            max_pages: 0,
            document_extension: "pdf".to_string(),
            result_item_selector: "dnb-search-result-item".to_string(),
            readiness_selector: ".h2".to_string(),
            readiness_timeout_secs: 5,
            settle_delay_ms: 2000,
            request_timeout_secs: 30,
            user_agent: None,
            link_patterns: Vec::new(),
            structured_link_attribute: "link".to_string(),
            combined_metadata_file: "docs_metadata.json".to_string(),
            browser: BrowserEngineConfig::default(),
            source_path: None,
        }
    }
}

impl ArchiveConfig {
    /// Load from an explicit path, or from a default file in the working
    /// directory if one exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        for candidate in DEFAULT_CONFIG_FILES {
            let path = Path::new(candidate);
            if path.is_file() {
                return Self::load_from_path(path);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    /// The format follows the extension: `.json` is JSON, anything else TOML.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut config: ArchiveConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
            _ => toml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
        };

        debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative paths are resolved against: the config file's
    /// directory when loaded from a file.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Store directory with relative paths resolved.
    pub fn store_path(&self) -> PathBuf {
        if self.store_dir.is_absolute() {
            return self.store_dir.clone();
        }
        match self.base_dir() {
            Some(base) if !base.as_os_str().is_empty() => base.join(&self.store_dir),
            _ => self.store_dir.clone(),
        }
    }

    pub fn combined_metadata_path(&self) -> PathBuf {
        self.store_path().join(&self.combined_metadata_file)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Link selectors in effect.
    pub fn effective_link_patterns(&self) -> Vec<String> {
        if self.link_patterns.is_empty() {
            default_patterns(&self.document_extension)
        } else {
            self.link_patterns.clone()
        }
    }

    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            extension: self.document_extension.clone(),
            patterns: self.effective_link_patterns(),
            structured_attribute: self.structured_link_attribute.clone(),
        }
    }

    /// Parsed base URL.
    pub fn base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url {:?}: {}", self.base_url, e)))
    }

    /// Parsed start URL.
    pub fn start(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.start_url)
            .map_err(|e| ConfigError::Invalid(format!("start_url {:?}: {}", self.start_url, e)))
    }

    /// Check values that cannot be caught by deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base()?;
        self.start()?;

        let ext = self.document_extension.trim();
        if ext.is_empty() || ext.contains('.') {
            return Err(ConfigError::Invalid(format!(
                "document_extension must be a bare extension like \"pdf\", got {:?}",
                self.document_extension
            )));
        }
        if self.result_item_selector.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "result_item_selector must not be empty".to_string(),
            ));
        }
        if self.structured_link_attribute.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "structured_link_attribute must not be empty".to_string(),
            ));
        }
        if self.combined_metadata_file.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "combined_metadata_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ArchiveConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_pages, 0);
        assert_eq!(config.effective_link_patterns(), default_patterns("pdf"));
        assert_eq!(config.combined_metadata_path(), PathBuf::from("docs/docs_metadata.json"));
    }

    #[test]
    fn test_load_toml_partial_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive-harvest.toml");
        std::fs::write(
            &path,
            r#"
max_pages = 3
store_dir = "out"
link_patterns = ["a.custom"]

[browser]
headless = false
"#,
        )
        .unwrap();

        let config = ArchiveConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.document_extension, "pdf");
        assert_eq!(config.effective_link_patterns(), vec!["a.custom".to_string()]);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.timeout, 30);
        assert_eq!(config.store_path(), dir.path().join("out"));
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"document_extension": "docx"}"#).unwrap();

        let config = ArchiveConfig::load_from_path(&path).unwrap();
        assert_eq!(config.document_extension, "docx");
        assert!(config.discovery_settings().patterns[1].contains(".docx"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_pages = \"many\"").unwrap();

        let err = ArchiveConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ArchiveConfig {
            start_url: "/relative".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ArchiveConfig {
            document_extension: ".pdf".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
