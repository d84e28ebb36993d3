use config::{Config, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

pub mod validator;

use crate::cli::Cli;
use crate::domain::SearchSourceConfig;
use crate::search::OrchestratorConfig;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub options: OptionSettings,
    /// Search sources, merged with `config/sources/*`
    #[serde(default)]
    pub sources: Vec<SearchSourceConfig>,
    /// Records served by the in-memory catalog, merged with `config/catalogs/*`
    #[serde(default)]
    pub catalogs: Vec<CatalogConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchSettings {
    /// Quiet window before a query is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Unset waits for the catalog indefinitely
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            timeout_ms: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    400
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct OptionSettings {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Records available under one endpoint
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    pub endpoint: String,
    #[serde(default)]
    pub records: Vec<Value>,
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (config file, directories, then CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let config_path = &cli.config;
        let root = config_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");

        let mut settings = Self::from_file(config_path)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.load_external_configs(root)?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join("formwright");
        let mut settings = Self::from_file(&config_path)?;

        settings.load_external_configs(root)?;
        settings.validate()?;

        Ok(settings)
    }

    fn from_file(config_path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(config_path.to_path_buf()).required(false))
            .set_default("search.debounce_ms", default_debounce_ms() as i64)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(debounce_ms) = cli.debounce_ms {
            self.search.debounce_ms = debounce_ms;
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            self.search.timeout_ms = Some(timeout_ms);
            self.options.timeout_ms = Some(timeout_ms);
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Timing for search orchestrators built from these settings
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            debounce: Duration::from_millis(self.search.debounce_ms),
            timeout: self.search.timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn options_timeout(&self) -> Option<Duration> {
        self.options.timeout_ms.map(Duration::from_millis)
    }

    pub fn source(&self, key: &str) -> Option<&SearchSourceConfig> {
        self.sources.iter().find(|s| s.key == key)
    }

    fn load_external_configs(&mut self, root: &str) -> Result<(), anyhow::Error> {
        self.load_sources_from_dir(&format!("{}/config/sources", root))?;
        self.load_catalogs_from_dir(&format!("{}/config/catalogs", root))?;
        Ok(())
    }

    fn load_sources_from_dir(&mut self, path: &str) -> Result<(), anyhow::Error> {
        let pattern = format!("{}/*", path);
        for entry in glob::glob(&pattern)? {
            match entry {
                Ok(path) => {
                    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                        if matches!(ext, "json" | "yaml" | "yml" | "toml") {
                            let content = std::fs::read_to_string(&path)?;
                            let source: SearchSourceConfig = match ext {
                                "json" => serde_json::from_str(&content)?,
                                "toml" => toml::from_str(&content)?,
                                _ => serde_yaml::from_str(&content)?,
                            };
                            tracing::debug!("Loaded search source '{}' from {:?}", source.key, path);
                            self.sources.push(source);
                        }
                    }
                }
                Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
            }
        }
        Ok(())
    }

    fn load_catalogs_from_dir(&mut self, path: &str) -> Result<(), anyhow::Error> {
        let pattern = format!("{}/*.json", path);
        for entry in glob::glob(&pattern)? {
            match entry {
                Ok(path) => {
                    let content = std::fs::read_to_string(&path)?;
                    let catalog: CatalogConfig = serde_json::from_str(&content)?;
                    tracing::debug!(
                        "Loaded {} records for '{}' from {:?}",
                        catalog.records.len(),
                        catalog.endpoint,
                        path
                    );
                    self.catalogs.push(catalog);
                }
                Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
            }
        }
        Ok(())
    }
}
