use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::pole::mapper::config::Configuration;
use crate::pole::mapper::error::{Result, ToolError};

/// Name of the built-in configuration.
pub const DEFAULT_CONFIGURATION: &str = "Default";

const DEFAULT_FILE: &str = "pole_mapper_config.json";
const CONFIGURATIONS_DIR: &str = "configurations";

/// Company configurations stored as JSON files under a base directory.
/// `Default` lives in `<base>/pole_mapper_config.json`, every other company
/// in `<base>/configurations/<name>.json`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    base: PathBuf,
}

impl ConfigStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// File backing the named configuration.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name == DEFAULT_CONFIGURATION {
            return Ok(self.base.join(DEFAULT_FILE));
        }
        let valid = !name.trim().is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(ToolError::InvalidConfig(format!(
                "'{name}' is not a usable configuration name"
            )));
        }
        Ok(self.base.join(CONFIGURATIONS_DIR).join(format!("{name}.json")))
    }

    /// Configuration names: `Default` first, then stored companies sorted.
    pub fn available(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let dir = self.base.join(CONFIGURATIONS_DIR);
        if dir.is_dir() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                        if stem != DEFAULT_CONFIGURATION {
                            names.push(stem.to_string());
                        }
                    }
                }
            }
        }
        names.sort();
        names.insert(0, DEFAULT_CONFIGURATION.to_string());
        Ok(names)
    }

    /// Loads the named configuration. Keys missing from the file keep their
    /// defaults; a missing file yields the defaults, and so does a file that
    /// cannot be read or parsed (with a warning).
    pub fn load(&self, name: &str) -> Result<Configuration> {
        let path = self.path_for(name)?;
        if !path.exists() {
            debug!(configuration = name, path = %path.display(), "no stored configuration, using defaults");
            return Ok(Configuration::default());
        }

        let parsed = fs::read_to_string(&path)
            .map_err(ToolError::from)
            .and_then(|source| Configuration::from_json_str(&source));
        match parsed {
            Ok(config) => {
                info!(configuration = name, path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(error) => {
                warn!(
                    configuration = name,
                    path = %path.display(),
                    %error,
                    "configuration unusable, using defaults"
                );
                Ok(Configuration::default())
            }
        }
    }

    /// Validates and stores a configuration, returning the file written.
    pub fn save(&self, name: &str, config: &Configuration) -> Result<PathBuf> {
        config.validate()?;
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(config)?)?;
        info!(configuration = name, path = %path.display(), "configuration saved");
        Ok(path)
    }

    /// Removes a stored company configuration. `Default` cannot be deleted.
    pub fn delete(&self, name: &str) -> Result<()> {
        if name == DEFAULT_CONFIGURATION {
            return Err(ToolError::InvalidConfig(
                "the Default configuration cannot be deleted".into(),
            ));
        }
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(ToolError::UnknownConfiguration(name.to_string()));
        }
        fs::remove_file(&path)?;
        info!(configuration = name, "configuration deleted");
        Ok(())
    }
}
