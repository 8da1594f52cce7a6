use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walls_common::error::{ConfigError, ValidationError};
use walls_common::{EffectRegistry, Result, SetRule, StorageLayout, WallsError};

#[cfg(test)]
mod validation_tests;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub storage: StorageConfig,
    pub effects: EffectsConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    #[serde(default = "default_sources")]
    pub sources: PathBuf,
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
    #[serde(default = "default_runtime")]
    pub runtime: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EffectsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Effect name to command template
    #[serde(flatten)]
    pub effects: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BehaviorConfig {
    #[serde(default)]
    pub allow_repeat: bool,
    #[serde(default)]
    pub set: Vec<SetRuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SetRuleConfig {
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkill: Option<String>,
}

const APP_DIR: &str = "walls";

// Default values
fn default_sources() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn default_cache() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn default_runtime() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            cache: default_cache(),
            runtime: default_runtime(),
        }
    }
}

/// `<config_dir>/walls/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(WallsError::Config(ConfigError::NoConfigDir))?
        .join(APP_DIR);
    Ok(config_dir.join("config.toml"))
}

/// Expands `$VAR`/`${VAR}` references, then a leading `~/`. Unset variables are left as written.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let with_env =
        shellexpand::env_with_context_no_errors(raw.as_ref(), |name| std::env::var(name).ok());
    let expanded = shellexpand::tilde(with_env.as_ref());
    PathBuf::from(expanded.as_ref())
}

impl Config {
    /// Loads and validates the file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::warn!(
                "Configuration file {:?} not found, using defaults (no wallpaper set behaviors configured)",
                path
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            WallsError::Config(ConfigError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        log::debug!("Loaded configuration from {:?}", path);

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).map_err(ConfigError::from)?;
        config.storage.sources = expand_path(&config.storage.sources);
        config.storage.cache = expand_path(&config.storage.cache);
        config.storage.runtime = expand_path(&config.storage.runtime);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let registry = self.effect_registry()?;

        for (index, rule) in self.set_rules().iter().enumerate() {
            rule.validate(index, &registry)
                .map_err(|e| validation_error(format!("behavior.set[{}]", index), e))?;
        }

        if self.behavior.set.is_empty() {
            log::warn!("No wallpaper set behaviors configured; `walls set` will fail");
        }
        Ok(())
    }

    pub fn storage_layout(&self) -> StorageLayout {
        StorageLayout::new(
            self.storage.sources.clone(),
            self.storage.cache.clone(),
            self.storage.runtime.clone(),
        )
    }

    pub fn effect_registry(&self) -> Result<EffectRegistry> {
        EffectRegistry::new(self.effects.effects.clone(), self.effects.default.clone())
            .map_err(|e| validation_error("effects".to_string(), e))
    }

    pub fn set_rules(&self) -> Vec<SetRule> {
        self.behavior
            .set
            .iter()
            .map(|rule| SetRule {
                command: rule.command.clone(),
                effect: rule.effect.clone(),
                pkill: rule.pkill.clone(),
            })
            .collect()
    }
}

fn validation_error(field: String, source: ValidationError) -> WallsError {
    WallsError::Config(ConfigError::Validation { field, source })
}
