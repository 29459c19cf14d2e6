use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EguruConfig {
    pub database: Option<String>,
    /// JSON catalog used for seeding instead of the built-in sample
    pub catalog: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

impl EguruConfig {
    /// Database path: explicit flag, then config file, then the default
    pub fn database_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_database_path_in(Path::new(".")))
    }

    pub fn catalog_path(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.catalog.as_ref().map(PathBuf::from))
    }

    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(Duration::from_millis)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("eguru.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".eguru").join("eguru.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<EguruConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: EguruConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &EguruConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
