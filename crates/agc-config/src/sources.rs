// Configuration source loading.
//
// Priority order:
// 1. Environment variables (AGC_* prefix)
// 2. Config file path from AGC_CONFIG
// 3. Inline config content from AGC_CONFIG_CONTENT
// 4. Default config file (~/.agc/config.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::{AgcConfig, AGC_HOME_DIR};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<AgcConfig> {
    let mut config = load_from_file()?.unwrap_or_default();

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<AgcConfig>> {
    if let Ok(path) = env::var("AGC_CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("AGC_CONFIG_CONTENT") {
        let config: AgcConfig = toml::from_str(&content)
            .context("Failed to parse inline config from AGC_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    if let Some(path) = default_config_path() {
        if path.exists() {
            return read_config_file(&path).map(Some);
        }
    }

    Ok(None)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(AGC_HOME_DIR).join(CONFIG_FILE_NAME))
}

fn read_config_file(path: &Path) -> Result<AgcConfig> {
    debug!(path = %path.display(), "Reading config file");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<AgcConfig> {
    let mut config = read_config_file(path.as_ref())?;

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [logging]
            level = "warn"
            format = "json"

            [cdk]
            core_app_dir = "cdk/core"
            "#
        )
        .unwrap();

        let config = read_config_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.cdk.core_app_dir, "cdk/core");
        assert_eq!(config.cdk.command, "npm");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging\nlevel = ").unwrap();
        let err = read_config_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
