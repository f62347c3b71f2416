// agc-config - Layered configuration for the agc command line
//
// Supports configuration from multiple sources:
// 1. Command line flags (applied by the binary, highest priority)
// 2. Environment variables (AGC_* prefix)
// 3. Config file path from AGC_CONFIG env var
// 4. Config file contents from AGC_CONFIG_CONTENT env var
// 5. Default config file location (~/.agc/config.toml)
// 6. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};

/// Directory under the user's home that holds agc state.
pub const AGC_HOME_DIR: &str = ".agc";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgcConfig {
    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub cdk: CdkConfig,
}

/// AWS credentials and region selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Named profile from the shared AWS config files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Region override; the SDK default chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Replay full deployment output on failure instead of a progress bar
    #[serde(default)]
    pub verbose: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Location of one container image in ECR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub account_id: String,
    pub region: String,
    pub tag: String,
    pub repository: String,
}

impl ImageConfig {
    fn public(repository: &str, tag: &str) -> Self {
        Self {
            account_id: DEFAULT_IMAGE_ACCOUNT_ID.to_string(),
            region: DEFAULT_IMAGE_REGION.to_string(),
            tag: tag.to_string(),
            repository: repository.to_string(),
        }
    }
}

const DEFAULT_IMAGE_ACCOUNT_ID: &str = "680431765560";
const DEFAULT_IMAGE_REGION: &str = "us-east-1";

/// The images every activated account must be able to pull
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_wes_image")]
    pub wes: ImageConfig,
    #[serde(default = "default_cromwell_image")]
    pub cromwell: ImageConfig,
    #[serde(default = "default_nextflow_image")]
    pub nextflow: ImageConfig,
}

fn default_wes_image() -> ImageConfig {
    ImageConfig::public("aws/wes-release", "0.1.0")
}

fn default_cromwell_image() -> ImageConfig {
    ImageConfig::public("aws/cromwell-mirror", "64")
}

fn default_nextflow_image() -> ImageConfig {
    ImageConfig::public("aws/nextflow-mirror", "21.04.3")
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            wes: default_wes_image(),
            cromwell: default_cromwell_image(),
            nextflow: default_nextflow_image(),
        }
    }
}

/// CDK invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdkConfig {
    /// Core application directory, relative to the home directory
    #[serde(default = "default_core_app_dir")]
    pub core_app_dir: String,
    /// Program used to run the CDK npm scripts
    #[serde(default = "default_cdk_command")]
    pub command: String,
}

fn default_core_app_dir() -> String {
    ".agc/cdk/apps/core".to_string()
}

fn default_cdk_command() -> String {
    "npm".to_string()
}

impl Default for CdkConfig {
    fn default() -> Self {
        Self {
            core_app_dir: default_core_app_dir(),
            command: default_cdk_command(),
        }
    }
}

impl AgcConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from an explicit file (for the CLI --config flag)
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Absolute path of the CDK core application below `home`.
    pub fn core_app_path(&self, home: &Path) -> PathBuf {
        home.join(&self.cdk.core_app_dir)
    }
}

/// Resolve the current user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Unable to determine the home directory of the current user")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let config = AgcConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.verbose);
        assert_eq!(config.cdk.core_app_dir, ".agc/cdk/apps/core");
        assert_eq!(config.images.wes.repository, "aws/wes-release");
        assert_eq!(config.images.cromwell.region, "us-east-1");
        assert!(config.aws.profile.is_none());
    }

    #[test]
    fn test_core_app_path() {
        let config = AgcConfig::default();
        let path = config.core_app_path(Path::new("/home/alice"));
        assert_eq!(path, PathBuf::from("/home/alice/.agc/cdk/apps/core"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AgcConfig = toml::from_str(
            r#"
            [aws]
            profile = "genomics"

            [images.nextflow]
            account_id = "111122223333"
            region = "eu-west-1"
            tag = "22.10.0"
            repository = "internal/nextflow"
            "#,
        )
        .unwrap();

        assert_eq!(config.aws.profile.as_deref(), Some("genomics"));
        assert_eq!(config.images.nextflow.tag, "22.10.0");
        assert_eq!(config.images.wes, default_wes_image());
        assert_eq!(config.logging.level, "info");
    }
}
