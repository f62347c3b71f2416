// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use std::path::Path;
use tracing::warn;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

pub fn validate_config(config: &AgcConfig) -> Result<()> {
    validate_logging_config(&config.logging)?;

    validate_image_config("wes", &config.images.wes)?;
    validate_image_config("cromwell", &config.images.cromwell)?;
    validate_image_config("nextflow", &config.images.nextflow)?;

    validate_cdk_config(&config.cdk)?;

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        bail!("logging.level must not be empty");
    }

    // Directive strings such as "agc=debug,aws_config=warn" are passed
    // through to the subscriber untouched.
    if !config.level.contains('=') && !LOG_LEVELS.contains(&config.level.to_lowercase().as_str())
    {
        bail!(
            "logging.level '{}' is not one of: {}",
            config.level,
            LOG_LEVELS.join(", ")
        );
    }

    Ok(())
}

fn validate_image_config(name: &str, image: &ImageConfig) -> Result<()> {
    if image.account_id.is_empty() {
        bail!("images.{}.account_id must not be empty", name);
    }
    if image.region.is_empty() {
        bail!("images.{}.region must not be empty", name);
    }
    if image.tag.is_empty() {
        bail!("images.{}.tag must not be empty", name);
    }
    if image.repository.is_empty() {
        bail!("images.{}.repository must not be empty", name);
    }

    if image.account_id.len() != 12 || !image.account_id.chars().all(|c| c.is_ascii_digit()) {
        warn!(
            image = name,
            account_id = %image.account_id,
            "image account_id does not look like a 12 digit AWS account id"
        );
    }

    Ok(())
}

fn validate_cdk_config(config: &CdkConfig) -> Result<()> {
    if config.core_app_dir.is_empty() {
        bail!("cdk.core_app_dir must not be empty");
    }

    if Path::new(&config.core_app_dir).is_absolute() {
        bail!("cdk.core_app_dir must be relative to the home directory");
    }

    if config.command.is_empty() {
        bail!("cdk.command must not be empty");
    }

    Ok(())
}
