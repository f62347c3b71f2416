use super::{AgcConfig, ImageConfig, LogFormat};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "AGC_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the AGC_ prefix
    /// Used for AWS standard variables (AWS_PROFILE, AWS_REGION)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut AgcConfig, env: &E) -> Result<()> {
    // AWS selection; prefixed values win over the standard AWS variables
    if let Some(profile) = get_env_string(env, "PROFILE")? {
        config.aws.profile = Some(profile);
    }
    if let Some(region) = get_env_string(env, "REGION")? {
        config.aws.region = Some(region);
    } else if config.aws.region.is_none() {
        if let Some(region) = get_raw_env_string(env, "AWS_REGION")? {
            config.aws.region = Some(region);
        }
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.logging.format = format
            .parse::<LogFormat>()
            .context("Invalid AGC_LOG_FORMAT value")?;
    }
    if let Some(verbose) = get_env_bool(env, "VERBOSE")? {
        config.logging.verbose = verbose;
    }

    // Images
    apply_image_overrides(&mut config.images.wes, env, "WES")?;
    apply_image_overrides(&mut config.images.cromwell, env, "CROMWELL")?;
    apply_image_overrides(&mut config.images.nextflow, env, "NEXTFLOW")?;

    // CDK
    if let Some(dir) = get_env_string(env, "CDK_CORE_APP_DIR")? {
        config.cdk.core_app_dir = dir;
    }
    if let Some(command) = get_env_string(env, "CDK_COMMAND")? {
        config.cdk.command = command;
    }

    Ok(())
}

fn apply_image_overrides<E: EnvSource>(
    image: &mut ImageConfig,
    env: &E,
    name: &str,
) -> Result<()> {
    if let Some(account_id) = get_env_string(env, &format!("{}_ACCOUNT_ID", name))? {
        image.account_id = account_id;
    }
    if let Some(region) = get_env_string(env, &format!("{}_REGION", name))? {
        image.region = region;
    }
    if let Some(tag) = get_env_string(env, &format!("{}_TAG", name))? {
        image.tag = tag;
    }
    if let Some(repository) = get_env_string(env, &format!("{}_REPOSITORY", name))? {
        image.repository = repository;
    }
    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key).filter(|val| !val.is_empty()))
}

/// Get a raw environment variable without the AGC_ prefix
fn get_raw_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get_raw(key).filter(|val| !val.is_empty()))
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = match val.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(anyhow!(
                        "Failed to parse {}{} (expected bool): {}",
                        ENV_PREFIX,
                        key,
                        val
                    ))
                }
            };
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
