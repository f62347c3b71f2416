//! AWS collaborators used by `agc account activate`
//!
//! Each external service sits behind a small async trait so the activation
//! flow can run against the real SDK clients or in-memory fakes.

use agc_config::AgcConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

pub mod cdk;
pub mod ecr;
mod error;
pub mod images;
pub mod s3;
pub mod sts;

pub use cdk::{CdkClient, DeploymentService, OutputLines, ProgressEvent, ProgressStream};
pub use ecr::{EcrClient, ImageReference, RegistryService};
pub use error::{Error, Result};
pub use images::{ImageCatalog, ImageKey};
pub use s3::{S3Client, StorageService};
pub use sts::{IdentityService, StsClient};

/// Load the shared SDK configuration for the configured profile/region.
pub async fn load_sdk_config(config: &AgcConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = &config.aws.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = &config.aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    loader.load().await
}

/// Real AWS clients plus the resolved region
pub struct AwsContext {
    pub region: String,
    pub sts: StsClient,
    pub s3: S3Client,
    pub ecr: EcrClient,
    pub cdk: CdkClient,
}

impl AwsContext {
    pub async fn from_config(config: &AgcConfig) -> Result<Self> {
        let sdk_config = load_sdk_config(config).await;
        let region = sdk_config
            .region()
            .map(|region| region.to_string())
            .ok_or_else(|| {
                Error::config(
                    "no AWS region configured; set AWS_REGION, use --region, or add a region to your AWS profile",
                )
            })?;
        debug!(region = %region, profile = ?config.aws.profile, "Loaded AWS configuration");

        Ok(Self {
            region,
            sts: StsClient::new(&sdk_config),
            s3: S3Client::new(&sdk_config),
            ecr: EcrClient::new(&sdk_config),
            cdk: CdkClient::new(config.cdk.command.clone(), config.aws.profile.clone()),
        })
    }
}
