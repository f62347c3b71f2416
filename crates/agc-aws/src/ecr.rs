//! Container image verification against ECR

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecr::config::Region;
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_sdk_ecr::types::ImageIdentifier;
use std::fmt;
use tracing::debug;

use crate::{Error, Result};

/// Location of a container image in an ECR registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry_id: String,
    pub region: String,
    pub image_tag: String,
    pub repository_name: String,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
            self.registry_id, self.region, self.repository_name, self.image_tag
        )
    }
}

/// Confirms that an image can be found in its registry.
#[async_trait]
pub trait RegistryService: Send + Sync {
    async fn verify_image_exists(&self, image: &ImageReference) -> Result<()>;
}

pub struct EcrClient {
    config: SdkConfig,
}

impl EcrClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Client bound to the image's own region, which may differ from the
    /// account's region.
    fn client_for(&self, region: &str) -> aws_sdk_ecr::Client {
        let conf = aws_sdk_ecr::config::Builder::from(&self.config)
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_ecr::Client::from_conf(conf)
    }
}

#[async_trait]
impl RegistryService for EcrClient {
    async fn verify_image_exists(&self, image: &ImageReference) -> Result<()> {
        let output = self
            .client_for(&image.region)
            .describe_images()
            .registry_id(&image.registry_id)
            .repository_name(&image.repository_name)
            .image_ids(ImageIdentifier::builder().image_tag(&image.image_tag).build())
            .send()
            .await
            .map_err(|e| {
                Error::registry_verification(image.to_string(), DisplayErrorContext(&e).to_string())
            })?;

        if output.image_details().is_empty() {
            return Err(Error::registry_verification(
                image.to_string(),
                "no image with that tag was found",
            ));
        }

        debug!(image = %image, "Verified container image");
        Ok(())
    }
}
