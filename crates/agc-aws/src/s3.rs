//! S3 bucket existence check

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

use crate::{Error, Result};

/// Answers whether a bucket already exists.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;
}

pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait]
impl StorageService for S3Client {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                debug!(bucket, "Bucket exists");
                Ok(true)
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|service_err| service_err.is_not_found())
                    .unwrap_or(false)
                {
                    debug!(bucket, "Bucket does not exist");
                    return Ok(false);
                }
                Err(Error::storage_access(
                    bucket,
                    DisplayErrorContext(&err).to_string(),
                ))
            }
        }
    }
}
