//! Caller identity lookup via STS

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::error::DisplayErrorContext;
use tracing::debug;

use crate::{Error, Result};

/// Resolves the AWS account the current credentials belong to.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn account_id(&self) -> Result<String>;
}

pub struct StsClient {
    client: aws_sdk_sts::Client,
}

impl StsClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_sts::Client::new(config),
        }
    }
}

#[async_trait]
impl IdentityService for StsClient {
    async fn account_id(&self) -> Result<String> {
        let identity = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| Error::identity_lookup(DisplayErrorContext(&e).to_string()))?;

        let account = identity
            .account()
            .filter(|account| !account.is_empty())
            .ok_or_else(|| Error::identity_lookup("GetCallerIdentity returned no account"))?;

        debug!(account, arn = identity.arn().unwrap_or_default(), "Resolved caller identity");
        Ok(account.to_string())
    }
}
