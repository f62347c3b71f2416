//! Error types for the AWS collaborators

use thiserror::Error;

/// Errors raised while talking to AWS or the CDK
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The caller identity (account id) could not be resolved
    #[error("Unable to determine the AWS account id: {reason}")]
    IdentityLookup { reason: String },

    /// The bucket existence check failed for a reason other than "not found"
    #[error("Unable to check S3 bucket '{bucket}': {reason}")]
    StorageAccess { bucket: String, reason: String },

    /// A required container image is missing or unreadable
    #[error("Unable to verify container image '{image}': {reason}")]
    RegistryVerification { image: String, reason: String },

    /// The CDK deployment reported a failure
    #[error("Deployment failed: {message}")]
    Deployment {
        message: String,
        /// Output collected from the deployment tool before it failed
        outputs: Vec<String>,
    },

    /// Local state needed for the operation is missing or unusable
    #[error("Invalid local configuration: {message}")]
    Config { message: String },
}

impl Error {
    pub fn identity_lookup(reason: impl Into<String>) -> Self {
        Self::IdentityLookup {
            reason: reason.into(),
        }
    }

    pub fn storage_access(bucket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StorageAccess {
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }

    pub fn registry_verification(image: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RegistryVerification {
            image: image.into(),
            reason: reason.into(),
        }
    }

    pub fn deployment(message: impl Into<String>, outputs: Vec<String>) -> Self {
        Self::Deployment {
            message: message.into(),
            outputs,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for Error
pub type Result<T> = std::result::Result<T, Error>;
