//! The fixed set of images the core infrastructure runs

use agc_config::{ImageConfig, ImagesConfig};
use std::fmt;

use crate::ecr::ImageReference;

/// Logical image names, declared in the order they are verified and
/// written to the deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageKey {
    Wes,
    Cromwell,
    Nextflow,
}

impl ImageKey {
    pub const ALL: [ImageKey; 3] = [ImageKey::Wes, ImageKey::Cromwell, ImageKey::Nextflow];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKey::Wes => "wes-image",
            ImageKey::Cromwell => "cromwell-image",
            ImageKey::Nextflow => "nextflow-image",
        }
    }

    /// Prefix of the deployment environment variables for this image
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ImageKey::Wes => "ECR_WES",
            ImageKey::Cromwell => "ECR_CROMWELL",
            ImageKey::Nextflow => "ECR_NEXTFLOW",
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup table from logical image name to registry location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCatalog {
    wes: ImageReference,
    cromwell: ImageReference,
    nextflow: ImageReference,
}

impl ImageCatalog {
    pub fn new(wes: ImageReference, cromwell: ImageReference, nextflow: ImageReference) -> Self {
        Self {
            wes,
            cromwell,
            nextflow,
        }
    }

    pub fn from_config(config: &ImagesConfig) -> Self {
        Self::new(
            reference(&config.wes),
            reference(&config.cromwell),
            reference(&config.nextflow),
        )
    }

    pub fn get(&self, key: ImageKey) -> &ImageReference {
        match key {
            ImageKey::Wes => &self.wes,
            ImageKey::Cromwell => &self.cromwell,
            ImageKey::Nextflow => &self.nextflow,
        }
    }

    /// Entries in `ImageKey::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = (ImageKey, &ImageReference)> + '_ {
        ImageKey::ALL.into_iter().map(move |key| (key, self.get(key)))
    }
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::from_config(&ImagesConfig::default())
    }
}

fn reference(image: &ImageConfig) -> ImageReference {
    ImageReference {
        registry_id: image.account_id.clone(),
        region: image.region.clone(),
        image_tag: image.tag.clone(),
        repository_name: image.repository.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_order_is_fixed() {
        let catalog = ImageCatalog::default();
        let keys: Vec<ImageKey> = catalog.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ImageKey::ALL.to_vec());
    }

    #[test]
    fn test_from_config() {
        let mut config = ImagesConfig::default();
        config.cromwell.tag = "85".to_string();
        let catalog = ImageCatalog::from_config(&config);

        let cromwell = catalog.get(ImageKey::Cromwell);
        assert_eq!(cromwell.image_tag, "85");
        assert_eq!(cromwell.repository_name, "aws/cromwell-mirror");
        assert_eq!(catalog.get(ImageKey::Wes).repository_name, "aws/wes-release");
    }

    #[test]
    fn test_key_names() {
        assert_eq!(ImageKey::Wes.as_str(), "wes-image");
        assert_eq!(ImageKey::Nextflow.env_prefix(), "ECR_NEXTFLOW");
        assert_eq!(ImageKey::Cromwell.to_string(), "cromwell-image");
    }
}
