//! `agc account activate` - deploy the core infrastructure into an account

use agc_aws::{
    AwsContext, DeploymentService, IdentityService, ImageCatalog, ImageKey, OutputLines,
    RegistryService, Result, StorageService,
};
use agc_config::AgcConfig;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::clierror::CliError;

const BUCKET_PREFIX: &str = "agc";
const PROGRESS_LABEL: &str = "Activating account...";
const SUGGESTION: &str =
    "check you have valid aws credentials, check the custom bucket and VPC (if any) exist";

#[derive(Args, Debug, Clone, Default)]
pub struct ActivateArgs {
    /// The name of an S3 bucket that AGC will use to store its data.
    /// An autogenerated name will be used if not specified. A new bucket will
    /// be created if the bucket does not exist.
    #[arg(long, value_name = "NAME")]
    pub bucket: Option<String>,

    /// The ID of a VPC that AGC will run in.
    /// A new VPC will be created if not specified.
    #[arg(long, value_name = "VPC_ID")]
    pub vpc: Option<String>,
}

/// How deployment progress is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Stay quiet while deploying; replay the tool output if it fails
    Verbose,
    /// Summarised progress bar
    Summary,
}

impl ProgressMode {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            ProgressMode::Verbose
        } else {
            ProgressMode::Summary
        }
    }
}

/// Inputs of one activation
#[derive(Debug, Clone)]
pub struct ActivationOptions {
    pub bucket_name: Option<String>,
    pub vpc_id: Option<String>,
    pub images: ImageCatalog,
    pub region: String,
    /// Directory holding the CDK core application
    pub core_app_dir: PathBuf,
    pub progress_mode: ProgressMode,
}

impl ActivationOptions {
    pub fn new(
        args: &ActivateArgs,
        images: ImageCatalog,
        region: impl Into<String>,
        core_app_dir: PathBuf,
        progress_mode: ProgressMode,
    ) -> Self {
        Self {
            bucket_name: non_empty(args.bucket.as_deref()),
            vpc_id: non_empty(args.vpc.as_deref()),
            images,
            region: region.into(),
            core_app_dir,
            progress_mode,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// The external services an activation talks to
pub struct Activator<'a> {
    pub identity: &'a dyn IdentityService,
    pub storage: &'a dyn StorageService,
    pub registry: &'a dyn RegistryService,
    pub deployment: &'a dyn DeploymentService,
}

impl Activator<'_> {
    /// Run the activation. Stops at the first failure; nothing is rolled back.
    pub async fn execute(&self, opts: &mut ActivationOptions) -> Result<()> {
        let bucket_name = match opts.bucket_name.clone() {
            Some(bucket_name) => bucket_name,
            None => {
                let generated = self.generate_default_bucket(&opts.region).await?;
                opts.bucket_name = Some(generated.clone());
                generated
            }
        };

        let exists = self.storage.bucket_exists(&bucket_name).await?;

        for (key, image) in opts.images.iter() {
            info!(image = %key, reference = %image, "Verifying container image");
            self.registry.verify_image_exists(image).await?;
        }

        let environment = build_environment(
            &bucket_name,
            !exists,
            &opts.images,
            opts.vpc_id.as_deref(),
        );

        deploy_core_infrastructure(
            self.deployment,
            &opts.core_app_dir,
            environment,
            opts.progress_mode,
        )
        .await
    }

    async fn generate_default_bucket(&self, region: &str) -> Result<String> {
        let account_id = self.identity.account_id().await?;
        Ok(generate_bucket_name(&account_id, region))
    }
}

pub fn generate_bucket_name(account_id: &str, region: &str) -> String {
    format!("{}-{}-{}", BUCKET_PREFIX, account_id, region)
}

/// Deployment environment in its fixed order: bucket, create flag, four
/// fields per image, then `VPC_ID` when one was given.
pub fn build_environment(
    bucket_name: &str,
    create_bucket: bool,
    images: &ImageCatalog,
    vpc_id: Option<&str>,
) -> Vec<String> {
    let mut environment = vec![
        format!("AGC_BUCKET_NAME={}", bucket_name),
        format!("CREATE_AGC_BUCKET={}", create_bucket),
    ];

    for key in ImageKey::ALL {
        let image = images.get(key);
        let prefix = key.env_prefix();
        environment.push(format!("{}_ACCOUNT_ID={}", prefix, image.registry_id));
        environment.push(format!("{}_REGION={}", prefix, image.region));
        environment.push(format!("{}_TAG={}", prefix, image.image_tag));
        environment.push(format!("{}_REPOSITORY={}", prefix, image.repository_name));
    }

    if let Some(vpc_id) = vpc_id {
        environment.push(format!("VPC_ID={}", vpc_id));
    }

    environment
}

pub async fn deploy_core_infrastructure(
    deployment: &dyn DeploymentService,
    core_app_dir: &Path,
    environment: Vec<String>,
    mode: ProgressMode,
) -> Result<()> {
    let mut stream = deployment.deploy_app(core_app_dir, environment).await?;

    match mode {
        ProgressMode::Summary => stream.display_progress(PROGRESS_LABEL).await,
        ProgressMode::Verbose => {
            let mut last_outputs = OutputLines::default();
            while let Some(event) = stream.next_event().await {
                if let Some(err) = event.err {
                    for line in last_outputs.to_vec() {
                        error!("{}", line);
                    }
                    return Err(err);
                }
                last_outputs = event.outputs;
            }
            Ok(())
        }
    }
}

/// Check a user supplied bucket name against the S3 naming rules.
fn validate_bucket_name(input: &str) -> std::result::Result<(), String> {
    if input.len() < 3 || input.len() > 63 {
        return Err("Bucket name must be 3-63 characters".to_string());
    }
    if !input
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(
            "Bucket name must contain only lowercase letters, numbers, dots, and hyphens"
                .to_string(),
        );
    }
    if input.starts_with('-') || input.ends_with('-') {
        return Err("Bucket name cannot start or end with a hyphen".to_string());
    }
    Ok(())
}

/// Entry point for the CLI command
pub async fn run(args: ActivateArgs, config: &AgcConfig) -> anyhow::Result<()> {
    info!(
        "Activating AGC with bucket '{}' and VPC '{}'",
        args.bucket.as_deref().unwrap_or_default(),
        args.vpc.as_deref().unwrap_or_default()
    );

    activate(&args, config)
        .await
        .map_err(|err| CliError::new("account activate", &args, err, SUGGESTION).into())
}

async fn activate(args: &ActivateArgs, config: &AgcConfig) -> anyhow::Result<()> {
    let home = agc_config::home_dir()?;
    let aws = AwsContext::from_config(config).await?;

    let mut opts = ActivationOptions::new(
        args,
        ImageCatalog::from_config(&config.images),
        aws.region.clone(),
        config.core_app_path(&home),
        ProgressMode::from_verbose(config.logging.verbose),
    );

    if let Some(bucket) = &opts.bucket_name {
        if let Err(reason) = validate_bucket_name(bucket) {
            warn!(bucket = %bucket, "{}", reason);
        }
    }

    let activator = Activator {
        identity: &aws.sts,
        storage: &aws.s3,
        registry: &aws.ecr,
        deployment: &aws.cdk,
    };
    activator.execute(&mut opts).await?;
    Ok(())
}
