//! Account command - manage AGC in an AWS account

pub mod activate;

use agc_config::AgcConfig;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Activate AGC in an AWS account.
    #[command(
        long_about = "Activate AGC in an AWS account.\n\
            AGC will use your default AWS credentials to deploy all AWS resources\n\
            it needs to that account and region.",
        after_help = "Example:\n  \
            Activate AGC in your AWS account with a custom S3 bucket and VPC.\n  \
            $ agc account activate --bucket my-custom-bucket --vpc my-vpc-id"
    )]
    Activate(activate::ActivateArgs),
}

impl AccountCommand {
    pub async fn run(self, config: &AgcConfig) -> anyhow::Result<()> {
        match self {
            AccountCommand::Activate(args) => activate::run(args, config).await,
        }
    }
}
