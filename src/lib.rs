// agc - Amazon Genomics CLI account management
//
// Deploys the AGC core infrastructure into an AWS account:
// - Resolves (or generates) the data bucket
// - Verifies the WES/Cromwell/Nextflow images are available
// - Runs the CDK core application with the resulting environment

mod init;

pub mod account;
pub mod clierror;

pub use init::init_tracing;
