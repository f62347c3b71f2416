use agc_config::AgcConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Filter used by `--verbose`: debug for agc's own crates, info for the SDK
const VERBOSE_LOG_FILTER: &str = "info,agc=debug,agc_aws=debug,agc_config=debug";

/// Amazon Genomics CLI
#[derive(Parser, Debug)]
#[command(name = "agc")]
#[command(version)]
#[command(about = "Amazon Genomics CLI - run genomics workflows on AWS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Display verbose diagnostic information
    #[arg(short, long, global = true)]
    verbose: bool,

    /// AWS named profile to use
    #[arg(long, value_name = "NAME", global = true)]
    profile: Option<String>,

    /// AWS region to use (overrides profile and environment)
    #[arg(long, value_name = "REGION", global = true)]
    region: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Commands for AWS account setup
    Account {
        #[command(subcommand)]
        command: agc::account::AccountCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AgcConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AgcConfig::load().context("Failed to load configuration")?,
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    agc::init_tracing(&config);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async move {
            match cli.command {
                Commands::Account { command } => command.run(&config).await,
            }
        })
}

fn apply_cli_overrides(config: &mut AgcConfig, cli: &Cli) {
    if let Some(profile) = &cli.profile {
        config.aws.profile = Some(profile.clone());
    }
    if let Some(region) = &cli.region {
        config.aws.region = Some(region.clone());
    }

    if cli.verbose {
        config.logging.verbose = true;
        // Verbose implies debug output unless a level was given explicitly
        if cli.log_level.is_none() {
            config.logging.level = VERBOSE_LOG_FILTER.to_string();
        }
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agc::account::AccountCommand;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_activate_flags() {
        let cli = Cli::parse_from([
            "agc",
            "account",
            "activate",
            "--bucket",
            "my-bucket",
            "--vpc",
            "vpc-123",
        ]);
        let Commands::Account {
            command: AccountCommand::Activate(args),
        } = cli.command;
        assert_eq!(args.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(args.vpc.as_deref(), Some("vpc-123"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_activate_rejects_positional_args() {
        let result = Cli::try_parse_from(["agc", "account", "activate", "extra"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "agc",
            "account",
            "activate",
            "--verbose",
            "--profile",
            "genomics",
            "--region",
            "eu-west-1",
        ]);
        let mut config = AgcConfig::default();
        apply_cli_overrides(&mut config, &cli);

        assert!(config.logging.verbose);
        assert_eq!(config.logging.level, VERBOSE_LOG_FILTER);
        assert_eq!(config.aws.profile.as_deref(), Some("genomics"));
        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_verbose_filter_keeps_sdk_at_info() {
        let cli = Cli::parse_from(["agc", "-v", "account", "activate"]);
        let mut config = AgcConfig::default();
        apply_cli_overrides(&mut config, &cli);

        config.validate().unwrap();
        let directives: Vec<&str> = config.logging.level.split(',').collect();
        assert_eq!(directives[0], "info");
        assert!(directives.contains(&"agc=debug"));
        assert!(directives.contains(&"agc_aws=debug"));
        assert!(!directives.contains(&"debug"));
        assert!(tracing_subscriber::EnvFilter::try_new(&config.logging.level).is_ok());
    }

    #[test]
    fn test_explicit_log_level_wins_over_verbose() {
        let cli = Cli::parse_from(["agc", "-v", "--log-level", "warn", "account", "activate"]);
        let mut config = AgcConfig::default();
        apply_cli_overrides(&mut config, &cli);

        assert!(config.logging.verbose);
        assert_eq!(config.logging.level, "warn");
    }
}
