//! emr CLI tool.

use clap::{Parser, Subcommand};
use emr_config::{DEFAULT_CONFIG_PATH, RunConfig};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::TargetArgs;
use commands::deploy::DeployArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "emr")]
#[command(about = "Package, deploy and run PySpark projects on Amazon EMR", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the saved configuration
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a project on EMR Serverless, EMR on EC2 or EMR on EKS
    Run(RunArgs),
    /// Upload a project to S3
    Deploy(DeployArgs),
    /// Manage saved run defaults
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the saved configuration
    Show,
    /// Save the given values as defaults for later commands
    Save(TargetArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let saved = RunConfig::load(&cli.config);

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &saved).await,
        Commands::Deploy(args) => commands::deploy::deploy(args, &saved).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::show(&saved, &cli.config),
            ConfigCommands::Save(args) => {
                commands::config::save(&args, &saved, &cli.config).map(|_| ())
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli).await {
        error!("{:#}", e);
        let code = e
            .downcast_ref::<emr_core::Error>()
            .map(|e| e.exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_package::ProjectKind;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "emr",
            "run",
            "--application-id",
            "00abc",
            "--entry-point",
            "main.py",
            "--project-type",
            "poetry",
            "--job-args",
            "--date,2024-01-01",
            "--spark-submit-opts",
            "--conf spark.driver.memory=4g",
            "--timeout",
            "30",
            "--show-stdout",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("Expected run command");
        };
        assert_eq!(args.target.application_id.as_deref(), Some("00abc"));
        assert_eq!(args.project.project_type, ProjectKind::Poetry);

        let opts = args.options(&RunConfig::default());
        assert_eq!(opts.job_name, "emr-cli job");
        assert_eq!(opts.job_args, vec!["--date", "2024-01-01"]);
        assert_eq!(opts.submit_opts.as_deref(), Some("--conf spark.driver.memory=4g"));
        assert_eq!(opts.timeout_minutes, Some(30));
        assert!(opts.show_logs);
        assert!(!opts.wait);
        assert!(opts.needs_polling());
    }

    #[test]
    fn test_negative_timeout_parses_then_fails_validation() {
        let cli = Cli::try_parse_from([
            "emr",
            "run",
            "--cluster-id",
            "j-123",
            "--entry-point",
            "main.py",
            "--timeout",
            "-5",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("Expected run command");
        };
        assert!(args.options(&RunConfig::default()).validate().is_err());
    }

    #[test]
    fn test_unknown_project_type_rejected() {
        let result = Cli::try_parse_from([
            "emr",
            "run",
            "--entry-point",
            "main.py",
            "--project-type",
            "maven",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_logs_uri_comes_from_config() {
        let cli = Cli::try_parse_from(["emr", "run", "--entry-point", "main.py", "--wait"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("Expected run command");
        };
        let saved = RunConfig {
            s3_logs_uri: Some("s3://bucket/logs/".to_string()),
            ..Default::default()
        };
        let config = args.target.resolve(&saved);
        let opts = args.options(&config);
        assert_eq!(opts.logs_uri.as_deref(), Some("s3://bucket/logs/"));
        assert!(opts.job_args.is_empty());
    }

    #[test]
    fn test_parse_config_save() {
        let cli = Cli::try_parse_from([
            "emr",
            "config",
            "save",
            "--virtual-cluster-id",
            "vc-1",
            "--release-label",
            "emr-7.2.0-latest",
            "--config",
            "/tmp/emr.kdl",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/tmp/emr.kdl"));
        let Commands::Config {
            command: ConfigCommands::Save(args),
        } = cli.command
        else {
            panic!("Expected config save command");
        };
        assert_eq!(args.virtual_cluster_id.as_deref(), Some("vc-1"));
        assert_eq!(args.release_label.as_deref(), Some("emr-7.2.0-latest"));
    }
}
