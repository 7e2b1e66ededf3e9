//! OCL daemon: runs one governance operation per invocation against the
//! LMDB-backed ledgers of the token and action contracts.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ocl_governance::{GovernanceService, Response};
use ocl_store::{IdentityProvider, StaticIdentity};
use ocl_store_lmdb::environment::DEFAULT_MAX_DBS;
use ocl_store_lmdb::LmdbEnvironment;
use ocl_types::{OrganisationId, SystemClock};
use ocl_utils::LogFormat;

use crate::config::DaemonConfig;

/// LMDB namespace of the action contract.
const ACTION_NAMESPACE: &str = "auto_action";

#[derive(Parser, Debug)]
#[command(name = "ocl-daemon", about = "OCL governance and incentive contracts")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "OCL_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, env = "OCL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Organisation this process acts for.
    #[arg(long, env = "OCL_ORGANISATION")]
    org: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "OCL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "OCL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run an operation on a contract ("vote" or "action").
    Invoke {
        route: String,
        operation: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Write empty collections to both contracts.
    Init,
    /// Print the effective configuration.
    Config,
}

/// File settings overridden by CLI flags and environment variables.
fn effective_config(cli: &Cli) -> anyhow::Result<DaemonConfig> {
    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(org) = &cli.org {
        config.organisation = Some(org.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn open_service(config: &DaemonConfig) -> anyhow::Result<GovernanceService> {
    let env = LmdbEnvironment::open(&config.data_dir, DEFAULT_MAX_DBS, config.map_size_bytes())
        .with_context(|| format!("opening ledger at {}", config.data_dir.display()))?;
    let token_store = Arc::new(env.ledger(&config.governance.token_contract)?);
    let action_store = Arc::new(env.ledger(ACTION_NAMESPACE)?);

    let identity: Arc<dyn IdentityProvider> = match &config.organisation {
        Some(org) => Arc::new(StaticIdentity::new(
            OrganisationId::new(org).context("invalid --org")?,
        )),
        None => Arc::new(StaticIdentity::anonymous()),
    };

    Ok(GovernanceService::in_process(
        token_store,
        action_store,
        identity,
        Arc::new(SystemClock),
        config.governance.clone(),
    ))
}

fn report(response: Response) -> anyhow::Result<()> {
    if !response.is_success() {
        anyhow::bail!("{}", response.message);
    }
    println!("{}", response.message);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;
    ocl_utils::init_logging(config.log_format, &config.log_level)?;
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "loaded configuration file");
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "effective configuration");

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Init => {
            let service = open_service(&config)?;
            report(service.invoke("reset", &[]))
        }
        Command::Invoke {
            route,
            operation,
            args,
        } => {
            let service = open_service(&config)?;
            tracing::debug!(%route, %operation, args = args.len(), "invoking");
            report(service.invoke_routed(&route, &operation, &args))
        }
    }
}
