//! node-medic CLI
//!
//! Reboots Kubernetes nodes that are stuck NotReady through their cloud
//! provider's API

mod commands;
mod config;
mod output;

use anyhow::{anyhow, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use config::Config;
use medic_core::providers::{self, ContaboConfig};
use medic_core::{Context, Healer, KubeNodeSource, ProviderRegistry};
use output::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ~/.config/node-medic/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON logs on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Directory for rotated JSON log files
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// Bound for the whole run, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Kubeconfig path (default: ~/.kube/config, then in-cluster)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context
    #[arg(long, global = true)]
    context: Option<String>,

    #[command(flatten)]
    contabo: ContaboArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ContaboArgs {
    /// Contabo OAuth client id
    #[arg(long = "contabo-client-id", env = "CONTABO_CLIENT_ID", global = true)]
    client_id: Option<String>,

    /// Contabo OAuth client secret
    #[arg(
        long = "contabo-client-secret",
        env = "CONTABO_CLIENT_SECRET",
        hide_env_values = true,
        global = true
    )]
    client_secret: Option<String>,

    /// Contabo API user
    #[arg(long = "contabo-api-user", env = "CONTABO_API_USER", global = true)]
    api_user: Option<String>,

    /// Contabo API password
    #[arg(
        long = "contabo-api-password",
        env = "CONTABO_API_PASSWORD",
        hide_env_values = true,
        global = true
    )]
    api_password: Option<String>,

    /// Contabo token endpoint [default: https://auth.contabo.com/auth/realms/contabo/protocol/openid-connect/token]
    #[arg(long = "contabo-auth-endpoint", env = "CONTABO_AUTH_ENDPOINT", global = true)]
    auth_endpoint: Option<String>,

    /// Contabo API base URL [default: https://api.contabo.com/v1/]
    #[arg(long = "contabo-api-endpoint", env = "CONTABO_API_ENDPOINT", global = true)]
    api_endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reboot every NotReady node
    #[command(alias = "h")]
    Heal {
        /// Nodes rebooted at the same time
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Reboot a single node
    #[command(alias = "r")]
    Reboot {
        /// Node name
        name: String,
    },
}

impl ContaboArgs {
    fn apply(&self, config: &mut ContaboConfig) {
        let overrides = [
            (&self.client_id, &mut config.client_id),
            (&self.client_secret, &mut config.client_secret),
            (&self.api_user, &mut config.api_user),
            (&self.api_password, &mut config.api_password),
            (&self.auth_endpoint, &mut config.auth_endpoint),
            (&self.api_endpoint, &mut config.api_endpoint),
        ];

        for (flag, value) in overrides {
            if let Some(flag) = flag {
                *value = flag.clone();
            }
        }
    }
}

impl Cli {
    /// Layer command-line flags and environment over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if self.log_json {
            config.log.json_format = true;
        }
        if let Some(dir) = &self.log_file {
            config.log.directory = Some(dir.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
        if let Some(name) = &self.context {
            config.kube_context = Some(name.clone());
        }
        if let Commands::Heal {
            concurrency: Some(n),
            ..
        } = self.command
        {
            config.concurrency = n;
        }
        self.contabo.apply(&mut config.contabo);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let _log_guard = config
        .log
        .init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    debug!(
        timeout_secs = config.timeout_secs,
        concurrency = config.concurrency,
        contabo = ?config.contabo,
        "Loaded configuration"
    );

    let ctx = Context::with_timeout(config.timeout());
    let healer = build_healer(&config)?;

    match cli.command {
        Commands::Heal { output, .. } => {
            commands::heal::handle_heal_command(&healer, &ctx, output).await
        }
        Commands::Reboot { name } => {
            commands::reboot::handle_reboot_command(&healer, &ctx, &name).await
        }
    }
}

fn build_healer(config: &Config) -> Result<Healer> {
    let http = providers::http_client(request_timeout(config))
        .context("failed to build HTTP client")?;

    let registry = ProviderRegistry::from_settings(&config.provider_settings(), http);
    let nodes = KubeNodeSource::new(config.kube_settings());

    Ok(Healer::new(Arc::new(nodes), Arc::new(registry)).with_concurrency(config.concurrency))
}

/// A single request never outlives the run
fn request_timeout(config: &Config) -> Duration {
    providers::DEFAULT_REQUEST_TIMEOUT.min(config.timeout())
}
