mod commands;

use std::collections::HashMap;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genrepo::RepositoryConfig;

/// genrepo - Query and update key-value tables with client-side filters
#[derive(Parser, Debug)]
#[command(name = "genrepo")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: commands::Command,
}

/// Table and connection settings. Each falls back to its environment variable.
#[derive(Debug, Clone, clap::Args)]
struct Global {
    /// Table name [env: GENREPO_TABLE_NAME]
    #[arg(long, global = true)]
    table: Option<String>,

    /// Partition key attribute [env: GENREPO_PRIMARY_KEY, default: id]
    #[arg(long, global = true)]
    primary_key: Option<String>,

    /// Sort key attribute, for composite-key tables [env: GENREPO_SORT_KEY]
    #[arg(long, global = true)]
    sort_key: Option<String>,

    /// Days until saved items expire [env: GENREPO_EXPIRATION_DAYS]
    #[arg(long, global = true)]
    expiration_days: Option<u32>,

    /// Skip all writes [env: GENREPO_DEBUG_MODE]
    #[arg(long, global = true)]
    debug_mode: bool,

    /// AWS region [env: AWS_REGION, default: us-east-1]
    #[arg(long, global = true)]
    region: Option<String>,

    /// Custom endpoint URL, for local DynamoDB [env: AWS_ENDPOINT_URL]
    #[arg(long, global = true)]
    endpoint_url: Option<String>,
}

impl Global {
    /// Repository configuration, preferring flags over environment variables.
    fn config(&self) -> Result<RepositoryConfig> {
        let mut overrides: HashMap<&str, String> = HashMap::new();
        let flags = [
            ("GENREPO_TABLE_NAME", self.table.clone()),
            ("GENREPO_PRIMARY_KEY", self.primary_key.clone()),
            ("GENREPO_SORT_KEY", self.sort_key.clone()),
            (
                "GENREPO_EXPIRATION_DAYS",
                self.expiration_days.map(|d| d.to_string()),
            ),
            ("GENREPO_DEBUG_MODE", self.debug_mode.then(|| "true".to_string())),
            ("AWS_REGION", self.region.clone()),
            ("AWS_ENDPOINT_URL", self.endpoint_url.clone()),
        ];
        for (name, value) in flags {
            if let Some(value) = value {
                overrides.insert(name, value);
            }
        }

        let config = RepositoryConfig::from_lookup(|name| {
            overrides
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
        })?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genrepo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        commands::Command::Filter(args) => commands::run_filter(args),
        command => {
            let config = cli.global.config()?;
            tracing::debug!(
                table = %config.table_name,
                target = %config.target_display(),
                "Connecting"
            );
            commands::run(command, &config).await
        }
    }
}
