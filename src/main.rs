use clap::{Parser, Subcommand};
use ragbot::config::{Config, show_config};
use ragbot::server::serve;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragbot")]
#[command(about = "A document question-answering service backed by a vector index")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "ragbot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            serve(config).await?;
        }
        Commands::Config => {
            show_config(&config);
        }
    }

    Ok(())
}
