use std::path::PathBuf;

use anyhow::Result;
use ashfree_core::{load_config, CoachEngine};
use ashfree_memory::ProfileStore;
use ashfree_server::state::AppState;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ashfree", version, about = "ashfree quit-smoking coach API")]
struct Cli {
    #[arg(
        long,
        default_value = "config/ashfree.yaml",
        help = "Path to the YAML config file"
    )]
    config: PathBuf,

    #[arg(long, env = "ASHFREE_BIND", help = "Bind address, overrides server.bind")]
    bind: Option<String>,

    #[arg(long, default_value = "logs", help = "Directory for rolling log files")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP API server (default)")]
    Serve,
    #[command(about = "Validate the config file and exit")]
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&cli.log_dir, "ashfree.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("ashfree_server=info,ashfree_core=info,ashfree_memory=info,tower_http=debug")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    let config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Validate => {
            println!("Config OK: {}", cli.config.display());
            Ok(())
        }
        Commands::Serve => {
            let engine = CoachEngine::from_config(&config)?;
            let addr = cli.bind.unwrap_or_else(|| config.server.bind.clone());
            let state =
                AppState::new(engine).with_profiles(ProfileStore::new(&config.users.dir));
            ashfree_server::serve(state, &addr).await
        }
    }
}
