use std::path::PathBuf;

use anyhow::Context;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookstore", version, about = "Run and administer the bookstore service")]
struct Cli {
    /// Directory holding base.toml and {env}.toml
    #[arg(long, global = true, env = "BOOKSTORE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Deployment environment: local, staging or production
    #[arg(long = "env", global = true, env = "BOOKSTORE_ENV", default_value = "local")]
    environment: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API until Ctrl-C
    Serve,
    /// Create missing tables and exit
    Migrate,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        Settings::load_from(&config_dir, &self.environment)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = cli
        .settings()
        .with_context(|| "failed to load bookstore settings")?;

    bookstore_telemetry::init(&settings.telemetry).ok();

    tracing::info!(env = ?settings.environment, command = ?cli.command, "bookstore CLI starting");

    match cli.command {
        Command::Serve => bookstore_app::bootstrap::serve(settings).await,
        Command::Migrate => {
            let applied = bookstore_app::bootstrap::migrate(&settings).await?;
            println!("applied {} schema script(s) to {}", applied, settings.database.url);
            Ok(())
        }
    }
}
