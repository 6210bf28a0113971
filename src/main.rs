use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use facedeck_lib::config::ServerConfig;
use facedeck_lib::flashcards::{parse_filename, FlashcardStorage};
use facedeck_lib::server::{self, AppState};

#[derive(Parser)]
#[command(name = "facedeck", about = "Team photo flashcards server", version)]
struct Cli {
    /// Config file (default: <config dir>/facedeck/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the database and uploaded photos
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
        /// Built frontend to serve at /
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show the name and role each photo filename would produce
    ParseName {
        /// Filenames, e.g. "Jane_Smith_Marketing_Manager.png"
        #[arg(required = true)]
        filenames: Vec<String>,
    },

    /// Create the database schema and exit
    InitDb,
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = ServerConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

fn parse_names(filenames: &[String]) -> bool {
    let mut all_ok = true;
    for filename in filenames {
        match parse_filename(filename) {
            Ok(parsed) => {
                println!("File: {}", filename);
                println!("  → Name: {}", parsed.person_name);
                println!("  → Role: {}", parsed.person_role);
            }
            Err(e) => {
                eprintln!("File: {}", filename);
                eprintln!("  → Error: {}", e);
                all_ok = false;
            }
        }
    }
    all_ok
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        None => {
            let config = load_config(&cli)?;
            run_server(config).await?;
        }
        Some(Command::Serve { bind, static_dir }) => {
            let mut config = load_config(&cli)?;
            if let Some(bind) = bind {
                config.bind_address = bind.clone();
            }
            if let Some(static_dir) = static_dir {
                config.static_dir = Some(static_dir.clone());
            }
            run_server(config).await?;
        }
        Some(Command::ParseName { filenames }) => {
            if !parse_names(filenames) {
                std::process::exit(1);
            }
        }
        Some(Command::InitDb) => {
            let config = load_config(&cli)?;
            let db_path = config.db_path();
            FlashcardStorage::open(&db_path)
                .with_context(|| format!("Failed to initialize database at {:?}", db_path))?;
            println!("Initialized {}", db_path.display());
        }
    }

    Ok(())
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let bind_address = config.bind_address.clone();
    let state = AppState::open(config).context("Failed to initialize server state")?;

    server::serve(Arc::new(state), shutdown_signal())
        .await
        .with_context(|| format!("Server on {} failed", bind_address))
}
