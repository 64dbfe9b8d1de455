mod cli;

use clap::{Parser, Subcommand};
use cli::handlers;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "collect-data")]
#[command(version)]
#[command(about = "Collect Data runner plugin: fetches flow and payload data for an execution")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to configuration file (default: ~/.config/collect-data/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides COLLECT_DATA_BACKEND_URL and the config file
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Backend API key, overrides COLLECT_DATA_API_KEY and the config file
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Handshake magic cookie, overrides COLLECT_DATA_MAGIC_COOKIE and the config file
    #[arg(long, global = true)]
    magic_cookie: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve runner requests on stdin/stdout (default)
    Serve,

    /// Print the plugin descriptor as JSON
    Details {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Write the effective configuration to the configuration file
    Config {
        /// Start configuration setup
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => handlers::handle_serve(&cli.global).await,
        Commands::Details { pretty } => handlers::handle_details(pretty).map(|_| handlers::EXIT_OK),
        Commands::Config { init } => {
            if init {
                handlers::handle_config_init(&cli.global).map(|_| handlers::EXIT_OK)
            } else {
                eprintln!("Config command requires --init flag");
                eprintln!("Usage: collect-data config --init [--config PATH]");
                Ok(handlers::EXIT_FAILURE)
            }
        }
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            handlers::EXIT_FAILURE
        }
    };

    // Stdin is read on a blocking thread that would otherwise hold up runtime shutdown
    std::process::exit(code);
}
