mod cli;
mod commands;
mod output;

use clap::Parser;
use ftpacct::{AccountStore, StoreConfig};
use tracing_subscriber::{
    EnvFilter,
    filter::{Directive, LevelFilter},
};

use cli::{Cli, Commands};
use output::OutputFormat;

fn main() {
    // Logs go to stderr so --json output stays parseable
    let directive: Directive = "ftpacct=info"
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let filter = EnvFilter::from_default_env().add_directive(directive);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::from_flag(cli.json);

    let mut config = StoreConfig::default();
    if let Some(max) = cli.max_ip_masks {
        config = config.with_max_ip_masks(max);
    }
    let store = AccountStore::open_dir_with(&cli.data_dir, config)?;
    if let Some(reason) = store.degraded_reason() {
        tracing::warn!("Store is read-only: {reason}");
    }

    match cli.command {
        Commands::User(cmd) => commands::user::run(&store, cmd, format),
        Commands::Mask(cmd) => commands::mask::run(&store, cmd, format),
        Commands::Group(cmd) => commands::group::run(&store, cmd, format),
        Commands::Credits(cmd) => commands::credits::run(&store, cmd, format),
        Commands::Info => commands::info::run(&store, format),
    }
}
