mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};
use audiox_core::config::Config;
use audiox_core::logging::Verbosity;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let verbose = match &cli.command {
        Some(Commands::Convert { options, .. }) => options.verbose,
        Some(Commands::Info { verbose, .. }) => *verbose,
        _ => false,
    };

    // Initialize logging based on verbosity
    let filter = if verbose || config.verbose == Verbosity::Flag(true) {
        "audiox=debug,audiox_core=debug"
    } else {
        "audiox=info,audiox_core=info"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Some(Commands::Convert {
            input,
            output,
            options,
        }) => commands::convert::run(&input, output.as_deref(), &options, &config).await,
        Some(Commands::Info {
            input,
            metadata,
            json,
            verbose,
        }) => commands::info::run(&input, metadata, verbose, json, &config).await,
        Some(Commands::Version) => commands::version::run(),
        Some(Commands::Completion) => commands::completion::run(),
        Some(Commands::Config) => commands::config::run(&config, cli.config.as_deref()),
        Some(Commands::Doctor) => commands::doctor::run(&config).await,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
