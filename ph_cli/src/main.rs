mod app;
mod cli;
mod commands;
mod error_fmt;
mod logging;

use clap::Parser;

use crate::app::{App, load_config};
use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        tracing::error!(error = %e, "command failed");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli)?;
    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(store = %cfg.store.dir, user = %cfg.store.user, "configuration loaded");

    let app = App::new(cfg, cli.json);
    match &cli.cmd {
        Commands::Monitor {
            ticks,
            interval_ms,
            crop,
            seed,
        } => commands::monitor(&app, *ticks, *interval_ms, crop.as_deref(), *seed),
        Commands::Status { crop } => commands::status(&app, crop.as_deref()),
        Commands::Stats => commands::stats(&app),
        Commands::Series { zoom, all } => commands::series(&app, *zoom, *all),
        Commands::Log {
            range,
            doses,
            limit,
        } => commands::log(&app, range, *doses, *limit),
        Commands::Crops => commands::crops(&app),
        Commands::Clear { yes } => commands::clear(&app, *yes),
        Commands::Health => commands::health(&app),
    }
}
