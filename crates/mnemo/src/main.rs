mod app;
mod cli;
mod commands;

use app::App;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize tracing on stderr; stdout carries the context
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let app = App::from_cli(&cli)?;

    match cli.command {
        Commands::Init => commands::init::run(&app),
        Commands::Process {
            thread,
            file,
            extras,
        } => commands::process::run(&app, &thread, file.as_deref(), extras),
        Commands::Context { thread } => commands::context::run(&app, &thread),
        Commands::Stats { thread } => commands::stats::run(&app, &thread),
        Commands::Reflect { thread } => commands::reflect::run(&app, &thread),
        Commands::Threads => commands::threads::run(&app),
        Commands::Clear { thread } => commands::clear::run(&app, &thread),
        Commands::History { stats, thread } => {
            commands::history::run(&app, stats, thread.as_deref())
        }
        Commands::Backup { action } => commands::backup::run(&app, action),
        Commands::Version => commands::version::run(),
    }
}
