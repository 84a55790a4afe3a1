mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use todosheets::config::{default_config_path, Config};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    // RUST_LOG overrides, e.g. RUST_LOG=todosheets=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let token = cli
        .token
        .or_else(|| std::env::var("TODOSHEETS_TOKEN").ok());

    match cli.command {
        Commands::Weather { location } => commands::weather(&config, &location.join(" ")).await,
        command => run_list_command(command, config, token).await,
    }
}

/// Commands that work on the signed-in session
async fn run_list_command(command: Commands, config: Config, token: Option<String>) -> Result<()> {
    let mut ctx = commands::Context::open(config, token)?;

    let result = match command {
        Commands::Login => commands::login(&mut ctx).await,
        Commands::Sheets => commands::sheets(&mut ctx).await,
        Commands::Select { id } => commands::select(&mut ctx, &id).await,
        Commands::Create { title } => commands::create(&mut ctx, title.as_deref()).await,
        Commands::ChangeSheet => commands::change_sheet(&mut ctx).await,
        Commands::List => commands::list(&mut ctx).await,
        Commands::Add { text } => commands::add(&mut ctx, &text.join(" ")).await,
        Commands::Edit { id, text } => commands::edit(&mut ctx, id, &text.join(" ")).await,
        Commands::Done { id } => commands::done(&mut ctx, id).await,
        Commands::Status => commands::status(&ctx),
        Commands::Weather { .. } => unreachable!("weather does not use the session"),
    };

    // Persist whatever the command left behind, even when it failed
    ctx.close()?;

    result
}
