use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use conclave::{
    app_config::AppConfig,
    auth::create_admin,
    config::create_app,
    state::{make_pool, run_migrations},
};

#[derive(Parser)]
#[clap(about = "Conference feedback collection")]
struct Cli {
    /// Path to a TOML configuration file.
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (the default).
    Serve,
    /// Add an admin account.
    CreateAdmin {
        #[clap(long)]
        username: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .init();

    let pool = make_pool(&config.database_url)
        .with_context(|| format!("could not open {}", config.database_url))?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let listener = tokio::net::TcpListener::bind(&config.bind)
                .await
                .with_context(|| format!("could not bind to {}", config.bind))?;
            tracing::info!("listening on {}", config.bind);
            axum::serve(listener, create_app(pool, config)).await?;
        }
        Command::CreateAdmin {
            username,
            email,
            password,
        } => {
            let mut conn = pool.get()?;
            let id = create_admin(&username, &email, &password, &mut conn)?;
            println!("created admin {username} ({id})");
        }
    }

    Ok(())
}
