use anyhow::Context;
use clap::{Parser, Subcommand};

mod app;
mod attributes;
mod auth;
mod config;
mod db;
mod error;
mod images;
mod recipes;
mod state;
mod storage;
#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(name = "recipe-catalog")]
#[command(author, version, about = "Recipe catalog API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Create a staff superuser account
    CreateSuperuser {
        /// Login email
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let state = state::AppState::init().await?;
            app::serve(app::build_app(state)).await
        }
        Commands::CreateSuperuser { email, password } => {
            let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
            let store = db::PgStore::connect(&database_url).await?;
            store.migrate().await;
            let user = auth::services::create_superuser(&store, &email, &password)
                .await
                .context("create superuser")?;
            tracing::info!(user_id = %user.id, email = %user.email, "superuser created");
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_catalog=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
