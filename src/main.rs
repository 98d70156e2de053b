mod config;
mod database;
mod entities;
mod error;
mod http_server;
mod logging;
mod ollama;
mod ports;
mod repository;
mod services;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use sea_orm::{ColumnTrait, Condition};

use crate::{
    config::Config,
    database::Database,
    entities::application_user,
    http_server::state::{AppState, Ports},
    ollama::release_query::OllamaQueryTranslator,
    services::{
        auth::{
            AdminService, TokenService, google::GoogleTokenInfoAdapter, normalize_email,
            token::DEFAULT_TOKEN_LIFETIME_DAYS,
        },
        discogs::{DiscogsImportService, client::DiscogsHttpAdapter},
        images::ImageStore,
    },
};

const SERVICE_NAME: &str = "music-catalog";
const DEVELOPMENT_JWT_SECRET: &str = "development-only-secret-change-me";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "MUSIC_CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// Tracing filter directive, e.g. `info` or `music_catalog=debug`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// The port to run the server on
        #[arg(short, long, default_value = "5000", env = "MUSIC_CATALOG_HTTP_PORT")]
        port: u16,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Import a Discogs collection for an existing user
    ImportDiscogs {
        /// Email of the user that will own the imported releases
        #[arg(short, long)]
        email: String,

        /// The Discogs username whose collection is imported
        #[arg(short, long)]
        username: String,
    },
    /// Invite an email address to sign in
    Invite {
        #[arg(short, long)]
        email: String,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

/// A missing secret is only tolerated outside production.
fn resolve_jwt_secret(config: &Config) -> Result<String> {
    match &config.jwt_secret {
        Some(secret) if !secret.trim().is_empty() => Ok(secret.clone()),
        _ if config.is_development() => {
            tracing::warn!("No JWT secret configured, using the development secret");
            Ok(DEVELOPMENT_JWT_SECRET.to_string())
        }
        _ => Err(eyre!(
            "A JWT secret is required. Set jwt_secret in the config file or JWT_SECRET"
        )),
    }
}

async fn open_database(config: &Config) -> Result<Arc<Database>> {
    let database = Database::open(&config.database_url()).await?;
    database.migrate().await?;
    Ok(Arc::new(database))
}

async fn run(args: Args, config: Config) -> Result<()> {
    match args.command {
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                tracing::info!("Default config available at {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
        Commands::Migrate => {
            open_database(&config).await?;
            tracing::info!("Database is up to date");
        }
        Commands::Invite { email } => {
            let database = open_database(&config).await?;
            let images = Arc::new(ImageStore::new(config.images_path()));
            let invitation = AdminService::new(database, images)
                .create_invitation(&email)
                .await?;
            tracing::info!("Invited {}", invitation.email);
        }
        Commands::ImportDiscogs { email, username } => {
            let database = open_database(&config).await?;
            let user = database
                .unit_of_work()
                .repository::<application_user::Entity>()
                .first(
                    Some(
                        Condition::all()
                            .add(application_user::Column::Email.eq(normalize_email(&email))),
                    ),
                    &[],
                )
                .await?
                .ok_or_else(|| eyre!("No user with email {email}"))?;

            let images = Arc::new(ImageStore::new(config.images_path()));
            let client = Arc::new(DiscogsHttpAdapter::new(config.discogs_token.clone())?);
            let summary = DiscogsImportService::new(database, images, client)
                .import_collection(user.id, &username)
                .await?;
            tracing::info!(
                "Imported {} of {} releases ({} skipped, {} failed)",
                summary.imported,
                summary.total,
                summary.skipped,
                summary.failed
            );
            for failure in &summary.errors {
                tracing::warn!(
                    "Release {} ({}) failed: {}",
                    failure.discogs_id,
                    failure.title.as_deref().unwrap_or("unknown title"),
                    failure.error
                );
            }
        }
        Commands::Serve { port } => {
            let secret = resolve_jwt_secret(&config)?;
            let database = open_database(&config).await?;
            let ports = Ports {
                google: Arc::new(GoogleTokenInfoAdapter::new(config.google_client_id.clone())),
                discogs: Arc::new(DiscogsHttpAdapter::new(config.discogs_token.clone())?),
                query_translator: Arc::new(OllamaQueryTranslator::new(
                    &config.ollama_url,
                    &config.ollama_model,
                )),
            };
            let tokens = TokenService::new(&secret, DEFAULT_TOKEN_LIFETIME_DAYS);
            let state = Arc::new(AppState::new(database, config, tokens, ports));

            tracing::info!("Starting HTTP server on port: {port}");
            http_server::app::start(port, state).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())
        .wrap_err("Failed to load music-catalog config")?;

    let tracer_provider = logging::init_tracing(
        SERVICE_NAME,
        config.otlp_endpoint.as_deref(),
        &args.log_level,
        config.is_development(),
    )?;
    tracing::debug!("Music catalog starting");

    let result = run(args, config).await;

    if let Some(provider) = tracer_provider
        && let Err(err) = provider.shutdown()
    {
        eprintln!("Failed to shut down tracer provider: {err}");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_secret_required_outside_development() {
        let mut config = Config::default();
        assert!(resolve_jwt_secret(&config).is_err());

        config.environment = "Development".to_string();
        assert_eq!(resolve_jwt_secret(&config).unwrap(), DEVELOPMENT_JWT_SECRET);

        config.jwt_secret = Some("s3cret".to_string());
        assert_eq!(resolve_jwt_secret(&config).unwrap(), "s3cret");
    }

    #[test]
    fn test_cli_parses_import_command() {
        let args = Args::try_parse_from([
            "music-catalog",
            "import-discogs",
            "--email",
            "me@example.com",
            "--username",
            "digger",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Commands::ImportDiscogs { ref username, .. } if username == "digger"
        ));
    }
}
