mod config;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use marketplace::{
    Accounts, ExperienceDraft, JwtAuthenticator, ListRequest, Marketplace, resolve_bearer,
};
use policy::Principal;
use serde::Serialize;
use storage::{ExperienceId, SortOrder, SqliteStore};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "outing.toml";

#[derive(Parser)]
#[command(name = "outing")]
#[command(about = "Experience booking marketplace", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TokenArg {
    /// Bearer token from `outing login`
    #[arg(long, env = "OUTING_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user or host account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Either "user" or "host"
        #[arg(long)]
        role: String,
    },
    /// Log in and print a bearer token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an admin account (operators only)
    SeedAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create a draft experience (host or admin)
    Create {
        #[command(flatten)]
        auth: TokenArg,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: String,
        /// Price in minor currency units
        #[arg(long)]
        price: i64,
        /// RFC 3339 start time, e.g. 2026-06-01T10:00:00Z
        #[arg(long)]
        start_time: DateTime<Utc>,
    },
    /// Publish an experience (owner or admin)
    Publish {
        id: i64,
        #[command(flatten)]
        auth: TokenArg,
    },
    /// Block an experience (admin)
    Block {
        id: i64,
        #[command(flatten)]
        auth: TokenArg,
    },
    /// List published experiences
    List {
        #[arg(long)]
        location: Option<String>,
        /// Only experiences starting at or after this RFC 3339 time
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = marketplace::DEFAULT_PAGE_LIMIT)]
        limit: u32,
        /// "asc" or "desc" by start time
        #[arg(long, default_value = "asc")]
        sort: SortOrder,
    },
    /// Book seats on a published experience (user)
    Book {
        id: i64,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        seats: i64,
        #[command(flatten)]
        auth: TokenArg,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        match e {
            Error::Marketplace(err) => {
                let envelope = err.envelope();
                match serde_json::to_string_pretty(&envelope) {
                    Ok(json) => println!("{json}"),
                    Err(_) => eprintln!("Error: {err}"),
                }
            }
            other => eprintln!("Error: {other}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let app = App::open(config)?;

    match cli.command {
        Commands::Signup {
            email,
            password,
            role,
        } => print_json(&app.accounts()?.signup(&email, &password, &role).await?),
        Commands::Login { email, password } => {
            print_json(&app.accounts()?.login(&email, &password).await?)
        }
        Commands::SeedAdmin { email, password } => {
            print_json(&app.accounts()?.seed_admin(&email, &password).await?)
        }
        Commands::Create {
            auth,
            title,
            description,
            location,
            price,
            start_time,
        } => {
            let principal = app.principal(&auth)?;
            let draft = ExperienceDraft {
                title,
                description,
                location,
                price,
                start_time,
            };
            print_json(&app.marketplace.create_experience(&principal, draft).await?)
        }
        Commands::Publish { id, auth } => {
            let principal = app.principal(&auth)?;
            let experience = app
                .marketplace
                .publish_experience(&principal, ExperienceId(id))
                .await?;
            print_json(&experience)
        }
        Commands::Block { id, auth } => {
            let principal = app.principal(&auth)?;
            let experience = app
                .marketplace
                .block_experience(&principal, ExperienceId(id))
                .await?;
            print_json(&experience)
        }
        Commands::List {
            location,
            from,
            page,
            limit,
            sort,
        } => {
            let request = ListRequest {
                location,
                from,
                page,
                limit,
                sort,
            };
            print_json(&app.marketplace.list_experiences(request).await?)
        }
        Commands::Book { id, seats, auth } => {
            let principal = app.principal(&auth)?;
            let booking = app
                .marketplace
                .book(&principal, ExperienceId(id), seats)
                .await?;
            print_json(&booking)
        }
    }
}

/// Everything a command needs, built once per invocation.
struct App {
    config: Config,
    store: Arc<SqliteStore>,
    marketplace: Marketplace,
}

impl App {
    fn open(config: Config) -> Result<Self> {
        let db_path = database_path(&config)?;
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::DataDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let store = Arc::new(SqliteStore::open(&db_path, &config.store_options())?);
        tracing::debug!(path = %db_path.display(), "database ready");

        Ok(Self {
            marketplace: Marketplace::new(store.clone()),
            store,
            config,
        })
    }

    // Only commands that issue or check tokens need the secret.
    fn authenticator(&self) -> Result<JwtAuthenticator> {
        let secret = self.config.jwt_secret()?;
        Ok(JwtAuthenticator::new(secret.as_bytes(), self.config.token_ttl()))
    }

    fn accounts(&self) -> Result<Accounts> {
        Ok(Accounts::new(self.store.clone(), self.authenticator()?))
    }

    fn principal(&self, auth: &TokenArg) -> Result<Principal> {
        let authenticator = self.authenticator()?;
        let header = auth.token.as_ref().map(|t| format!("Bearer {t}"));
        Ok(resolve_bearer(&authenticator, header.as_deref())?)
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default())
    }
}

fn database_path(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.database.path {
        return Ok(path.clone());
    }
    dirs_data_dir()
        .map(|dir| dir.join("outing.db"))
        .ok_or(Error::NoDataDir)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/outing"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("outing"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("outing"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
