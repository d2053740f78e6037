use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use schemaforge::config::Config;
use schemaforge::model::SqlDialect;
use schemaforge::{export, import, server, store};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// Optional YAML config file; environment variables override it.
    #[clap(short, long, global = true)]
    config: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long, default_value = "3000")]
        port: u16,
        #[clap(short, long, default_value = "schemaforge.db")]
        database: String,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Generate DDL or a JSON snapshot for one project.
    Export {
        #[clap(short, long)]
        project: String,
        /// postgresql, mysql, sqlite, or json
        #[clap(short, long, default_value = "postgresql")]
        format: String,
        /// Output file; stdout when omitted.
        #[clap(short, long)]
        output: Option<String>,
    },
    /// Merge a JSON schema export into an existing project.
    Import {
        #[clap(short, long)]
        project: String,
        #[clap(short, long)]
        file: String,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long, default_value = "schemaforge.db")]
        database: String,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long, default_value = "schemaforge.db")]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let config = match &args.config {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::from_env(),
    };

    match args.command {
        Commands::Serve {
            port,
            database,
            cors_origin,
        } => {
            info!("Starting server on port {}", port);
            server::start_server(
                port,
                &database,
                cors_origin.as_deref(),
                config.api.admin_secret.clone(),
            )
            .await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                info!("Initializing database: {}", database);
                server::migrate_database(&database, server::MigrateDirection::Up).await?;
            }
            DbCommands::Migrate {
                direction,
                database,
            } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&database, direction).await?;
            }
        },
        Commands::Export {
            project,
            format,
            output,
        } => {
            let store = store::open_store(&config).await?;
            let schema = store.export_project(&project).await?;
            let content = if format.eq_ignore_ascii_case("json") {
                export::to_json::render(&schema)
                    .map_err(|e| anyhow::anyhow!("serializing schema: {}", e))?
            } else {
                let dialect: SqlDialect = format.parse().map_err(anyhow::Error::msg)?;
                export::generate_sql(&schema, dialect)
            };
            match output {
                Some(path) => {
                    fs::write(&path, content)?;
                    info!("Wrote export to {}", path);
                }
                None => println!("{}", content),
            }
        }
        Commands::Import { project, file } => {
            let text = fs::read_to_string(&file)?;
            let store = store::open_store(&config).await?;
            let report = import::import_into_project(store.as_ref(), &project, &text).await?;
            info!(
                "Imported {} tables, {} columns, {} relationships",
                report.tables_created, report.columns_created, report.relationships_created
            );
            for warning in &report.warnings {
                warn!("{}", warning);
            }
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
