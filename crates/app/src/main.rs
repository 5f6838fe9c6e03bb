use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use uuid::Uuid;

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "kosh")]
#[command(about = "Family finance ledger with cross-module payment tracking")]
struct Cli {
    /// Settings file, without extension.
    #[arg(long, env = "KOSH_CONFIG", default_value = "settings")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST server (default).
    Serve,
    /// Import a CSV export into an account.
    Import {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "kosh={level},server={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        return Err("missing [server] settings".into());
    };
    let db = parse_database(&server.database).await?;

    let mut builder = engine::Engine::builder().database(db);
    if let Some(max_attempts) = settings.propagation.max_attempts {
        builder = builder.max_attempts(max_attempts);
    }
    let engine = builder.build().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr: SocketAddr = format!("{}:{}", bind, server.port).parse()?;
            server::run(engine, addr).await;
        }
        Command::Import { account, file } => {
            let reader = std::fs::File::open(&file)?;
            let rows = engine::read_csv_rows(reader)?;
            let summary = engine.import_transactions(account, &rows).await?;
            tracing::info!(
                "{}: imported {}, skipped {}",
                file.display(),
                summary.imported,
                summary.skipped
            );
        }
    }

    Ok(())
}

async fn parse_database(config: &Database) -> Result<sea_orm::DatabaseConnection, BoxError> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
