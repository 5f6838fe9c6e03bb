use sea_orm::Database;
use sea_orm_migration::prelude::*;

use migration::Migrator;

const USAGE: &str = "usage: migration [up [N]|down [N]|fresh|refresh|status]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let steps = match args.get(1) {
        Some(n) => Some(n.parse::<u32>().map_err(|_| USAGE)?),
        None => None,
    };

    let url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./kosh.db?mode=rwc".to_string());
    let db = Database::connect(&url).await?;

    match args.first().map(String::as_str).unwrap_or("up") {
        "up" => Migrator::up(&db, steps).await?,
        "down" => Migrator::down(&db, steps.or(Some(1))).await?,
        "fresh" => Migrator::fresh(&db).await?,
        "refresh" => Migrator::refresh(&db).await?,
        "status" => Migrator::status(&db).await?,
        _ => return Err(USAGE.into()),
    }

    Ok(())
}
