use anyhow::Result;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::fs;
use std::path::Path;

#[macro_use]
mod macros;

pub mod ledger;
mod models;
mod repositories;
pub mod services;
pub mod settings;
pub mod webhook;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log4rs)?;

    let config = settings::Settings::new(&args.config)?;
    log::info!("Starting cashback ledger.");

    let conn = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.url)
        .await?;

    log::info!("Running database migrations.");
    sqlx::migrate!("./migrations").run(&conn).await?;

    services::start_services(conn, config).await
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => {
            println!("[*] Logging initialized successfully.");
            Ok(())
        }
        Err(e) => {
            println!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
