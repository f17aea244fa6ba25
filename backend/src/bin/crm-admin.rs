use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crm_backend::admin::{self, SeedOutcome};
use crm_backend::config::AppConfig;
use crm_backend::db::connect;
use crm_backend::legacy::error_text;
use crm_backend::legacy::schema::load_people_table;
use crm_backend::logging::init_logging;

#[derive(Parser)]
#[command(name = "crm-admin", about = "Maintenance commands for the CRM database")]
struct Args {
    #[arg(long, env = "CRM_CONFIG", default_value = "config.toml", help = "Config file path")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tables of the legacy schema and check the legacy tables exist
    Tables,
    /// Count rows of the people table
    Count,
    /// Print the first rows of the people table
    Dump {
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Insert demo clients when the people table is empty
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    init_logging(&config.logging.level, &config.logging.format)?;
    let db = connect(&config.database).await?;

    match args.command {
        Command::Tables => {
            let tables = admin::list_tables(&db, &config.legacy.schema).await?;
            println!("Tables in schema {}:", config.legacy.schema);
            for table in &tables {
                println!("  {}", table);
            }
            for (name, present) in admin::legacy_presence(&config.legacy, &tables) {
                println!("{} {}", name, if present { "present" } else { "MISSING" });
            }
        }
        Command::Count => {
            let people = load_people_table(&db, &config.legacy).await?;
            let count = admin::count_people(&db, &people).await?;
            println!("{}: {} rows", people.name, count);
        }
        Command::Dump { limit } => {
            let people = load_people_table(&db, &config.legacy).await?;
            for row in admin::sample_people(&db, &people, limit).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    row.id,
                    row.fio.unwrap_or_default(),
                    row.phone,
                    row.email.unwrap_or_default()
                );
            }
        }
        Command::Seed => {
            let people = load_people_table(&db, &config.legacy).await?;
            match admin::seed_samples(&db, &people).await {
                Ok(SeedOutcome::Seeded(n)) => {
                    log::info!("Seeded {} with {} demo clients", people.name, n);
                    for row in admin::sample_people(&db, &people, n as u64).await? {
                        println!("{}\t{}\t{}", row.id, row.fio.unwrap_or_default(), row.phone);
                    }
                }
                Ok(SeedOutcome::AlreadyPopulated(count)) => {
                    println!("{} already has {} rows, nothing inserted", people.name, count);
                }
                Err(e) => anyhow::bail!("seeding {} failed: {}", people.name, error_text(&e)),
            }
        }
    }
    Ok(())
}
