// ABOUTME: Entry point for the flashstore binary.
// ABOUTME: Opens the store with the admin-configuration bootstrap and reports the seeded state.

use std::path::PathBuf;

use clap::Parser;
use flashstore_store::{Bootstrap, ColumnMigration, Seed, Store, StoreConfig};
use serde_json::json;

#[derive(Parser)]
#[command(name = "flashstore", about = "Durable snapshot-backed store for admin configuration")]
struct Args {
    /// Path of the backing snapshot file
    #[arg(long, env = "FLASHSTORE_DB_PATH", default_value = "data/flashstore.db")]
    db_path: PathBuf,
}

/// The admin-configuration schema: system flags and photo print specs.
fn admin_bootstrap() -> Bootstrap {
    let mut bootstrap = Bootstrap::new()
        .table(
            "CREATE TABLE IF NOT EXISTS system_config (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                config_key TEXT UNIQUE NOT NULL,
                config_value TEXT NOT NULL,
                config_type TEXT DEFAULT 'string',
                description TEXT
            )",
        )
        .table(
            "CREATE TABLE IF NOT EXISTS photo_specs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                spec_key TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                sort_order INTEGER DEFAULT 0
            )",
        )
        // Columns added after first release, backfilled on upgrade
        .migration(ColumnMigration::new("photo_specs", "name_en", "TEXT"))
        .migration(ColumnMigration::new("photo_specs", "ratio", "REAL"));

    let flags = [
        ("review_mode", "false", "boolean", "Review mode switch"),
        ("maintenance_mode", "false", "boolean", "Maintenance mode switch"),
        ("announcement_enabled", "false", "boolean", "Announcement switch"),
        ("announcement_text", "", "string", "Announcement body"),
        ("config_version", "1.0.0", "string", "Configuration version"),
    ];
    for (key, value, kind, description) in flags {
        bootstrap = bootstrap.seed(Seed::new(
            "system_config",
            "config_key",
            json!(key),
            "INSERT INTO system_config (config_key, config_value, config_type, description)
             VALUES (?1, ?2, ?3, ?4)",
            vec![json!(key), json!(value), json!(kind), json!(description)],
        ));
    }

    let specs = [
        ("1inch", "1 Inch", 295, 413, 0),
        ("2inch", "2 Inch", 413, 579, 1),
        ("small1inch", "Small 1 Inch", 260, 378, 2),
        ("big1inch", "Big 1 Inch", 390, 567, 3),
    ];
    for (key, name, width, height, sort) in specs {
        bootstrap = bootstrap.seed(Seed::new(
            "photo_specs",
            "spec_key",
            json!(key),
            "INSERT INTO photo_specs (spec_key, name, width, height, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![json!(key), json!(name), json!(width), json!(height), json!(sort)],
        ));
    }

    bootstrap
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flashstore=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    tracing::info!(path = %args.db_path.display(), "flashstore starting up");

    let store = Store::open(StoreConfig::new(&args.db_path), admin_bootstrap()).await?;

    let configs = store
        .query_all(
            "SELECT config_key, config_value FROM system_config ORDER BY config_key",
            vec![],
        )
        .await?;
    for row in &configs {
        tracing::info!(key = %row["config_key"], value = %row["config_value"], "system config");
    }

    let specs = store
        .query_all(
            "SELECT spec_key, name, width, height FROM photo_specs ORDER BY sort_order",
            vec![],
        )
        .await?;
    for row in &specs {
        tracing::info!(
            spec = %row["spec_key"],
            name = %row["name"],
            width = %row["width"],
            height = %row["height"],
            "photo spec"
        );
    }

    tracing::info!(configs = configs.len(), specs = specs.len(), "store ready");
    Ok(())
}
