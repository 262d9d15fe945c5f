// src/bin/preflight.rs
//
// Checks configuration and store connectivity, applies the schema and prints
// what it found. Exits non-zero on the first failure.

use game_catalog::infra::logging::init_tracing;
use game_catalog::{Config, PostgresStore, Store};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Requires env vars:\n\
           DATABASE_URL (or POSTGRESQL_URL), JWT_SECRET\n\
         Optional:\n\
           PORT, DATABASE_MAX_CONNECTIONS, STORE_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS,\n\
           TOKEN_TTL_SECS, GAME_TRAFFIC_FREQUENCY, GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ,\n\
           GAME_TRAFFIC_SEED\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    let config = Config::from_env()?;

    println!("> Preflight:");
    println!("  PORT={}", config.port);
    println!("  DATABASE_MAX_CONNECTIONS={}", config.database_max_connections);
    println!("  STORE_TIMEOUT_SECS={}", config.store_timeout.as_secs());
    println!("  REQUEST_TIMEOUT_SECS={}", config.request_timeout.as_secs());
    println!("  TOKEN_TTL_SECS={}", config.token_ttl.as_secs());
    println!("  GAME_TRAFFIC_FREQUENCY={}", config.traffic.period.as_secs());
    println!(
        "  GAME_TRAFFIC_LIMIT_PLAY_TIME_PER_FREQ={}",
        config.traffic.play_time_cap
    );
    match config.traffic.seed {
        Some(seed) => println!("  GAME_TRAFFIC_SEED={}", seed),
        None => println!("  GAME_TRAFFIC_SEED=<entropy>"),
    }

    let store = PostgresStore::connect(&config).await?;
    store.ping().await?;
    println!("  Store reachable.");

    store.ensure_schema().await?;
    for table in ["users", "games", "metadata"] {
        let (rows,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(store.pool())
            .await?;
        println!("  {table}: {rows} rows");
    }

    println!("> Preflight OK.");
    Ok(())
}
