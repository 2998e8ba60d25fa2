mod config;
mod db;
mod errors;
mod pricing;
mod server;
mod state;
mod store;
mod wire;

use crate::state::AppState;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("greeksd starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Init database
    let db_pool = match db::init_db(&cfg.data_dir) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    let (db_tx, db_rx) = mpsc::channel::<store::DbCommand>(1024);

    // Dedicated writer task: the only task that touches the database.
    tokio::spawn(db::run_quote_writer(db_pool, db_rx));

    let store = store::QuoteStore::new(db_tx);
    let app_state = AppState::new(cfg.clone(), store.clone());

    // Boot report: the most recent persisted calculations, one JSON line
    // each. This is the administrative read path; it never runs during
    // request handling.
    if cfg.recent_on_boot > 0 {
        match store.recent(cfg.recent_on_boot).await {
            Ok(rows) if rows.is_empty() => {
                tracing::info!("no recorded calculations yet");
            }
            Ok(rows) => {
                tracing::info!(count = rows.len(), "recent calculations");
                for row in rows {
                    match serde_json::to_string(&row) {
                        Ok(json) => tracing::info!("{json}"),
                        Err(e) => tracing::warn!("recent row serialization failed: {e}"),
                    }
                }
            }
            Err(e) => tracing::warn!("recent calculations query failed: {e}"),
        }
    }

    // Periodic counter report
    let tick_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        interval.tick().await; // the first tick completes immediately
        loop {
            interval.tick().await;
            tick_state.counters.log_snapshot();
        }
    });

    let addr = format!("0.0.0.0:{}", cfg.listen_port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("bind error on {addr}: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("pricing daemon listening on {addr}");

    server::run_listener(listener, app_state).await;
}
