use crate::errors::{PricerError, PricerResult};
use crate::pricing::{QuoteRequest, QuoteResult};
use crate::store::DbCommand;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type DbPool = Arc<Mutex<Connection>>;

pub fn init_db(data_dir: &Path) -> PricerResult<DbPool> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| PricerError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("greeksd.db");
    let conn = Connection::open(&db_path)?;

    // foreign_keys is off by default in SQLite; the outputs table relies
    // on ON DELETE CASCADE.
    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
    )?;

    let schema = include_str!("../migrations/001_init.sql");
    conn.execute_batch(schema)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// Dedicated DB writer task. Reads commands from a bounded channel and
/// executes SQL. This is the ONLY task that touches the database
/// connection, which serializes the dedup insert-or-fetch: two sessions
/// submitting the identical tuple cannot interleave, so at most one
/// input row is ever created and both observe the same id.
pub async fn run_quote_writer(db: DbPool, mut rx: mpsc::Receiver<DbCommand>) {
    tracing::info!("quote writer task started");

    while let Some(cmd) = rx.recv().await {
        if let Err(e) = execute_command(&db, cmd) {
            tracing::error!("db write error: {e}");
        }
    }

    tracing::info!("quote writer task shutting down");
}

fn execute_command(db: &DbPool, cmd: DbCommand) -> PricerResult<()> {
    let conn = db
        .lock()
        .map_err(|e| PricerError::Database(format!("lock poisoned: {e}")))?;

    match cmd {
        DbCommand::RecordQuote {
            request,
            quote,
            reply,
        } => {
            let _ = reply.send(record_quote(&conn, &request, &quote));
        }
        DbCommand::RecentQuotes { limit, reply } => {
            let _ = reply.send(recent_quotes(&conn, limit));
        }
    }
    Ok(())
}

/// Persist one computation: dedup-insert the input, upsert the output for
/// its method. Returns the input row's id.
fn record_quote(
    conn: &Connection,
    request: &QuoteRequest,
    quote: &QuoteResult,
) -> PricerResult<String> {
    let input_id = store_input(conn, request)?;
    store_output(conn, &input_id, quote, request.method().as_str())?;
    Ok(input_id)
}

/// Idempotent input insert: an identical 7-tuple resolves to the existing
/// row's id instead of creating a duplicate.
fn store_input(conn: &Connection, request: &QuoteRequest) -> PricerResult<String> {
    if let Some(id) = find_input_id(conn, request)? {
        return Ok(id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO quote_inputs (id, created_at, spot, strike, rate, volatility, maturity, steps, kind)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            id,
            chrono::Utc::now().to_rfc3339(),
            request.spot,
            request.strike,
            request.rate,
            request.volatility,
            request.maturity,
            i64::from(request.steps),
            request.kind.as_str(),
        ],
    )?;
    Ok(id)
}

fn find_input_id(conn: &Connection, request: &QuoteRequest) -> PricerResult<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM quote_inputs
             WHERE spot = ?1 AND strike = ?2 AND rate = ?3 AND volatility = ?4
               AND maturity = ?5 AND steps = ?6 AND kind = ?7",
            rusqlite::params![
                request.spot,
                request.strike,
                request.rate,
                request.volatility,
                request.maturity,
                i64::from(request.steps),
                request.kind.as_str(),
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// At most one output row per (input, method); a repeat computation
/// overwrites the stored values in place.
fn store_output(
    conn: &Connection,
    input_id: &str,
    quote: &QuoteResult,
    method: &str,
) -> PricerResult<()> {
    conn.execute(
        "INSERT INTO quote_outputs (id, input_id, price, delta, vega, method)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (input_id, method)
         DO UPDATE SET price = excluded.price, delta = excluded.delta, vega = excluded.vega",
        rusqlite::params![
            uuid::Uuid::new_v4().to_string(),
            input_id,
            quote.price,
            quote.delta,
            quote.vega,
            method,
        ],
    )?;
    Ok(())
}

/// Administrative read path, newest first. Not on the pricing critical
/// path.
fn recent_quotes(conn: &Connection, limit: usize) -> PricerResult<Vec<QuoteRow>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.created_at, i.spot, i.strike, i.rate, i.volatility, i.maturity,
                i.steps, i.kind, o.price, o.delta, o.vega, o.method
         FROM quote_inputs i
         JOIN quote_outputs o ON o.input_id = i.id
         ORDER BY i.created_at DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(rusqlite::params![limit as i64], |row| {
        Ok(QuoteRow {
            input_id: row.get(0)?,
            created_at: row.get(1)?,
            spot: row.get(2)?,
            strike: row.get(3)?,
            rate: row.get(4)?,
            volatility: row.get(5)?,
            maturity: row.get(6)?,
            steps: row.get(7)?,
            kind: row.get(8)?,
            price: row.get(9)?,
            delta: row.get(10)?,
            vega: row.get(11)?,
            method: row.get(12)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ── Row types ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct QuoteRow {
    pub input_id: String,
    pub created_at: String,
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub volatility: f64,
    pub maturity: f64,
    pub steps: i64,
    pub kind: String,
    pub price: f64,
    pub delta: f64,
    pub vega: f64,
    pub method: String,
}

#[cfg(test)]
pub(crate) fn memory_pool() -> DbPool {
    let conn = Connection::open_in_memory().expect("in-memory db");
    conn.execute_batch("PRAGMA foreign_keys=ON;").expect("pragma");
    conn.execute_batch(include_str!("../migrations/001_init.sql"))
        .expect("schema");
    Arc::new(Mutex::new(conn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::OptionKind;

    fn sample_request() -> QuoteRequest {
        QuoteRequest {
            spot: 100.0,
            strike: 95.0,
            rate: 0.03,
            volatility: 0.25,
            maturity: 0.5,
            kind: OptionKind::Call,
            steps: 0,
        }
    }

    fn sample_quote(price: f64) -> QuoteResult {
        QuoteResult {
            price,
            delta: 0.6,
            vega: 20.0,
        }
    }

    fn input_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM quote_inputs", [], |r| r.get(0))
            .unwrap()
    }

    fn output_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM quote_outputs", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_store_input_dedups_identical_tuple() {
        let pool = memory_pool();
        let conn = pool.lock().unwrap();
        let first = store_input(&conn, &sample_request()).unwrap();
        let second = store_input(&conn, &sample_request()).unwrap();
        assert_eq!(first, second);
        assert_eq!(input_count(&conn), 1);
    }

    #[test]
    fn test_store_input_distinct_tuples_distinct_rows() {
        let pool = memory_pool();
        let conn = pool.lock().unwrap();
        let first = store_input(&conn, &sample_request()).unwrap();
        let second = store_input(
            &conn,
            &QuoteRequest {
                steps: 200,
                ..sample_request()
            },
        )
        .unwrap();
        assert_ne!(first, second);
        assert_eq!(input_count(&conn), 2);
    }

    #[test]
    fn test_store_output_overwrites_per_method() {
        let pool = memory_pool();
        let conn = pool.lock().unwrap();
        let id = store_input(&conn, &sample_request()).unwrap();
        store_output(&conn, &id, &sample_quote(9.0), "binomial").unwrap();
        store_output(&conn, &id, &sample_quote(11.5), "binomial").unwrap();
        assert_eq!(output_count(&conn), 1);

        let stored: f64 = conn
            .query_row(
                "SELECT price FROM quote_outputs WHERE input_id = ?1 AND method = 'binomial'",
                rusqlite::params![id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(stored, 11.5);
    }

    #[test]
    fn test_both_methods_coexist_for_one_input() {
        let pool = memory_pool();
        let conn = pool.lock().unwrap();
        let id = store_input(&conn, &sample_request()).unwrap();
        store_output(&conn, &id, &sample_quote(9.0), "black_scholes").unwrap();
        store_output(&conn, &id, &sample_quote(9.1), "binomial").unwrap();
        assert_eq!(output_count(&conn), 2);
    }

    #[test]
    fn test_deleting_input_cascades_to_outputs() {
        let pool = memory_pool();
        let conn = pool.lock().unwrap();
        let id = record_quote(&conn, &sample_request(), &sample_quote(9.0)).unwrap();
        assert_eq!(output_count(&conn), 1);

        conn.execute("DELETE FROM quote_inputs WHERE id = ?1", rusqlite::params![id])
            .unwrap();
        assert_eq!(output_count(&conn), 0);
    }

    #[test]
    fn test_recent_quotes_newest_first() {
        let pool = memory_pool();
        let conn = pool.lock().unwrap();
        for (id, created_at, spot) in [
            ("a", "2026-01-01T00:00:00+00:00", 90.0),
            ("b", "2026-01-02T00:00:00+00:00", 91.0),
            ("c", "2026-01-03T00:00:00+00:00", 92.0),
        ] {
            conn.execute(
                "INSERT INTO quote_inputs (id, created_at, spot, strike, rate, volatility, maturity, steps, kind)
                 VALUES (?1, ?2, ?3, 100.0, 0.05, 0.2, 1.0, 0, 'call')",
                rusqlite::params![id, created_at, spot],
            )
            .unwrap();
            store_output(&conn, id, &sample_quote(spot), "black_scholes").unwrap();
        }

        let rows = recent_quotes(&conn, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].input_id, "c");
        assert_eq!(rows[1].input_id, "b");
    }
}
