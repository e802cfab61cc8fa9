use crate::config::RunMode;
use crate::errors::{SimError, SimResult};
use crate::state::{LedgerRow, RunConfig, RunResult};
use rusqlite::Connection;
use std::path::Path;

pub fn init_db(data_dir: &Path) -> SimResult<Connection> {
    std::fs::create_dir_all(data_dir).map_err(|e| SimError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("delta_replica.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    migrate(&conn)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> SimResult<()> {
    let schema = include_str!("../migrations/001_init.sql");
    conn.execute_batch(schema)?;
    Ok(())
}

/// Register a run and return its id.
pub fn insert_run(
    conn: &Connection,
    mode: RunMode,
    seed: Option<u64>,
    config: &RunConfig,
) -> SimResult<String> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().to_rfc3339();
    let parameters = serde_json::to_string(config)?;
    // SQLite integers are signed; seeds above i64::MAX keep their bit pattern
    let seed = seed.map(|s| s as i64);
    conn.execute(
        "INSERT INTO runs (id, created_at, mode, seed, parameters) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, created_at, mode.to_string(), seed, parameters],
    )?;
    Ok(id)
}

/// Store a full ledger in one transaction.
pub fn write_ledger(conn: &mut Connection, run_id: &str, rows: &[LedgerRow]) -> SimResult<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO ledger_rows (run_id, step, timepoint, replica_quantity, asset_price, replica_cash, replica_mv, call_delta, call_price, benchmark_quantity, benchmark_cash, benchmark_mv)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        for (step, r) in rows.iter().enumerate() {
            stmt.execute(rusqlite::params![
                run_id,
                step as i64,
                r.timepoint,
                r.replica_quantity,
                r.asset_price,
                r.replica_cash,
                r.replica_mv,
                r.call_delta,
                r.call_price,
                r.benchmark_quantity,
                r.benchmark_cash,
                r.benchmark_mv,
            ])?;
        }
    }
    tx.commit()?;
    tracing::debug!(run_id, rows = rows.len(), "ledger stored");
    Ok(())
}

/// Store one batch of trial results in one transaction.
pub fn write_results(
    conn: &mut Connection,
    run_id: &str,
    rebalances_per_day: u32,
    results: &[RunResult],
) -> SimResult<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO run_results (run_id, rebalances_per_day, trial, replicating_mv, benchmark_mv, absolute_diff, relative_diff)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (trial, r) in results.iter().enumerate() {
            stmt.execute(rusqlite::params![
                run_id,
                rebalances_per_day,
                trial as i64,
                r.replicating_mv,
                r.benchmark_mv,
                r.absolute_diff,
                r.relative_diff,
            ])?;
        }
    }
    tx.commit()?;
    tracing::debug!(run_id, rebalances_per_day, trials = results.len(), "results stored");
    Ok(())
}

// ── Query helpers ──

pub fn load_ledger(conn: &Connection, run_id: &str) -> SimResult<Vec<LedgerRow>> {
    let mut stmt = conn.prepare(
        "SELECT timepoint, replica_quantity, asset_price, replica_cash, replica_mv, call_delta, call_price, benchmark_quantity, benchmark_cash, benchmark_mv
         FROM ledger_rows WHERE run_id = ?1 ORDER BY step",
    )?;
    let rows = stmt.query_map(rusqlite::params![run_id], |row| {
        Ok(LedgerRow {
            timepoint: row.get(0)?,
            replica_quantity: row.get(1)?,
            asset_price: row.get(2)?,
            replica_cash: row.get(3)?,
            replica_mv: row.get(4)?,
            call_delta: row.get(5)?,
            call_price: row.get(6)?,
            benchmark_quantity: row.get(7)?,
            benchmark_cash: row.get(8)?,
            benchmark_mv: row.get(9)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn load_results(
    conn: &Connection,
    run_id: &str,
    rebalances_per_day: u32,
) -> SimResult<Vec<RunResult>> {
    let mut stmt = conn.prepare(
        "SELECT replicating_mv, benchmark_mv, absolute_diff, relative_diff
         FROM run_results WHERE run_id = ?1 AND rebalances_per_day = ?2 ORDER BY trial",
    )?;
    let rows = stmt.query_map(rusqlite::params![run_id, rebalances_per_day], |row| {
        Ok(RunResult {
            replicating_mv: row.get(0)?,
            benchmark_mv: row.get(1)?,
            absolute_diff: row.get(2)?,
            relative_diff: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{run_many, HedgeSimulator};

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn short_config() -> RunConfig {
        RunConfig {
            maturity_days: 10.0,
            rebalances_per_day: 2,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_ledger_persisted_in_order() {
        let mut conn = memory_db();
        let cfg = short_config();
        let mut sim = HedgeSimulator::new(&cfg, Some(6)).unwrap();
        sim.simulate();

        let id = insert_run(&conn, RunMode::Single, Some(6), &cfg).unwrap();
        write_ledger(&mut conn, &id, sim.export()).unwrap();

        let loaded = load_ledger(&conn, &id).unwrap();
        assert_eq!(loaded.len(), 21);
        assert_eq!(loaded.as_slice(), sim.export());
    }

    #[test]
    fn test_results_persisted_per_frequency() {
        let mut conn = memory_db();
        let cfg = short_config();
        let results = run_many(&cfg, 7, Some(2)).unwrap();

        let id = insert_run(&conn, RunMode::Batch, Some(2), &cfg).unwrap();
        write_results(&mut conn, &id, cfg.rebalances_per_day, &results).unwrap();

        assert_eq!(load_results(&conn, &id, 2).unwrap(), results);
        assert!(load_results(&conn, &id, 1).unwrap().is_empty());
    }

    #[test]
    fn test_run_parameters_stored_as_json() {
        let conn = memory_db();
        let cfg = short_config();
        let id = insert_run(&conn, RunMode::Sweep, None, &cfg).unwrap();

        let (mode, seed, params): (String, Option<i64>, String) = conn
            .query_row(
                "SELECT mode, seed, parameters FROM runs WHERE id = ?1",
                rusqlite::params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(mode, "sweep");
        assert_eq!(seed, None);
        let decoded: RunConfig = serde_json::from_str(&params).unwrap();
        assert_eq!(decoded, cfg);
    }
}
