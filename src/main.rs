use delta_replica::config::{self, RunMode};
use delta_replica::db;
use delta_replica::errors::SimResult;
use delta_replica::paper::{self, BatchSummary, HedgeSimulator};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("delta_replica starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cfg) {
        tracing::error!("run failed: {e}");
        std::process::exit(1);
    }
}

fn run(cfg: &config::AppConfig) -> SimResult<()> {
    let run_cfg = cfg.run_config();
    let mode = cfg.mode();
    let mut conn = db::init_db(&cfg.data_dir)?;

    tracing::info!(%mode, seed = ?cfg.seed, "configuration loaded");

    let report = match (mode, cfg.trials) {
        (RunMode::Single, _) | (_, None) => {
            let mut sim = HedgeSimulator::new(&run_cfg, cfg.seed)?;
            sim.simulate();
            let result = sim.terminal_stats()?;

            let run_id = db::insert_run(&conn, RunMode::Single, cfg.seed, &run_cfg)?;
            db::write_ledger(&mut conn, &run_id, sim.export())?;

            serde_json::json!({
                "run_id": run_id,
                "mode": RunMode::Single,
                "steps": sim.steps_taken(),
                "state": sim.state(),
                "result": result,
            })
        }
        (RunMode::Batch, Some(trials)) => {
            let results = paper::run_many(&run_cfg, trials, cfg.seed)?;
            let summary = BatchSummary::from_results(&results)?;

            let run_id = db::insert_run(&conn, RunMode::Batch, cfg.seed, &run_cfg)?;
            db::write_results(&mut conn, &run_id, run_cfg.rebalances_per_day, &results)?;

            serde_json::json!({
                "run_id": run_id,
                "mode": RunMode::Batch,
                "summary": summary,
            })
        }
        (RunMode::Sweep, Some(trials)) => {
            let points = paper::frequency_sweep(&run_cfg, &cfg.sweep, trials, cfg.seed)?;

            let run_id = db::insert_run(&conn, RunMode::Sweep, cfg.seed, &run_cfg)?;
            for point in &points {
                db::write_results(&mut conn, &run_id, point.rebalances_per_day, &point.results)?;
            }

            let summaries: Vec<_> = points
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "rebalances_per_day": p.rebalances_per_day,
                        "summary": p.summary,
                    })
                })
                .collect();
            serde_json::json!({
                "run_id": run_id,
                "mode": RunMode::Sweep,
                "points": summaries,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
