//! pipeline-runner: headless training and scoring runner for NextBuy.
//!
//! Usage:
//!   pipeline-runner --source data/online_retail_II.csv --db nextbuy.db
//!   pipeline-runner --db nextbuy.db --score-mode

use anyhow::Result;
use nextbuy_core::{
    config::PipelineConfig,
    pipeline::{run_training, TrainReport},
    scoring::Scorer,
    store::ModelStore,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Serialize)]
struct ErrorLine {
    error: String,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let score_mode = args.iter().any(|a| a == "--score-mode");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or("nextbuy.db");
    let source = args
        .windows(2)
        .find(|w| w[0] == "--source")
        .map(|w| w[1].as_str())
        .unwrap_or("data/online_retail_II.csv");
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str());

    let mut config = match config_path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.horizon_days = parse_arg(&args, "--horizon", config.horizon_days);
    config.test_fraction = parse_arg(&args, "--split", config.test_fraction);
    config.seed = parse_arg(&args, "--seed", config.seed);

    const KNOWN_FLAGS: [&str; 7] = [
        "--score-mode",
        "--db",
        "--source",
        "--config",
        "--horizon",
        "--split",
        "--seed",
    ];
    for arg in args.iter().skip(1).filter(|a| a.starts_with("--")) {
        if !KNOWN_FLAGS.contains(&arg.as_str()) {
            log::warn!("Unknown flag: {arg}");
        }
    }

    if !score_mode {
        println!("NextBuy — pipeline-runner");
        println!("  source:   {source}");
        println!("  db:       {db}");
        println!("  horizon:  {} days", config.horizon_days);
        println!("  split:    {}", config.test_fraction);
        println!("  seed:     {}", config.seed);
        println!(
            "  started:  {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    let store = ModelStore::open(db)?;
    store.migrate()?;

    if score_mode {
        run_score_loop(&store)?;
    } else {
        let report = run_training(&config, source, &store)?;
        print_summary(&report);
    }

    Ok(())
}

/// One JSON request per stdin line, one JSON response per stdout line.
/// A bad request answers {"error": ...} and the loop keeps going; a
/// store without both artifacts fails before any request is read.
fn run_score_loop(store: &ModelStore) -> Result<()> {
    let scorer = Scorer::load(store)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        match scorer.score_json(buffer.trim()) {
            Ok(response) => writeln!(stdout, "{response}")?,
            Err(e) => {
                let err = ErrorLine {
                    error: e.to_string(),
                };
                writeln!(stdout, "{}", serde_json::to_string(&err)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(report: &TrainReport) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:           {}", report.run_id);
    println!("  cutoff:           {}", report.cutoff);
    println!("  transactions:     {}", report.transactions);
    println!("  customers:        {}", report.customers);
    println!("  train rows:       {}", report.metrics.train_rows);
    println!("  test rows:        {}", report.metrics.test_rows);
    println!("  train converters: {}", report.metrics.train_converters);
    println!("  test converters:  {}", report.metrics.test_converters);
    println!("  accuracy:         {:.4}", report.metrics.accuracy);
    match report.metrics.mae_days {
        Some(mae) => println!("  mae (days):       {mae:.2}"),
        None => println!("  mae (days):       skipped (no converters held out)"),
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
