//! End-to-end training runs over a synthetic retail export.
//!
//! The property that matters most here: two runs over the same file with
//! the same config produce identical models and identical metrics. Run ids
//! and wall-clock timestamps may differ; nothing that feeds the models may.

use chrono::NaiveDateTime;
use nextbuy_core::config::PipelineConfig;
use nextbuy_core::error::PipelineError;
use nextbuy_core::pipeline::run_training;
use nextbuy_core::scoring::{ScoreRequest, Scorer};
use nextbuy_core::store::{ModelStore, KEY_CLASSIFIER, KEY_REGRESSOR};
use std::path::Path;
use tempfile::tempdir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("timestamp literal")
}

/// Twelve customers with history, six of whom buy again after the cutoff.
/// The latest row (F0004) pins max_date to 2011-12-09 12:00, which puts the
/// 90-day cutoff at 2011-09-10 12:00. One guest checkout and one return
/// exercise the cleaning rules.
fn retail_csv() -> String {
    let lines = [
        "Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country",
        "H0001,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2011-06-01 10:00:00,2.50,10001,United Kingdom",
        "H0002,71053,WHITE METAL LANTERN,4,2011-08-15 09:30:00,3.00,10001,United Kingdom",
        "H0003,84406B,CREAM CUPID HEARTS COAT HANGER,12,2011-07-20 14:00:00,1.25,10002,United Kingdom",
        "H0004,84029G,KNITTED UNION FLAG HOT WATER BOTTLE,3,2011-09-01 11:00:00,15.00,10003,United Kingdom",
        "H0005,84029E,RED WOOLLY HOTTIE WHITE HEART,24,2011-05-05 16:45:00,0.85,10004,France",
        "H0006,22752,SET 7 BABUSHKA NESTING BOXES,2,2011-08-30 10:15:00,49.99,10005,United Kingdom",
        "H0007,21730,GLASS STAR FROSTED T-LIGHT HOLDER,10,2011-03-12 09:00:00,2.00,10006,Germany",
        "H0008,22633,HAND WARMER UNION JACK,5,2011-07-04 13:20:00,4.10,10006,Germany",
        "H0009,22632,HAND WARMER RED POLKA DOT,8,2011-04-18 10:30:00,1.95,10007,United Kingdom",
        "H0010,84879,ASSORTED COLOUR BIRD ORNAMENT,3,2011-06-25 15:10:00,6.50,10008,United Kingdom",
        "H0011,22745,POPPY'S PLAYHOUSE BEDROOM,1,2011-09-10 11:59:00,120.00,10009,France",
        "H0012,22748,POPPY'S PLAYHOUSE KITCHEN,50,2011-01-07 09:05:00,0.42,10010,United Kingdom",
        "H0013,22749,FELTCRAFT PRINCESS CHARLOTTE DOLL,7,2011-08-01 12:00:00,3.75,10011,United Kingdom",
        "H0014,22310,IVORY KNITTED MUG COSY,2,2011-02-14 14:00:00,25.00,10012,United Kingdom",
        "F0001,21754,HOME BUILDING BLOCK WORD,5,2011-09-15 10:00:00,5.95,10001,United Kingdom",
        "F0002,21755,LOVE BUILDING BLOCK WORD,6,2011-10-01 09:00:00,3.95,10002,United Kingdom",
        "F0003,21777,RECIPE BOX WITH METAL HEART,4,2011-11-20 15:00:00,7.95,10003,United Kingdom",
        "F0004,48187,DOORMAT NEW ENGLAND,2,2011-12-09 12:00:00,7.95,10004,France",
        "F0005,22960,JAM MAKING SET WITH JARS,9,2011-09-10 18:00:00,4.25,10005,United Kingdom",
        "F0006,22913,RED COAT RACK PARIS FASHION,3,2011-10-31 11:11:00,4.95,10006,Germany",
        "G0001,85049A,GUEST CHECKOUT LINE,2,2011-06-02 10:00:00,1.25,,United Kingdom",
        "R0001,22960,RETURNED JAM SET,-3,2011-09-12 10:00:00,4.25,10005,United Kingdom",
    ];
    lines.join("\n")
}

fn write_fixture(dir: &Path) -> String {
    let path = dir.join("online_retail.csv");
    std::fs::write(&path, retail_csv()).expect("write fixture csv");
    path.to_str().expect("utf8 temp path").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// One full run: clean, window, join, fit, evaluate, persist. The report
/// and the store must tell the same story.
#[test]
fn a_full_run_trains_evaluates_and_persists() {
    let dir = tempdir().expect("create temp dir");
    let csv_path = write_fixture(dir.path());
    let db_path = dir.path().join("models.db");
    let store = ModelStore::open(db_path.to_str().expect("utf8 temp path")).expect("open store");
    store.migrate().expect("apply migrations");
    let config = PipelineConfig::default_test();

    let report = run_training(&config, &csv_path, &store).expect("training run");

    assert_eq!(
        report.transactions, 20,
        "the guest checkout and the return must be dropped"
    );
    assert_eq!(report.customers, 12, "one table row per history customer");
    assert_eq!(report.cutoff, at("2011-09-10 12:00:00"));
    assert_eq!(report.metrics.train_rows, 9);
    assert_eq!(report.metrics.test_rows, 3);
    assert_eq!(
        report.metrics.train_converters + report.metrics.test_converters,
        6,
        "six customers purchase again after the cutoff"
    );
    assert!(
        (0.0..=1.0).contains(&report.metrics.accuracy),
        "accuracy={} out of range",
        report.metrics.accuracy
    );

    let (run_id, stored) = store
        .latest_metrics()
        .expect("query metrics")
        .expect("the run must be on record");
    assert_eq!(run_id, report.run_id);
    assert_eq!(stored, report.metrics);
    store
        .load_model(KEY_CLASSIFIER)
        .expect("classifier persisted");
    store.load_model(KEY_REGRESSOR).expect("regressor persisted");
}

/// Same file, same config: the metrics and both persisted models must be
/// byte-for-byte identical. Only the run id is fresh.
#[test]
fn the_same_file_and_seed_reproduce_the_run() {
    let dir = tempdir().expect("create temp dir");
    let csv_path = write_fixture(dir.path());
    let config = PipelineConfig::default_test();

    let store_a = ModelStore::in_memory().expect("store a");
    store_a.migrate().expect("migrate a");
    let report_a = run_training(&config, &csv_path, &store_a).expect("run a");

    let store_b = ModelStore::in_memory().expect("store b");
    store_b.migrate().expect("migrate b");
    let report_b = run_training(&config, &csv_path, &store_b).expect("run b");

    assert_eq!(
        report_a.metrics, report_b.metrics,
        "Two runs with the same seed diverged — the pipeline is leaking nondeterminism"
    );
    assert_eq!(report_a.cutoff, report_b.cutoff);
    assert_ne!(report_a.run_id, report_b.run_id, "run ids are fresh per run");

    let clf_a = store_a.load_model(KEY_CLASSIFIER).expect("classifier a");
    let clf_b = store_b.load_model(KEY_CLASSIFIER).expect("classifier b");
    assert_eq!(clf_a, clf_b, "persisted classifiers differ across identical runs");
    let reg_a = store_a.load_model(KEY_REGRESSOR).expect("regressor a");
    let reg_b = store_b.load_model(KEY_REGRESSOR).expect("regressor b");
    assert_eq!(reg_a, reg_b, "persisted regressors differ across identical runs");
}

/// What training persists, serving can use: reopen the database, boot a
/// scorer, and answer a request with a well-formed recommendation.
#[test]
fn trained_artifacts_serve_scores_after_reopen() {
    let dir = tempdir().expect("create temp dir");
    let csv_path = write_fixture(dir.path());
    let db_path = dir.path().join("models.db");
    let store = ModelStore::open(db_path.to_str().expect("utf8 temp path")).expect("open store");
    store.migrate().expect("apply migrations");
    run_training(&PipelineConfig::default_test(), &csv_path, &store).expect("training run");

    let serving = store.reopen().expect("reopen for serving");
    let scorer = Scorer::load(&serving).expect("scorer boots from persisted artifacts");

    let response = scorer
        .score(&ScoreRequest {
            recency: 5.0,
            frequency: 3.0,
            monetary: 2500.0,
        })
        .expect("score a request");

    assert!(
        (0.0..=1.0).contains(&response.probability_to_convert),
        "probability={} out of range",
        response.probability_to_convert
    );
    assert!(response.estimated_days_to_buy.is_finite());
    let known = ["VIP ALERT:", "PROMO:", "RISK:", "URGENCY:", "NURTURE:"];
    assert!(
        known
            .iter()
            .any(|prefix| response.recommended_action.starts_with(prefix)),
        "unrecognized action message: {}",
        response.recommended_action
    );
}

/// A file whose every row is cleaned away cannot derive a cutoff; the run
/// aborts with a degenerate-set error instead of training on nothing.
#[test]
fn a_file_cleaned_down_to_nothing_aborts() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("noise.csv");
    let content = "Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country\n\
                   G0001,85049A,GUEST LINE,2,2011-06-02 10:00:00,1.25,,United Kingdom\n\
                   R0001,22960,RETURN LINE,-3,2011-09-12 10:00:00,4.25,10005,United Kingdom\n";
    std::fs::write(&path, content).expect("write noise csv");

    let store = ModelStore::in_memory().expect("open store");
    store.migrate().expect("apply migrations");

    let err = run_training(
        &PipelineConfig::default_test(),
        path.to_str().expect("utf8 temp path"),
        &store,
    )
    .expect_err("an empty cleaned set must abort");

    match err {
        PipelineError::DegenerateTrainingSet { reason } => {
            assert!(reason.contains("cleaning"), "reason was '{reason}'");
        }
        other => panic!("expected DegenerateTrainingSet, got {other:?}"),
    }
}
