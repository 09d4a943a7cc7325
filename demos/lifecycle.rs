//! Model Lifecycle Example
//!
//! Walks one model through create, train, predict, retrain, restart and
//! delete with file-backed snapshots and the local experiment tracker.
//!
//! Run with: cargo run --example lifecycle

use anyhow::Context;
use std::sync::Arc;
use trueno_mlops::config::ServiceConfig;
use trueno_mlops::experiment::LocalExperimentTracker;
use trueno_mlops::{logging, Hyperparameters, ModelLifecycleService};

fn main() -> anyhow::Result<()> {
    let workspace = tempfile::tempdir().context("creating scratch directory")?;
    let config = ServiceConfig {
        models_dir: workspace.path().join("models"),
        datasets_dir: workspace.path().join("data"),
        ..ServiceConfig::load(None)?
    };
    logging::init(&config.logging)?;

    println!("=== Trueno-MLOps Model Lifecycle ===\n");

    // -------------------------------------------------------------------------
    // 1. Write a dataset: two features, label = x0 > x1
    // -------------------------------------------------------------------------
    std::fs::create_dir_all(&config.datasets_dir)?;
    let rows: Vec<[f64; 3]> = (0..200)
        .map(|i| {
            let x0 = f64::from(i % 20) / 20.0;
            let x1 = f64::from(i / 20) / 10.0;
            [x0, x1, if x0 > x1 { 1.0 } else { 0.0 }]
        })
        .collect();
    let dataset = config.datasets_dir.join("diagonal.json");
    std::fs::write(&dataset, serde_json::to_vec(&rows)?)?;
    println!("1. Dataset written to {}", dataset.display());

    // -------------------------------------------------------------------------
    // 2. Create and train
    // -------------------------------------------------------------------------
    let tracker = Arc::new(LocalExperimentTracker::new());
    let service = ModelLifecycleService::builder()
        .store(Arc::new(
            trueno_mlops::persistence::FileSnapshotStore::open(&config.models_dir)?
                .with_compression(config.persistence.compression),
        ))
        .datasets(Arc::new(trueno_mlops::dataset::FileDatasetProvider::open(
            &config.datasets_dir,
        )?))
        .experiment_logger(tracker.clone())
        .artifact_sink(tracker.clone())
        .build();

    println!("\n2. Available classes: {:?}", service.available_classes());
    let params = Hyperparameters::new().with("n_estimators", 30_i64);
    let id = service.create("random_forest", &params)?;
    let report = service.train(&id, "diagonal.json")?;
    println!("   Model {id} trained: {}", report.metrics);
    println!(
        "   Side effects: {}",
        serde_json::to_string(&report.side_effects)?
    );

    // -------------------------------------------------------------------------
    // 3. Predict
    // -------------------------------------------------------------------------
    let predictions = service.predict(&id, &[vec![0.9, 0.1], vec![0.1, 0.9]])?;
    println!("\n3. Predictions: {predictions:?}");

    // -------------------------------------------------------------------------
    // 4. Retrain with a depth limit
    // -------------------------------------------------------------------------
    let report = service.retrain(
        &id,
        "diagonal.json",
        Some(&Hyperparameters::new().with("max_depth", 2_i64)),
    )?;
    println!("\n4. Retrained with {}: {}", report.hyperparameters, report.metrics);
    println!("   Runs recorded: {}", tracker.runs(&id).len());

    // -------------------------------------------------------------------------
    // 5. Restart and recover from snapshots
    // -------------------------------------------------------------------------
    let restarted = ModelLifecycleService::from_config(&config)?;
    let recovered = restarted.recover()?;
    println!("\n5. Recovered after restart: {recovered:?}");
    println!(
        "   Same predictions: {}",
        restarted.predict(&id, &[vec![0.9, 0.1]])? == service.predict(&id, &[vec![0.9, 0.1]])?
    );

    // -------------------------------------------------------------------------
    // 6. Delete
    // -------------------------------------------------------------------------
    restarted.delete(&id)?;
    println!("\n6. Deleted; predict now fails with: {}", restarted.predict(&id, &[vec![0.5, 0.5]]).unwrap_err());

    println!("\n=== Done ===");
    Ok(())
}
