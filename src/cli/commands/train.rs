//! Train command implementation

use crate::cli::args::TrainArgs;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::data::{frame_from_listings, listings_from_json};
use crate::model::{self, ArtifactBundle, TrainConfig};
use crate::pipeline::{self, PreprocessConfig};

pub fn run_train(args: TrainArgs, level: LogLevel) -> Result<(), String> {
    log(level, LogLevel::Normal, &format!("Loading listings from {}", args.input.display()));
    let listings =
        listings_from_json(&args.input).map_err(|e| format!("Input error: {e}"))?;
    let frame = frame_from_listings(&listings).map_err(|e| format!("Input error: {e}"))?;
    log(level, LogLevel::Verbose, &format!("  {} records", frame.height()));

    let config = PreprocessConfig {
        drop_geo_outliers: !args.no_geo_filter,
        drop_outliers: !args.no_outlier_filter,
        geo_radius_km: args.radius_km,
        ..PreprocessConfig::default()
    };
    let prep =
        pipeline::preprocess(&frame, &config).map_err(|e| format!("Preprocessing error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Preprocessed {} rows ({} operation, {} amenity columns)",
            prep.frame.height(),
            prep.operation,
            prep.extra_feature_columns.len()
        ),
    );

    let train_config = TrainConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        seed: args.seed,
        ..TrainConfig::default()
    };
    let trained =
        model::train(&prep, &train_config).map_err(|e| format!("Training error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Costs model: {} epochs, test MSE {:.4}",
            trained.costs_report.epochs_run, trained.costs_report.test_mse
        ),
    );
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Price model: {} epochs, test MSE {:.4}",
            trained.price_report.epochs_run, trained.price_report.test_mse
        ),
    );

    let bundle = ArtifactBundle::from_model(&trained, prep.operation);
    let path = bundle.save(&args.models_dir).map_err(|e| format!("Artifact error: {e}"))?;
    log(level, LogLevel::Normal, &format!("Saved artifact bundle to {}", path.display()));
    Ok(())
}
