//! Predict command implementation

use crate::cli::args::PredictArgs;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::data::Operation;
use crate::infer::{InferenceService, LocationMatch, PredictionQuery};

pub fn run_predict(args: PredictArgs, level: LogLevel) -> Result<(), String> {
    let operation: Operation =
        args.operation.parse().map_err(|e| format!("Argument error: {e}"))?;
    let service = InferenceService::from_dir(&args.models_dir)
        .map_err(|e| format!("Artifact error: {e}"))?;

    let amenities: Vec<String> = args
        .amenities
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let query = PredictionQuery {
        size: args.size,
        dorms: args.dorms,
        toilets: args.toilets,
        garage: args.garage,
        property_type: args.type_code,
        amenities,
        latitude: args.latitude,
        longitude: args.longitude,
    };
    let prediction =
        service.predict(operation, &query).map_err(|e| format!("Prediction error: {e}"))?;

    match &prediction.location {
        LocationMatch::Exact(gh) => {
            log(level, LogLevel::Verbose, &format!("Location {gh} known from training"));
        }
        LocationMatch::Nearest { queried, resolved } => {
            log(
                level,
                LogLevel::Normal,
                &format!("Location {queried} unseen; using nearest known {resolved}"),
            );
        }
    }
    log(level, LogLevel::Normal, &format!("Predicted price: {:.0}", prediction.predicted_price));
    log(
        level,
        LogLevel::Normal,
        &format!("Predicted additional costs: {:.0}", prediction.predicted_additional_costs),
    );
    Ok(())
}
