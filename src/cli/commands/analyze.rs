//! Analyze command implementation

use crate::cli::args::AnalyzeArgs;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::cluster::summarize_by_cluster;
use crate::data::{frame_from_listings, listings_from_json};
use crate::pipeline::{self, LocationRepr, PreprocessConfig};

pub fn run_analyze(args: AnalyzeArgs, level: LogLevel) -> Result<(), String> {
    log(level, LogLevel::Normal, &format!("Loading listings from {}", args.input.display()));
    let listings =
        listings_from_json(&args.input).map_err(|e| format!("Input error: {e}"))?;
    let frame = frame_from_listings(&listings).map_err(|e| format!("Input error: {e}"))?;

    let config = PreprocessConfig {
        location: LocationRepr::Cluster {
            k: args.clusters,
            k_limit: args.k_limit,
            seed: args.seed,
        },
        ..PreprocessConfig::default()
    };
    let prep =
        pipeline::preprocess(&frame, &config).map_err(|e| format!("Preprocessing error: {e}"))?;
    let k = prep.cluster_k.unwrap_or_default();
    log(level, LogLevel::Normal, &format!("{} rows in {k} clusters", prep.frame.height()));

    let summary =
        summarize_by_cluster(&prep.frame).map_err(|e| format!("Summary error: {e}"))?;
    let names = summary.names();
    log(level, LogLevel::Normal, &names.join("\t"));
    for row in 0..summary.height() {
        let cells: Result<Vec<String>, String> = names
            .iter()
            .map(|name| {
                summary
                    .floats(name)
                    .map(|col| format!("{:.2}", col[row]))
                    .map_err(|e| format!("Summary error: {e}"))
            })
            .collect();
        log(level, LogLevel::Normal, &cells?.join("\t"));
    }
    Ok(())
}
