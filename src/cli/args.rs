//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Preprocess listing data, train price models, and run predictions
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "avaliar", version, about)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Preprocess a listing batch and train both estimators
    Train(TrainArgs),

    /// Cluster listings spatially and print per-cluster aggregates
    Analyze(AnalyzeArgs),

    /// Price one listing with a previously trained model
    Predict(PredictArgs),
}

/// Arguments for the train command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// JSON file holding an array of listing records
    pub input: PathBuf,

    /// Directory artifact bundles are written to
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    /// Maximum training epochs
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Minibatch size
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Random seed for splits and initialization
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Keep rows outside the adaptive geographic bounding box
    #[arg(long)]
    pub no_geo_filter: bool,

    /// Keep rows failing the quantile bounds
    #[arg(long)]
    pub no_outlier_filter: bool,

    /// Override the adaptive geographic radius (km)
    #[arg(long)]
    pub radius_km: Option<f64>,
}

/// Arguments for the analyze command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct AnalyzeArgs {
    /// JSON file holding an array of listing records
    pub input: PathBuf,

    /// Pin the cluster count instead of elbow selection
    #[arg(long)]
    pub clusters: Option<usize>,

    /// Upper bound (exclusive) on k values tried by elbow selection
    #[arg(long, default_value_t = 20)]
    pub k_limit: usize,

    /// Random seed for clustering
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

/// Arguments for the predict command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct PredictArgs {
    /// Directory artifact bundles are read from
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    /// Market operation: sale or rental
    #[arg(long)]
    pub operation: String,

    /// Usable area in square meters
    #[arg(long)]
    pub size: f64,

    #[arg(long, default_value_t = 0.0)]
    pub dorms: f64,

    #[arg(long, default_value_t = 0.0)]
    pub toilets: f64,

    #[arg(long, default_value_t = 0.0)]
    pub garage: f64,

    /// Integer property-type code
    #[arg(long, default_value_t = 0)]
    pub type_code: u8,

    /// Comma-separated amenity names
    #[arg(long)]
    pub amenities: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub latitude: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub longitude: f64,
}
