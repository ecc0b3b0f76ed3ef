//! Preprocessing pipeline
//!
//! Orchestrates the cleaning and feature stages into one deterministic
//! transform: raw listing frame in, model-ready feature frame out. Each
//! stage runs to completion over all rows before the next stage starts
//! and returns a fresh frame value.
//!
//! Two location representations exist. The model-training path uses the
//! geohash key (stable across runs, feeds the embedding vocabulary); the
//! cluster-id path serves exploratory analysis and the per-cluster
//! summary table.

use crate::cluster;
use crate::data::{Operation, ADMIN_COLUMNS, REQUIRED_COLUMNS};
use crate::features;
use crate::frame::{Column, Frame};
use crate::geo;
use crate::outlier::{self, OutlierConfig};
use crate::{Error, Result};

/// How the pipeline keys locations
#[derive(Debug, Clone, PartialEq)]
pub enum LocationRepr {
    /// Stable geohash string key (model training and inference)
    Geohash,
    /// Learned k-means cluster id (exploratory analysis)
    Cluster {
        /// Pinned cluster count; `None` selects via the elbow method
        k: Option<usize>,
        k_limit: usize,
        seed: u64,
    },
}

impl Default for LocationRepr {
    fn default() -> Self {
        LocationRepr::Geohash
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    /// Drop rows outside the adaptive geographic bounding box
    pub drop_geo_outliers: bool,
    /// Override the adaptive radius (km)
    pub geo_radius_km: Option<f64>,
    /// Drop rows failing the quantile bounds after feature derivation
    pub drop_outliers: bool,
    pub outlier: OutlierConfig,
    pub location: LocationRepr,
    /// Minimum |Pearson r| with the target for derived columns
    pub correlation_threshold: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            drop_geo_outliers: true,
            geo_radius_km: None,
            drop_outliers: true,
            outlier: OutlierConfig::default(),
            location: LocationRepr::default(),
            correlation_threshold: 0.05,
        }
    }
}

/// Result of a preprocessing run
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Model-ready feature frame
    pub frame: Frame,
    /// Operation auto-detected from the input
    pub operation: Operation,
    /// Derived one-hot columns that survived pruning, in frame order;
    /// persisted with the model so inference reproduces the layout
    pub extra_feature_columns: Vec<String>,
    /// Cluster count chosen when the cluster representation ran
    pub cluster_k: Option<usize>,
}

/// Detect the operation from the first non-null value of the column
///
/// A mixed-operation batch keeps the pick-first behavior and logs a
/// warning; callers that care must split their input beforehand.
pub fn detect_operation(frame: &Frame) -> Result<Operation> {
    let values = frame.strs("operation")?;
    let mut distinct: Vec<&str> = Vec::new();
    for value in values.iter().flatten() {
        if !distinct.contains(&value.as_str()) {
            distinct.push(value);
        }
    }
    let first = distinct
        .first()
        .ok_or_else(|| Error::EmptyInput("operation column is all null".to_string()))?;
    if distinct.len() > 1 {
        eprintln!(
            "Warning: input mixes operations {distinct:?}; proceeding with '{first}'"
        );
    }
    first.parse()
}

/// Run the full preprocessing pipeline
pub fn preprocess(frame: &Frame, config: &PreprocessConfig) -> Result<Preprocessed> {
    // 1. Every column a later stage reads must exist before any work
    //    starts; a truncated input fails here, not five stages in
    frame.require(&REQUIRED_COLUMNS)?;

    // 2. Operation detection happens before any column is dropped
    let operation = detect_operation(frame)?;

    // 3. Administrative and identifying columns are not features
    let out = frame.clone().drop_columns(&ADMIN_COLUMNS);

    // 4. Rows without a resolvable position or a usable size cannot pass
    //    the location or price-per-area stages
    let out = drop_unresolved_positions(&out)?;
    let out = drop_zero_size(&out)?;
    if out.height() == 0 {
        return Err(Error::EmptyInput("no rows survived position/size cleaning".to_string()));
    }

    // 5. Categorical type to integer code
    let out = features::map_types(&out)?;

    // 6. Optional geographic outlier drop
    let out = if config.drop_geo_outliers {
        outlier::drop_geo_outliers(&out, config.geo_radius_km)?
    } else {
        out
    };
    if out.height() == 0 {
        return Err(Error::EmptyInput("no rows survived geographic filtering".to_string()));
    }

    // 7. Location key: geohash or cluster id, then coordinates drop out
    let (out, cluster_k) = match &config.location {
        LocationRepr::Geohash => (geohash_locations(&out)?, None),
        LocationRepr::Cluster { k, k_limit, seed } => {
            let (clustered, chosen) = cluster::assign_clusters(&out, *k, *k_limit, *seed)?;
            let with_ppa = features::price_per_area(&clustered)?;
            (with_ppa, Some(chosen))
        }
    };
    let out = out.drop_columns(&["latitude", "longitude"]);

    // 8. Amenity indicators, then correlation pruning of derived columns
    let vocabulary = features::amenity_vocabulary(&out)?;
    let out = features::explode_amenities(&out, &vocabulary)?;
    let out = features::prune_low_correlation(&out, "price", config.correlation_threshold)?;

    // 9. Optional statistical outlier drop over every numeric column
    let out = if config.drop_outliers {
        outlier::remove_statistical_outliers(&out, &config.outlier)?
    } else {
        out
    };

    let extra_feature_columns: Vec<String> = vocabulary
        .iter()
        .filter(|token| out.has_column(token))
        .cloned()
        .collect();

    Ok(Preprocessed { frame: out, operation, extra_feature_columns, cluster_k })
}

/// Drop rows whose position never resolved (0.0 marks a failed geocode)
pub fn drop_unresolved_positions(frame: &Frame) -> Result<Frame> {
    let lat = frame.floats("latitude")?;
    let lng = frame.floats("longitude")?;
    let mask: Vec<bool> =
        lat.iter().zip(lng).map(|(&la, &ln)| la != 0.0 && ln != 0.0).collect();
    frame.filter(&mask)
}

/// Drop zero-size rows before any stage divides by size
pub fn drop_zero_size(frame: &Frame) -> Result<Frame> {
    let size = frame.floats("size")?;
    let mask: Vec<bool> = size.iter().map(|&s| s > 0.0).collect();
    frame.filter(&mask)
}

/// Replace coordinates with an 8-character geohash `location` column
fn geohash_locations(frame: &Frame) -> Result<Frame> {
    let lat = frame.floats("latitude")?;
    let lng = frame.floats("longitude")?;
    let hashes: Result<Vec<Option<String>>> = lat
        .iter()
        .zip(lng)
        .map(|(&la, &ln)| geo::encode(la, ln, geo::GEOHASH_PRECISION).map(Some))
        .collect();
    frame.clone().with_column("location", Column::Str(hashes?))
}
