//! Chained price estimation
//!
//! Two estimators share one feature layout. The first predicts the
//! monthly additional costs of a listing; the second predicts the price
//! with the first's prediction appended as an input feature. Training
//! feeds the costs net's own predictions into the price net so both see
//! the same distribution inference will produce.

use super::encoder::LabelEncoder;
use super::net::EstimatorNet;
use super::trainer::{self, TrainConfig, TrainReport};
use crate::pipeline::Preprocessed;
use crate::stats::StandardScaler;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};

/// Columns the feature scaler is fit on, in slot order
pub const SCALED_FEATURES: [&str; 5] = ["size", "dorms", "toilets", "garage", "additional_costs"];

/// Scaler slot of the additional-costs column
pub const COSTS_SLOT: usize = 4;

/// Trained pair of estimators plus everything inference needs
#[derive(Debug, Clone)]
pub struct PriceModel {
    pub encoder: LabelEncoder,
    /// Scaler over [`SCALED_FEATURES`]
    pub feature_scaler: StandardScaler,
    /// Scaler over the price column alone
    pub target_scaler: StandardScaler,
    /// Amenity indicator columns, in training frame order
    pub extra_feature_columns: Vec<String>,
    pub costs_net: EstimatorNet,
    pub price_net: EstimatorNet,
    pub costs_report: TrainReport,
    pub price_report: TrainReport,
    pub trained_at: DateTime<Utc>,
}

impl PriceModel {
    /// Width of the shared numeric base: four scaled features, the type
    /// code, and one slot per amenity column
    pub fn base_width(&self) -> usize {
        4 + 1 + self.extra_feature_columns.len()
    }

    /// Build the numeric base vector for one listing
    ///
    /// `extras` must match `extra_feature_columns` in order and length.
    pub fn assemble_base(
        &self,
        size: f64,
        dorms: f64,
        toilets: f64,
        garage: f64,
        type_code: f64,
        extras: &[f64],
    ) -> Result<Vec<f32>> {
        if extras.len() != self.extra_feature_columns.len() {
            return Err(Error::UnknownCategory(format!(
                "expected {} amenity indicators, got {}",
                self.extra_feature_columns.len(),
                extras.len()
            )));
        }
        let mut base = Vec::with_capacity(self.base_width());
        for (slot, value) in [size, dorms, toilets, garage].into_iter().enumerate() {
            base.push(self.feature_scaler.transform_column(slot, &[value])[0] as f32);
        }
        base.push(type_code as f32);
        base.extend(extras.iter().map(|&v| v as f32));
        Ok(base)
    }

    /// Predict `(price, additional_costs)` in original units
    pub fn predict(&self, base: &[f32], location_id: usize) -> (f64, f64) {
        let row = Array2::from_shape_vec((1, base.len()), base.to_vec())
            .expect("row shape matches base length");
        let costs_scaled = self.costs_net.forward(&row, &[location_id])[0];

        let mut chained = base.to_vec();
        chained.push(costs_scaled);
        let row = Array2::from_shape_vec((1, chained.len()), chained)
            .expect("row shape matches chained length");
        let price_scaled = self.price_net.forward(&row, &[location_id])[0];

        let costs = self.feature_scaler.inverse_value(COSTS_SLOT, costs_scaled as f64);
        let price = self.target_scaler.inverse_value(0, price_scaled as f64);
        (price, costs)
    }
}

/// Train both estimators on a preprocessed frame
pub fn train(prep: &Preprocessed, config: &TrainConfig) -> Result<PriceModel> {
    let frame = &prep.frame;
    let n = frame.height();
    if n == 0 {
        return Err(Error::EmptyInput("no rows to train on".to_string()));
    }

    // Location vocabulary and dense ids
    let raw_locations = frame.strs("location")?;
    let mut labels = Vec::with_capacity(n);
    for value in raw_locations {
        labels.push(
            value
                .as_deref()
                .ok_or_else(|| Error::UnknownCategory("null location".to_string()))?,
        );
    }
    let encoder = LabelEncoder::fit(&labels);
    let location_ids: Result<Vec<usize>> = labels.iter().map(|l| encoder.encode(l)).collect();
    let location_ids = location_ids?;

    // Scalers fit once on the training data, persisted with the model
    let scaled_cols: Result<Vec<&[f64]>> =
        SCALED_FEATURES.iter().map(|name| frame.floats(name)).collect();
    let scaled_cols = scaled_cols?;
    let feature_scaler = StandardScaler::fit(&scaled_cols);
    let price = frame.floats("price")?;
    let target_scaler = StandardScaler::fit(&[price]);

    // Shared numeric base: scaled size/dorms/toilets/garage, raw type
    // code, raw amenity indicators
    let type_codes = frame.floats("type")?;
    let extras: Result<Vec<&[f64]>> =
        prep.extra_feature_columns.iter().map(|name| frame.floats(name)).collect();
    let extras = extras?;

    let base_width = 4 + 1 + extras.len();
    let mut base = Array2::zeros((n, base_width));
    for slot in 0..4 {
        let scaled = feature_scaler.transform_column(slot, scaled_cols[slot]);
        for i in 0..n {
            base[[i, slot]] = scaled[i] as f32;
        }
    }
    for i in 0..n {
        base[[i, 4]] = type_codes[i] as f32;
        for (j, col) in extras.iter().enumerate() {
            base[[i, 5 + j]] = col[i] as f32;
        }
    }

    // First estimator: additional costs, target scaled by its own slot
    let costs_scaled: Array1<f32> = feature_scaler
        .transform_column(COSTS_SLOT, scaled_cols[COSTS_SLOT])
        .into_iter()
        .map(|v| v as f32)
        .collect();
    let (costs_net, costs_report) =
        trainer::fit(encoder.len(), &base, &location_ids, &costs_scaled, config)?;

    // Second estimator sees the first's predictions, not the true costs
    let predicted_costs = costs_net.forward(&base, &location_ids);
    let mut chained = Array2::zeros((n, base_width + 1));
    for i in 0..n {
        for j in 0..base_width {
            chained[[i, j]] = base[[i, j]];
        }
        chained[[i, base_width]] = predicted_costs[i];
    }

    let price_scaled: Array1<f32> =
        target_scaler.transform_column(0, price).into_iter().map(|v| v as f32).collect();
    let (price_net, price_report) =
        trainer::fit(encoder.len(), &chained, &location_ids, &price_scaled, config)?;

    Ok(PriceModel {
        encoder,
        feature_scaler,
        target_scaler,
        extra_feature_columns: prep.extra_feature_columns.clone(),
        costs_net,
        price_net,
        costs_report,
        price_report,
        trained_at: Utc::now(),
    })
}
