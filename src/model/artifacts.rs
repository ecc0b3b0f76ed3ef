//! Model persistence
//!
//! One JSON bundle per operation holds both networks, the scalers, the
//! location vocabulary, and the amenity column layout. Writes go through
//! a temporary file and an atomic rename so a crashed save never leaves
//! a half-written bundle where the loader looks.

use super::encoder::LabelEncoder;
use super::net::EstimatorNet;
use super::price::PriceModel;
use super::trainer::TrainReport;
use crate::data::Operation;
use crate::stats::StandardScaler;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized shape and flattened parameters of one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetState {
    pub n_locations: usize,
    pub numeric_width: usize,
    pub embedding_dim: usize,
    pub hidden: usize,
    pub params: Vec<f32>,
}

impl NetState {
    fn from_net(net: &EstimatorNet) -> Self {
        Self {
            n_locations: net.n_locations(),
            numeric_width: net.numeric_width(),
            embedding_dim: net.embedding_dim(),
            hidden: net.hidden(),
            params: net.params_flat(),
        }
    }

    fn to_net(&self) -> Result<EstimatorNet> {
        let mut net = EstimatorNet::new(
            self.n_locations,
            self.numeric_width,
            self.embedding_dim,
            self.hidden,
            0,
        );
        net.restore_flat(&self.params)?;
        Ok(net)
    }
}

/// Everything needed to reload a trained model for one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub operation: String,
    pub trained_at: DateTime<Utc>,
    pub encoder: LabelEncoder,
    pub feature_scaler: StandardScaler,
    pub target_scaler: StandardScaler,
    pub extra_feature_columns: Vec<String>,
    pub costs_net: NetState,
    pub price_net: NetState,
    pub costs_report: TrainReport,
    pub price_report: TrainReport,
}

impl ArtifactBundle {
    /// Capture a trained model for persistence
    pub fn from_model(model: &PriceModel, operation: Operation) -> Self {
        Self {
            operation: operation.to_string(),
            trained_at: model.trained_at,
            encoder: model.encoder.clone(),
            feature_scaler: model.feature_scaler.clone(),
            target_scaler: model.target_scaler.clone(),
            extra_feature_columns: model.extra_feature_columns.clone(),
            costs_net: NetState::from_net(&model.costs_net),
            price_net: NetState::from_net(&model.price_net),
            costs_report: model.costs_report.clone(),
            price_report: model.price_report.clone(),
        }
    }

    /// Rebuild the in-memory model
    pub fn to_model(&self) -> Result<PriceModel> {
        Ok(PriceModel {
            encoder: self.encoder.clone(),
            feature_scaler: self.feature_scaler.clone(),
            target_scaler: self.target_scaler.clone(),
            extra_feature_columns: self.extra_feature_columns.clone(),
            costs_net: self.costs_net.to_net()?,
            price_net: self.price_net.to_net()?,
            costs_report: self.costs_report.clone(),
            price_report: self.price_report.clone(),
            trained_at: self.trained_at,
        })
    }

    /// Bundle file path for an operation under an artifact directory
    pub fn path_for(dir: &Path, operation: Operation) -> PathBuf {
        dir.join(format!("{operation}.json"))
    }

    /// Write the bundle atomically, returning the final path
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let operation: Operation = self.operation.parse()?;
        let path = Self::path_for(dir, operation);
        let tmp = dir.join(format!("{operation}.json.tmp"));

        let json = serde_json::to_vec_pretty(self)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Load the bundle for an operation
    ///
    /// A missing file means no model was ever trained for the operation;
    /// a present file that does not parse is a corrupt artifact.
    pub fn load(dir: &Path, operation: Operation) -> Result<Self> {
        let path = Self::path_for(dir, operation);
        let json = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ModelsNotLoaded(operation.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&json).map_err(|err| {
            Error::ArtifactLoad(format!("{} does not parse: {err}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, Frame};
    use crate::model::price;
    use crate::model::trainer::TrainConfig;
    use crate::pipeline::Preprocessed;

    fn trained_model() -> PriceModel {
        let n = 60;
        let hashes = ["6gyf4bf2", "6gyf4bf8"];
        let mut frame = Frame::new();
        let cols: Vec<(&str, Vec<f64>)> = vec![
            ("size", (0..n).map(|i| 60.0 + (i % 8) as f64 * 10.0).collect()),
            ("dorms", (0..n).map(|i| 1.0 + (i % 3) as f64).collect()),
            ("toilets", (0..n).map(|i| 1.0 + (i % 2) as f64).collect()),
            ("garage", (0..n).map(|i| (i % 2) as f64).collect()),
            ("price", (0..n).map(|i| 200_000.0 + i as f64 * 1_000.0).collect()),
            ("additional_costs", (0..n).map(|i| 300.0 + i as f64).collect()),
            ("type", (0..n).map(|i| (i % 2) as f64).collect()),
        ];
        for (name, values) in cols {
            frame = frame.with_column(name, Column::Float(values)).unwrap();
        }
        let frame = frame
            .with_column(
                "location",
                Column::Str((0..n).map(|i| Some(hashes[i % 2].to_string())).collect()),
            )
            .unwrap();
        let prep = Preprocessed {
            frame,
            operation: Operation::Sale,
            extra_feature_columns: vec![],
            cluster_k: None,
        };
        let config =
            TrainConfig { epochs: 5, hidden: 8, embedding_dim: 2, ..TrainConfig::default() };
        price::train(&prep, &config).unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let model = trained_model();
        let bundle = ArtifactBundle::from_model(&model, Operation::Sale);
        let dir = tempfile::tempdir().unwrap();

        let path = bundle.save(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("sale.json"));
        assert!(!dir.path().join("sale.json.tmp").exists());

        let loaded = ArtifactBundle::load(dir.path(), Operation::Sale).unwrap();
        assert_eq!(bundle, loaded);

        // The rebuilt model predicts identically to the original
        let restored = loaded.to_model().unwrap();
        let loc = model.encoder.encode("6gyf4bf2").unwrap();
        let base = model.assemble_base(80.0, 2.0, 1.0, 1.0, 0.0, &[]).unwrap();
        assert_eq!(model.predict(&base, loc), restored.predict(&base, loc));
    }

    #[test]
    fn test_load_missing_is_models_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ArtifactBundle::load(dir.path(), Operation::Rental),
            Err(Error::ModelsNotLoaded(op)) if op == "rental"
        ));
    }

    #[test]
    fn test_load_corrupt_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sale.json"), b"{ not json").unwrap();
        assert!(matches!(
            ArtifactBundle::load(dir.path(), Operation::Sale),
            Err(Error::ArtifactLoad(_))
        ));
    }

    #[test]
    fn test_operations_do_not_collide() {
        let dir = Path::new("/tmp/models");
        assert_ne!(
            ArtifactBundle::path_for(dir, Operation::Sale),
            ArtifactBundle::path_for(dir, Operation::Rental)
        );
    }
}
