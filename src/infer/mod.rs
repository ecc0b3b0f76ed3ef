//! Prediction service
//!
//! Holds one trained model per operation and answers point queries. A
//! query carries raw listing attributes plus coordinates; the service
//! reproduces the training-time feature layout, resolves the location
//! against the learned vocabulary (falling back to the geographically
//! nearest known geohash), and returns rounded price and costs.

use crate::data::Operation;
use crate::features::PropertyType;
use crate::geo;
use crate::model::{ArtifactBundle, PriceModel};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// One listing to price
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionQuery {
    pub size: f64,
    pub dorms: f64,
    pub toilets: f64,
    pub garage: f64,
    /// Integer property-type code, validated against the known scheme
    pub property_type: u8,
    /// Amenity names; matched against the training-time indicator columns
    pub amenities: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Rounded model output in original units
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub predicted_price: f64,
    pub predicted_additional_costs: f64,
    /// Geohash the query actually resolved to; differs from the query
    /// position when the nearest-known fallback fired
    pub location: LocationMatch,
}

/// How the query position mapped onto the location vocabulary
#[derive(Debug, Clone, PartialEq)]
pub enum LocationMatch {
    /// The query's own geohash was seen at training time
    Exact(String),
    /// Unseen geohash resolved to the nearest one in the vocabulary
    Nearest { queried: String, resolved: String },
}

/// In-memory registry of trained models, one per operation
#[derive(Debug, Default)]
pub struct InferenceService {
    models: HashMap<Operation, PriceModel>,
}

impl InferenceService {
    /// Empty service with no models loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Load whichever artifact bundles exist under the directory
    ///
    /// A missing bundle is not an error here; predicting against the
    /// missing operation reports [`Error::ModelsNotLoaded`] later.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut service = Self::new();
        for operation in [Operation::Sale, Operation::Rental] {
            match ArtifactBundle::load(dir, operation) {
                Ok(bundle) => {
                    service.insert(operation, bundle.to_model()?);
                }
                Err(Error::ModelsNotLoaded(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(service)
    }

    /// Register a freshly trained model
    pub fn insert(&mut self, operation: Operation, model: PriceModel) {
        self.models.insert(operation, model);
    }

    /// Whether a model is available for the operation
    pub fn has_model(&self, operation: Operation) -> bool {
        self.models.contains_key(&operation)
    }

    /// Price one listing
    pub fn predict(&self, operation: Operation, query: &PredictionQuery) -> Result<Prediction> {
        let model = self
            .models
            .get(&operation)
            .ok_or_else(|| Error::ModelsNotLoaded(operation.to_string()))?;

        query.validate()?;
        PropertyType::from_code(query.property_type)?;

        let geohash = geo::encode(query.latitude, query.longitude, geo::GEOHASH_PRECISION)?;
        let (label, location) = if model.encoder.contains(&geohash) {
            (geohash.clone(), LocationMatch::Exact(geohash))
        } else {
            let resolved = geo::nearest_known(&geohash, model.encoder.classes())?.to_string();
            (resolved.clone(), LocationMatch::Nearest { queried: geohash, resolved })
        };
        let location_id = model.encoder.encode(&label)?;

        let extras: Vec<f64> = model
            .extra_feature_columns
            .iter()
            .map(|col| {
                let hit = query.amenities.iter().any(|a| a.trim() == col);
                if hit {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        let base = model.assemble_base(
            query.size,
            query.dorms,
            query.toilets,
            query.garage,
            f64::from(query.property_type),
            &extras,
        )?;
        let (price, costs) = model.predict(&base, location_id);

        Ok(Prediction {
            predicted_price: price.round(),
            predicted_additional_costs: costs.round(),
            location,
        })
    }
}

impl PredictionQuery {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("size", self.size),
            ("dorms", self.dorms),
            ("toilets", self.toilets),
            ("garage", self.garage),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(Error::ColumnType(name.to_string(), "non-negative finite number"));
            }
        }
        if self.size == 0.0 {
            return Err(Error::ColumnType("size".to_string(), "positive number"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, Frame};
    use crate::model::{self, TrainConfig};
    use crate::pipeline::Preprocessed;

    /// Two spatial groups with distinct price levels
    fn trained_service() -> (InferenceService, Vec<String>) {
        let n = 120;
        let mut lat = Vec::new();
        let mut lng = Vec::new();
        for i in 0..n {
            if i % 2 == 0 {
                lat.push(-23.5505);
                lng.push(-46.6333);
            } else {
                lat.push(-23.5615);
                lng.push(-46.6562);
            }
        }
        let hashes: Vec<Option<String>> = lat
            .iter()
            .zip(&lng)
            .map(|(&la, &ln)| Some(geo::encode(la, ln, geo::GEOHASH_PRECISION).unwrap()))
            .collect();
        let distinct: Vec<String> = {
            let mut v: Vec<String> = hashes.iter().flatten().cloned().collect();
            v.sort();
            v.dedup();
            v
        };

        let frame = Frame::new()
            .with_column(
                "size",
                Column::Float((0..n).map(|i| 50.0 + (i % 10) as f64 * 12.0).collect()),
            )
            .unwrap()
            .with_column("dorms", Column::Float((0..n).map(|i| 1.0 + (i % 3) as f64).collect()))
            .unwrap()
            .with_column("toilets", Column::Float((0..n).map(|i| 1.0 + (i % 2) as f64).collect()))
            .unwrap()
            .with_column("garage", Column::Float((0..n).map(|i| (i % 2) as f64).collect()))
            .unwrap()
            .with_column(
                "price",
                Column::Float(
                    (0..n)
                        .map(|i| 250_000.0 + (i % 10) as f64 * 20_000.0 + (i % 2) as f64 * 80_000.0)
                        .collect(),
                ),
            )
            .unwrap()
            .with_column(
                "additional_costs",
                Column::Float((0..n).map(|i| 200.0 + (i % 10) as f64 * 30.0).collect()),
            )
            .unwrap()
            .with_column("type", Column::Float((0..n).map(|i| (i % 2) as f64).collect()))
            .unwrap()
            .with_column("location", Column::Str(hashes))
            .unwrap();

        let prep = Preprocessed {
            frame,
            operation: Operation::Sale,
            extra_feature_columns: vec![],
            cluster_k: None,
        };
        let config =
            TrainConfig { epochs: 15, hidden: 8, embedding_dim: 3, ..TrainConfig::default() };
        let model = model::train(&prep, &config).unwrap();

        let mut service = InferenceService::new();
        service.insert(Operation::Sale, model);
        (service, distinct)
    }

    fn query(lat: f64, lng: f64) -> PredictionQuery {
        PredictionQuery {
            size: 80.0,
            dorms: 2.0,
            toilets: 1.0,
            garage: 1.0,
            property_type: 1,
            amenities: vec![],
            latitude: lat,
            longitude: lng,
        }
    }

    #[test]
    fn test_predict_known_location_is_exact() {
        let (service, known) = trained_service();
        let prediction = service.predict(Operation::Sale, &query(-23.5505, -46.6333)).unwrap();
        match &prediction.location {
            LocationMatch::Exact(gh) => assert!(known.contains(gh)),
            other => panic!("expected exact match, got {other:?}"),
        }
        assert_eq!(prediction.predicted_price, prediction.predicted_price.round());
    }

    #[test]
    fn test_predict_unseen_location_falls_back_to_nearest() {
        let (service, known) = trained_service();
        // A point a few hundred meters from the first training group
        let prediction = service.predict(Operation::Sale, &query(-23.5530, -46.6310)).unwrap();
        match &prediction.location {
            LocationMatch::Nearest { queried, resolved } => {
                assert!(!known.contains(queried));
                assert!(known.contains(resolved));
            }
            other => panic!("expected nearest fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_predict_without_model_is_an_error() {
        let (service, _) = trained_service();
        assert!(matches!(
            service.predict(Operation::Rental, &query(-23.55, -46.63)),
            Err(Error::ModelsNotLoaded(op)) if op == "rental"
        ));
    }

    #[test]
    fn test_predict_unknown_type_code_rejected() {
        let (service, _) = trained_service();
        let mut q = query(-23.5505, -46.6333);
        q.property_type = 99;
        assert!(matches!(
            service.predict(Operation::Sale, &q),
            Err(Error::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_predict_zero_size_rejected() {
        let (service, _) = trained_service();
        let mut q = query(-23.5505, -46.6333);
        q.size = 0.0;
        assert!(service.predict(Operation::Sale, &q).is_err());
    }

    #[test]
    fn test_from_dir_with_empty_dir_has_no_models() {
        let dir = tempfile::tempdir().unwrap();
        let service = InferenceService::from_dir(dir.path()).unwrap();
        assert!(!service.has_model(Operation::Sale));
        assert!(!service.has_model(Operation::Rental));
    }
}
