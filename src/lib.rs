//! Avaliar: real-estate price estimation from scraped listings
//!
//! The crate takes a batch of scraped listing records through a
//! deterministic preprocessing pipeline (cleaning, geographic and
//! statistical outlier rejection, geohash location encoding, amenity
//! feature derivation), trains a chained pair of neural estimators with
//! a learned location embedding, persists them as JSON artifact bundles,
//! and answers point price queries with a nearest-known-location
//! fallback for unseen positions.
//!
//! # Example
//!
//! ```no_run
//! use avaliar::data::{frame_from_listings, listings_from_json};
//! use avaliar::model::{self, ArtifactBundle, TrainConfig};
//! use avaliar::pipeline::{preprocess, PreprocessConfig};
//!
//! # fn main() -> avaliar::Result<()> {
//! let listings = listings_from_json("listings.json")?;
//! let frame = frame_from_listings(&listings)?;
//! let prep = preprocess(&frame, &PreprocessConfig::default())?;
//! let trained = model::train(&prep, &TrainConfig::default())?;
//! ArtifactBundle::from_model(&trained, prep.operation).save("models".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cluster;
pub mod data;
mod error;
pub mod features;
pub mod frame;
pub mod geo;
pub mod infer;
pub mod model;
pub mod outlier;
pub mod pipeline;
pub mod stats;

pub use error::{Error, Result};
