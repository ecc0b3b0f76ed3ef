//! Listing records and their tabular form
//!
//! The crate does not fetch anything itself: an external data-access
//! collaborator hands over a batch of [`Listing`] values scraped from a
//! real-estate portal, and [`frame_from_listings`] turns that batch into
//! the [`Frame`](crate::frame::Frame) the pipeline stages consume.

use crate::frame::{Column, Frame};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Columns carried by the raw listing frame
pub const RAW_COLUMNS: [&str; 17] = [
    "id",
    "link",
    "operation",
    "type",
    "size",
    "dorms",
    "toilets",
    "garage",
    "price",
    "additional_costs",
    "features",
    "street",
    "neighborhood",
    "city",
    "state",
    "latitude",
    "longitude",
];

/// Columns the preprocessing pipeline cannot run without
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "operation",
    "type",
    "size",
    "dorms",
    "toilets",
    "garage",
    "price",
    "additional_costs",
    "features",
    "latitude",
    "longitude",
];

/// Administrative and identifying columns dropped before feature work
pub const ADMIN_COLUMNS: [&str; 9] = [
    "id",
    "link",
    "operation",
    "street",
    "neighborhood",
    "city",
    "state",
    "page_id",
    "scraping_date",
];

/// Columns always retained by correlation pruning
pub const CORE_COLUMNS: [&str; 8] =
    ["size", "dorms", "toilets", "garage", "price", "additional_costs", "type", "location"];

/// The market operation a listing belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Sale,
    Rental,
}

impl Operation {
    /// Namespace key used for artifact bundles
    pub fn namespace(&self) -> &'static str {
        match self {
            Operation::Sale => "sale",
            Operation::Rental => "rental",
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sale" => Ok(Operation::Sale),
            "rental" => Ok(Operation::Rental),
            other => Err(Error::UnknownCategory(format!("operation '{other}'"))),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.namespace())
    }
}

/// One scraped real-estate ad
///
/// Numeric attributes are non-negative by contract; a record whose
/// position did not geocode carries `latitude`/`longitude` of 0.0 and is
/// excluded from every location-dependent stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    #[serde(default)]
    pub link: Option<String>,
    pub operation: String,
    /// Free-text Portuguese property-type label
    #[serde(rename = "type")]
    pub type_label: Option<String>,
    pub size: f64,
    pub dorms: f64,
    pub toilets: f64,
    pub garage: f64,
    pub price: f64,
    pub additional_costs: f64,
    /// Comma-separated amenity list
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Listing {
    /// Check the non-negativity invariant on numeric attributes
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("size", self.size),
            ("dorms", self.dorms),
            ("toilets", self.toilets),
            ("garage", self.garage),
            ("price", self.price),
            ("additional_costs", self.additional_costs),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(Error::ColumnType(name.to_string(), "non-negative finite number"));
            }
        }
        Ok(())
    }
}

/// Build the raw listing frame from a batch of records
///
/// Fails fast on an empty batch or any record violating the
/// non-negativity invariant, before any downstream stage runs.
pub fn frame_from_listings(listings: &[Listing]) -> Result<Frame> {
    if listings.is_empty() {
        return Err(Error::EmptyInput("no listing records".to_string()));
    }
    for listing in listings {
        listing.validate()?;
    }

    let text = |f: fn(&Listing) -> Option<String>| {
        Column::Str(listings.iter().map(f).collect())
    };
    let numeric = |f: fn(&Listing) -> f64| Column::Float(listings.iter().map(f).collect());

    Frame::new()
        .with_column("id", Column::Str(listings.iter().map(|l| Some(l.id.clone())).collect()))?
        .with_column("link", text(|l| l.link.clone()))?
        .with_column(
            "operation",
            Column::Str(listings.iter().map(|l| Some(l.operation.clone())).collect()),
        )?
        .with_column("type", text(|l| l.type_label.clone()))?
        .with_column("size", numeric(|l| l.size))?
        .with_column("dorms", numeric(|l| l.dorms))?
        .with_column("toilets", numeric(|l| l.toilets))?
        .with_column("garage", numeric(|l| l.garage))?
        .with_column("price", numeric(|l| l.price))?
        .with_column("additional_costs", numeric(|l| l.additional_costs))?
        .with_column("features", text(|l| l.features.clone()))?
        .with_column("street", text(|l| l.street.clone()))?
        .with_column("neighborhood", text(|l| l.neighborhood.clone()))?
        .with_column("city", text(|l| l.city.clone()))?
        .with_column("state", text(|l| l.state.clone()))?
        .with_column("latitude", numeric(|l| l.latitude))?
        .with_column("longitude", numeric(|l| l.longitude))
}

/// Read a listing batch from a JSON array file
pub fn listings_from_json(path: impl AsRef<std::path::Path>) -> Result<Vec<Listing>> {
    let raw = std::fs::read_to_string(path)?;
    let listings: Vec<Listing> = serde_json::from_str(&raw)?;
    Ok(listings)
}
