//! Feature engineering stages
//!
//! Categorical type codes, amenity indicator columns, price-per-area,
//! and correlation-based pruning of derived features.

use crate::data::CORE_COLUMNS;
use crate::frame::{Column, Frame};
use crate::stats::pearson;
use crate::{Error, Result};

/// Property type codes shared by training labels and inference queries
///
/// `Unclassified` is the explicit catch-all for labels outside the
/// mapping table; keeping it as a named variant separates "known other"
/// from a mapping bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    Commercial,
    Farm,
    Unclassified,
}

impl PropertyType {
    /// Integer code used as a model feature
    pub fn code(&self) -> u8 {
        match self {
            PropertyType::House => 0,
            PropertyType::Apartment => 1,
            PropertyType::Land => 2,
            PropertyType::Commercial => 3,
            PropertyType::Farm => 4,
            PropertyType::Unclassified => 5,
        }
    }

    /// Recover a type from its code; inference rejects codes outside the
    /// training-time scheme instead of coercing
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(PropertyType::House),
            1 => Ok(PropertyType::Apartment),
            2 => Ok(PropertyType::Land),
            3 => Ok(PropertyType::Commercial),
            4 => Ok(PropertyType::Farm),
            5 => Ok(PropertyType::Unclassified),
            other => Err(Error::UnknownCategory(format!("property type code {other}"))),
        }
    }

    /// Map a portal label to its type
    ///
    /// The table is fixed: it defines the training labels. Missing and
    /// unmapped labels deliberately coerce to `Unclassified`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("Casa") | Some("Casa de Condomínio") | Some("Sobrado") => PropertyType::House,
            Some("Apartamento") | Some("Cobertura") | Some("Flat")
            | Some("Kitnet/Conjugado") => PropertyType::Apartment,
            Some("Lote/Terreno") => PropertyType::Land,
            Some("Edifício Residencial")
            | Some("Consultório")
            | Some("Galpão/Depósito/Armazém")
            | Some("Imóvel Comercial")
            | Some("Ponto Comercial/Loja/Box")
            | Some("Sala/Conjunto")
            | Some("Prédio/Edifício Inteiro") => PropertyType::Commercial,
            Some("Fazenda/Sítios/Chácaras") => PropertyType::Farm,
            _ => PropertyType::Unclassified,
        }
    }
}

/// Replace the free-text `type` column with its integer code
pub fn map_types(frame: &Frame) -> Result<Frame> {
    let labels = frame.strs("type")?;
    let codes: Vec<f64> =
        labels.iter().map(|l| PropertyType::from_label(l.as_deref()).code() as f64).collect();
    frame.clone().with_column("type", Column::Float(codes))
}

/// Build the dataset-wide amenity vocabulary from the `features` column
///
/// Tokens are comma-separated, trimmed, deduplicated, and sorted so the
/// vocabulary (and therefore the feature layout) is deterministic for a
/// given dataset. The vocabulary must be persisted with the model: it is
/// data-dependent, never a fixed schema.
pub fn amenity_vocabulary(frame: &Frame) -> Result<Vec<String>> {
    let texts = frame.strs("features")?;
    let mut vocab: Vec<String> = texts
        .iter()
        .flatten()
        .flat_map(|t| t.split(','))
        .map(|tok| tok.trim().to_string())
        .filter(|tok| !tok.is_empty())
        .collect();
    vocab.sort();
    vocab.dedup();
    Ok(vocab)
}

/// Explode the `features` column into one binary column per vocabulary
/// token, then drop the source column
pub fn explode_amenities(frame: &Frame, vocabulary: &[String]) -> Result<Frame> {
    let texts = frame.strs("features")?;

    let row_tokens: Vec<Vec<String>> = texts
        .iter()
        .map(|t| {
            t.as_deref()
                .map(|s| {
                    s.split(',')
                        .map(|tok| tok.trim().to_string())
                        .filter(|tok| !tok.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let mut out = frame.clone();
    for token in vocabulary {
        let indicator: Vec<f64> = row_tokens
            .iter()
            .map(|tokens| if tokens.contains(token) { 1.0 } else { 0.0 })
            .collect();
        out = out.with_column(token.clone(), Column::Float(indicator))?;
    }
    Ok(out.drop_columns(&["features"]))
}

/// Add `price_per_area = price / size`
///
/// Zero-size rows must be filtered upstream; reaching this stage with one
/// is a pipeline bug surfaced as an error, not an infinity in the data.
pub fn price_per_area(frame: &Frame) -> Result<Frame> {
    let price = frame.floats("price")?;
    let size = frame.floats("size")?;
    if size.iter().any(|&s| s <= 0.0) {
        return Err(Error::DegenerateStatistics(
            "zero-size row reached price_per_area".to_string(),
        ));
    }
    let ratio: Vec<f64> = price.iter().zip(size).map(|(&p, &s)| p / s).collect();
    frame.clone().with_column("price_per_area", Column::Float(ratio))
}

/// Drop derived numeric columns weakly correlated with the target
///
/// Core columns are always retained regardless of correlation. A
/// zero-variance target makes every correlation undefined and is a hard
/// error; a zero-variance derived column carries no signal and is
/// dropped with a warning.
pub fn prune_low_correlation(frame: &Frame, target: &str, threshold: f64) -> Result<Frame> {
    let target_col = frame.floats(target)?.to_vec();

    let candidates: Vec<String> = frame
        .float_names()
        .iter()
        .filter(|&&name| !CORE_COLUMNS.contains(&name) && name != target)
        .map(|s| s.to_string())
        .collect();

    let mut to_drop: Vec<String> = Vec::new();
    for name in &candidates {
        let col = frame.floats(name)?;
        let r = pearson(col, &target_col);
        if r.is_nan() {
            // Distinguish "target is flat" from "this column is flat"
            let t_mean = target_col.iter().sum::<f64>() / target_col.len() as f64;
            if target_col.iter().all(|&v| (v - t_mean).abs() < f64::EPSILON) {
                return Err(Error::DegenerateStatistics(format!(
                    "target '{target}' has zero variance"
                )));
            }
            eprintln!("Warning: dropping zero-variance feature column '{name}'");
            to_drop.push(name.clone());
        } else if r.abs() < threshold {
            to_drop.push(name.clone());
        }
    }

    let refs: Vec<&str> = to_drop.iter().map(|s| s.as_str()).collect();
    Ok(frame.clone().drop_columns(&refs))
}
