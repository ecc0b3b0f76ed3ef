//! Per-cluster aggregate table

use crate::frame::{Column, Frame};
use crate::{Error, Result};

/// Aggregate every numeric column by cluster id
///
/// Returns one row per cluster: the id, the row count, and the mean of
/// each other numeric column under a `mean_` prefix. Clusters come out
/// sorted by id.
pub fn summarize_by_cluster(frame: &Frame) -> Result<Frame> {
    let ids = frame.floats("location")?;
    if ids.is_empty() {
        return Err(Error::EmptyInput("no rows to summarize".to_string()));
    }

    let mut clusters: Vec<usize> = ids.iter().map(|&v| v as usize).collect();
    clusters.sort_unstable();
    clusters.dedup();

    let mut counts = Vec::with_capacity(clusters.len());
    for &c in &clusters {
        counts.push(ids.iter().filter(|&&v| v as usize == c).count() as f64);
    }

    let mut out = Frame::new()
        .with_column("location", Column::Float(clusters.iter().map(|&c| c as f64).collect()))?
        .with_column("count", Column::Float(counts))?;

    let names: Vec<String> = frame
        .float_names()
        .iter()
        .filter(|&&n| n != "location")
        .map(|n| n.to_string())
        .collect();
    for name in names {
        let col = frame.floats(&name)?;
        let means: Vec<f64> = clusters
            .iter()
            .map(|&c| {
                let (sum, n) = ids
                    .iter()
                    .zip(col)
                    .filter(|(&id, _)| id as usize == c)
                    .fold((0.0, 0usize), |(s, n), (_, &v)| (s + v, n + 1));
                sum / n as f64
            })
            .collect();
        out = out.with_column(format!("mean_{name}"), Column::Float(means))?;
    }
    Ok(out)
}
