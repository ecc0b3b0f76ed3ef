//! Unsupervised location clustering
//!
//! Standardized (latitude, longitude) pairs are partitioned with seeded
//! k-means; the cluster count comes from the elbow of the WCSS curve
//! unless the caller pins k. Cluster ids are opaque: same id means same
//! learned spatial group for this run only. Assignments are not stable
//! across runs unless seed and k are reused.

mod summary;

pub use summary::summarize_by_cluster;

use crate::frame::{Column, Frame};
use crate::stats::StandardScaler;
use crate::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Default random seed for reproducible clustering within a run
pub const DEFAULT_SEED: u64 = 0;

/// Upper bound (exclusive) on the k values tried by elbow selection
pub const DEFAULT_K_LIMIT: usize = 20;

const MAX_ITER: usize = 300;
const N_INIT: usize = 10;

/// Fitted k-means result
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster centers, one row per cluster
    pub centroids: Array2<f64>,
    /// Cluster id per input row
    pub labels: Vec<usize>,
    /// Within-cluster sum of squares
    pub wcss: f64,
}

/// Extract and standardize the coordinate columns of a frame
///
/// The scaler is fit on the current dataset only; nothing here persists
/// across runs.
pub fn standardize_coords(frame: &Frame) -> Result<Array2<f64>> {
    let lat = frame.floats("latitude")?;
    let lng = frame.floats("longitude")?;
    if lat.is_empty() {
        return Err(Error::EmptyInput("no rows to standardize".to_string()));
    }

    let scaler = StandardScaler::fit(&[lat, lng]);
    let lat_scaled = scaler.transform_column(0, lat);
    let lng_scaled = scaler.transform_column(1, lng);

    let mut coords = Array2::zeros((lat.len(), 2));
    for i in 0..lat.len() {
        coords[[i, 0]] = lat_scaled[i];
        coords[[i, 1]] = lng_scaled[i];
    }
    Ok(coords)
}

/// Lloyd's algorithm, best of several seeded Forgy initializations
///
/// Runs `N_INIT` restarts with seeds derived from `seed` and keeps the
/// fit with the lowest WCSS, so a single unlucky initialization cannot
/// distort the elbow curve.
pub fn kmeans(points: &Array2<f64>, k: usize, seed: u64) -> Result<KMeansFit> {
    let mut best: Option<KMeansFit> = None;
    for attempt in 0..N_INIT {
        let fit = kmeans_once(points, k, seed.wrapping_add(attempt as u64))?;
        if best.as_ref().map_or(true, |b| fit.wcss < b.wcss) {
            best = Some(fit);
        }
    }
    Ok(best.expect("N_INIT > 0"))
}

/// A single Lloyd run; an empty cluster is re-seeded with the point
/// farthest from its centroid so the fit always produces exactly k groups
fn kmeans_once(points: &Array2<f64>, k: usize, seed: u64) -> Result<KMeansFit> {
    let n = points.nrows();
    if k == 0 {
        return Err(Error::DegenerateStatistics("k must be at least 1".to_string()));
    }
    if n < k {
        return Err(Error::EmptyInput(format!("{n} rows cannot form {k} clusters")));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let dims = points.ncols();
    let mut centroids = Array2::zeros((k, dims));
    for (c, &idx) in indices.iter().take(k).enumerate() {
        centroids.row_mut(c).assign(&points.row(idx));
    }

    let mut labels = vec![0usize; n];
    for _ in 0..MAX_ITER {
        // Assignment step
        let mut changed = false;
        for i in 0..n {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for c in 0..k {
                let dist: f64 = points
                    .row(i)
                    .iter()
                    .zip(centroids.row(c))
                    .map(|(p, q)| (p - q).powi(2))
                    .sum();
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            if labels[i] != best {
                labels[i] = best;
                changed = true;
            }
        }

        // Update step
        let mut sums = Array2::<f64>::zeros((k, dims));
        let mut counts = vec![0usize; k];
        for i in 0..n {
            let c = labels[i];
            counts[c] += 1;
            for d in 0..dims {
                sums[[c, d]] += points[[i, d]];
            }
        }
        for c in 0..k {
            if counts[c] == 0 {
                // Re-seed the empty cluster with the worst-fit point
                let farthest = (0..n)
                    .max_by(|&a, &b| {
                        let da = point_dist(points, a, &centroids, labels[a]);
                        let db = point_dist(points, b, &centroids, labels[b]);
                        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .expect("n >= k >= 1");
                centroids.row_mut(c).assign(&points.row(farthest));
                changed = true;
            } else {
                for d in 0..dims {
                    centroids[[c, d]] = sums[[c, d]] / counts[c] as f64;
                }
            }
        }

        if !changed {
            break;
        }
    }

    let wcss = (0..n).map(|i| point_dist(points, i, &centroids, labels[i])).sum();
    Ok(KMeansFit { centroids, labels, wcss })
}

fn point_dist(points: &Array2<f64>, i: usize, centroids: &Array2<f64>, c: usize) -> f64 {
    points.row(i).iter().zip(centroids.row(c)).map(|(p, q)| (p - q).powi(2)).sum()
}

/// WCSS for every k in `[1, k_limit)`
pub fn wcss_curve(points: &Array2<f64>, k_limit: usize, seed: u64) -> Result<Vec<f64>> {
    let max_k = k_limit.min(points.nrows() + 1);
    (1..max_k).map(|k| Ok(kmeans(points, k, seed)?.wcss)).collect()
}

/// Pick k at the elbow of a convex, decreasing WCSS curve
///
/// Kneedle-style: normalize the curve to the unit square and take the k
/// whose point lies farthest below the chord between the endpoints. An
/// ambiguous curve (too short, flat, or with no point below the chord)
/// yields `Error::NoElbow`; the caller decides on a k, not this code.
pub fn choose_k(points: &Array2<f64>, k_limit: usize, seed: u64) -> Result<usize> {
    let wcss = wcss_curve(points, k_limit, seed)?;
    elbow_of(&wcss).ok_or(Error::NoElbow { k_limit })
}

/// Elbow index (as a k value, 1-based) of a WCSS curve, if one exists
pub fn elbow_of(wcss: &[f64]) -> Option<usize> {
    if wcss.len() < 3 {
        return None;
    }
    let first = wcss[0];
    let last = wcss[wcss.len() - 1];
    let y_span = first - last;
    if y_span <= 0.0 || !y_span.is_finite() {
        return None;
    }
    let x_span = (wcss.len() - 1) as f64;

    let mut best: Option<(usize, f64)> = None;
    for (i, &y) in wcss.iter().enumerate() {
        let x_norm = i as f64 / x_span;
        let y_norm = (y - last) / y_span; // 1 at k=1, 0 at the end
        let chord = 1.0 - x_norm;
        let below = chord - y_norm;
        if below > 0.0 && best.map_or(true, |(_, b)| below > b) {
            best = Some((i, below));
        }
    }
    best.map(|(i, _)| i + 1)
}

/// Assign a cluster id column to the frame
///
/// With `k` unset the elbow pick runs first; the chosen k is returned
/// alongside the new frame.
pub fn assign_clusters(
    frame: &Frame,
    k: Option<usize>,
    k_limit: usize,
    seed: u64,
) -> Result<(Frame, usize)> {
    let coords = standardize_coords(frame)?;
    let k = match k {
        Some(k) => k,
        None => choose_k(&coords, k_limit, seed)?,
    };
    let fit = kmeans(&coords, k, seed)?;
    let labels: Vec<f64> = fit.labels.iter().map(|&l| l as f64).collect();
    let out = frame.clone().with_column("location", Column::Float(labels))?;
    Ok((out, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well-separated blobs of points
    fn blobs() -> Array2<f64> {
        let mut rows = Vec::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.01;
            rows.push([0.0 + jitter, 0.0 + jitter]);
            rows.push([10.0 + jitter, 10.0 - jitter]);
            rows.push([-10.0 - jitter, 10.0 + jitter]);
        }
        let mut arr = Array2::zeros((rows.len(), 2));
        for (i, r) in rows.iter().enumerate() {
            arr[[i, 0]] = r[0];
            arr[[i, 1]] = r[1];
        }
        arr
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let points = blobs();
        let fit = kmeans(&points, 3, DEFAULT_SEED).unwrap();
        // Points 0, 1, 2 are in different blobs; labels must differ
        assert_ne!(fit.labels[0], fit.labels[1]);
        assert_ne!(fit.labels[1], fit.labels[2]);
        assert_ne!(fit.labels[0], fit.labels[2]);
        // Same blob, same label
        assert_eq!(fit.labels[0], fit.labels[3]);
    }

    #[test]
    fn test_kmeans_deterministic_for_seed() {
        let points = blobs();
        let a = kmeans(&points, 3, 7).unwrap();
        let b = kmeans(&points, 3, 7).unwrap();
        assert_eq!(a.labels, b.labels);
        assert!((a.wcss - b.wcss).abs() < 1e-12);
    }

    #[test]
    fn test_kmeans_k_larger_than_n_fails() {
        let points = Array2::zeros((2, 2));
        assert!(kmeans(&points, 3, 0).is_err());
        assert!(kmeans(&points, 0, 0).is_err());
    }

    #[test]
    fn test_wcss_decreases_with_k() {
        let points = blobs();
        let curve = wcss_curve(&points, 6, DEFAULT_SEED).unwrap();
        for w in curve.windows(2) {
            assert!(w[1] <= w[0] + 1e-9, "WCSS must not increase with k: {curve:?}");
        }
    }

    #[test]
    fn test_elbow_finds_knee_at_three() {
        let points = blobs();
        let k = choose_k(&points, 10, DEFAULT_SEED).unwrap();
        assert_eq!(k, 3);
    }

    #[test]
    fn test_elbow_of_flat_curve_is_none() {
        assert_eq!(elbow_of(&[5.0, 5.0, 5.0, 5.0]), None);
        assert_eq!(elbow_of(&[1.0, 2.0]), None);
    }

    #[test]
    fn test_elbow_of_linear_curve_is_none() {
        // A perfectly linear decrease has no point below the chord
        assert_eq!(elbow_of(&[4.0, 3.0, 2.0, 1.0, 0.0]), None);
    }

    #[test]
    fn test_standardize_coords_zero_mean() {
        let frame = Frame::new()
            .with_column("latitude", Column::Float(vec![-23.5, -23.6, -23.7]))
            .unwrap()
            .with_column("longitude", Column::Float(vec![-46.6, -46.7, -46.8]))
            .unwrap();
        let coords = standardize_coords(&frame).unwrap();
        let lat_sum: f64 = coords.column(0).sum();
        let lng_sum: f64 = coords.column(1).sum();
        assert!(lat_sum.abs() < 1e-9);
        assert!(lng_sum.abs() < 1e-9);
    }

    #[test]
    fn test_assign_clusters_with_pinned_k() {
        let frame = Frame::new()
            .with_column(
                "latitude",
                Column::Float((0..30).map(|i| -23.5 - (i % 3) as f64).collect()),
            )
            .unwrap()
            .with_column(
                "longitude",
                Column::Float((0..30).map(|i| -46.6 + (i % 3) as f64).collect()),
            )
            .unwrap();
        let (clustered, k) = assign_clusters(&frame, Some(3), DEFAULT_K_LIMIT, 0).unwrap();
        assert_eq!(k, 3);
        let ids = clustered.floats("location").unwrap();
        let distinct: std::collections::HashSet<u64> = ids.iter().map(|&v| v as u64).collect();
        assert_eq!(distinct.len(), 3);
    }
}
