//! Geohash codec and geographic constants
//!
//! Locations are keyed by an 8-character geohash: a deterministic base-32
//! encoding of a (latitude, longitude) pair. Unlike a clustering id, the
//! key is stable across training runs, which makes it usable as an
//! embedding vocabulary. Decoding returns the cell center.

use crate::{Error, Result};

/// Geohash precision used for location keys
pub const GEOHASH_PRECISION: usize = 8;

/// Kilometers per degree of latitude
pub const KM_PER_DEG_LAT: f64 = 110.574;

/// Kilometers per degree of longitude at the given mean latitude
pub fn km_per_deg_lng(mean_lat: f64) -> f64 {
    111.320 * mean_lat.to_radians().cos()
}

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

fn base32_index(c: u8) -> Option<usize> {
    BASE32.iter().position(|&b| b == c.to_ascii_lowercase())
}

/// Encode a coordinate pair as a geohash of the given precision
pub fn encode(lat: f64, lng: f64, precision: usize) -> Result<String> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(Error::InvalidCoordinate { lat, lng });
    }

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut bits = 0u8;
    let mut value = 0usize;
    let mut even_bit = true; // longitude first

    while hash.len() < precision {
        if even_bit {
            let mid = (lng_lo + lng_hi) / 2.0;
            if lng >= mid {
                value = (value << 1) | 1;
                lng_lo = mid;
            } else {
                value <<= 1;
                lng_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if lat >= mid {
                value = (value << 1) | 1;
                lat_lo = mid;
            } else {
                value <<= 1;
                lat_hi = mid;
            }
        }
        even_bit = !even_bit;
        bits += 1;
        if bits == 5 {
            hash.push(BASE32[value] as char);
            bits = 0;
            value = 0;
        }
    }

    Ok(hash)
}

/// Decode a geohash to the center of its cell
pub fn decode(hash: &str) -> Result<(f64, f64)> {
    if hash.is_empty() {
        return Err(Error::UnknownCategory("empty geohash".to_string()));
    }

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let mut even_bit = true;

    for c in hash.bytes() {
        let value = base32_index(c)
            .ok_or_else(|| Error::UnknownCategory(format!("geohash character '{}'", c as char)))?;
        for shift in (0..5).rev() {
            let bit = (value >> shift) & 1;
            if even_bit {
                let mid = (lng_lo + lng_hi) / 2.0;
                if bit == 1 {
                    lng_lo = mid;
                } else {
                    lng_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if bit == 1 {
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            even_bit = !even_bit;
        }
    }

    Ok(((lat_lo + lat_hi) / 2.0, (lng_lo + lng_hi) / 2.0))
}

/// Find the known geohash whose decoded center is Euclidean-nearest to
/// the query's decoded center
///
/// This is the degraded-but-successful fallback for locations never seen
/// during training: prediction quality drops, the call still succeeds.
pub fn nearest_known<'a>(query: &str, known: &'a [String]) -> Result<&'a str> {
    if known.is_empty() {
        return Err(Error::EmptyInput("no known geohashes to fall back to".to_string()));
    }
    let (qlat, qlng) = decode(query)?;

    let mut best: Option<(&str, f64)> = None;
    for candidate in known {
        let (lat, lng) = decode(candidate)?;
        let dist = ((qlat - lat).powi(2) + (qlng - lng).powi(2)).sqrt();
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((candidate, dist));
        }
    }
    Ok(best.expect("known is non-empty").0)
}
