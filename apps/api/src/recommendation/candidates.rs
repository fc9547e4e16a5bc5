//! Candidate Generator: deterministic grid of sites covering a district.

use serde::{Deserialize, Serialize};

use crate::models::district::DistrictBounds;
use crate::recommendation::errors::RecommendError;

/// A point considered for a new facility. Never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateSite {
    pub latitude: f64,
    pub longitude: f64,
}

/// Produces exactly `count` sites at the centres of a near-square grid laid
/// over `bounds`.
///
/// Columns scale with the aspect ratio of the box so cells stay roughly square:
/// `cols = ceil(sqrt(count * lon_span / lat_span))`, clamped to `1..=count`,
/// `rows = ceil(count / cols)`. Cells are emitted south→north, west→east and
/// the sequence is cut at `count`. No randomness: identical inputs always give
/// the identical sequence.
pub fn generate_candidates(
    bounds: &DistrictBounds,
    count: usize,
) -> Result<Vec<CandidateSite>, RecommendError> {
    bounds.validate().map_err(RecommendError::InvalidBounds)?;
    if count == 0 {
        return Err(RecommendError::InvalidRequest(
            "candidate count must be at least 1".to_string(),
        ));
    }

    let (rows, cols) = grid_shape(bounds, count);
    let lat_step = bounds.lat_span() / rows as f64;
    let lon_step = bounds.lon_span() / cols as f64;

    let sites = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .take(count)
        .map(|(row, col)| CandidateSite {
            latitude: bounds.min_lat + lat_step * (row as f64 + 0.5),
            longitude: bounds.min_lon + lon_step * (col as f64 + 0.5),
        })
        .collect();

    Ok(sites)
}

fn grid_shape(bounds: &DistrictBounds, count: usize) -> (usize, usize) {
    let aspect = bounds.lon_span() / bounds.lat_span();
    // `as usize` saturates, so an extreme aspect ratio still clamps cleanly.
    let cols = ((count as f64 * aspect).sqrt().ceil() as usize).clamp(1, count);
    let rows = count.div_ceil(cols);
    (rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_bounds() -> DistrictBounds {
        DistrictBounds {
            min_lat: -2.0,
            max_lat: -1.9,
            min_lon: 30.0,
            max_lon: 30.15,
        }
    }

    fn strictly_inside(b: &DistrictBounds, s: &CandidateSite) -> bool {
        s.latitude > b.min_lat
            && s.latitude < b.max_lat
            && s.longitude > b.min_lon
            && s.longitude < b.max_lon
    }

    #[test]
    fn test_twenty_distinct_points_inside_district() {
        let bounds = scenario_bounds();
        let sites = generate_candidates(&bounds, 20).unwrap();

        assert_eq!(sites.len(), 20);
        assert!(sites.iter().all(|s| strictly_inside(&bounds, s)));

        for (i, a) in sites.iter().enumerate() {
            for b in &sites[i + 1..] {
                assert_ne!(a, b, "duplicate candidate {a:?}");
            }
        }
    }

    #[test]
    fn test_same_inputs_give_identical_sequence() {
        let bounds = scenario_bounds();
        let first = generate_candidates(&bounds, 17).unwrap();
        let second = generate_candidates(&bounds, 17).unwrap();
        let first_bits: Vec<(u64, u64)> = first
            .iter()
            .map(|s| (s.latitude.to_bits(), s.longitude.to_bits()))
            .collect();
        let second_bits: Vec<(u64, u64)> = second
            .iter()
            .map(|s| (s.latitude.to_bits(), s.longitude.to_bits()))
            .collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_exact_count_for_awkward_sizes() {
        let bounds = DistrictBounds::COUNTRY_DEFAULT;
        for count in [1, 2, 3, 7, 11, 19, 20, 23, 50] {
            let sites = generate_candidates(&bounds, count).unwrap();
            assert_eq!(sites.len(), count, "count {count}");
            assert!(sites.iter().all(|s| strictly_inside(&bounds, s)));
        }
    }

    #[test]
    fn test_single_candidate_is_box_centre() {
        let bounds = scenario_bounds();
        let sites = generate_candidates(&bounds, 1).unwrap();
        assert!((sites[0].latitude - -1.95).abs() < 1e-12);
        assert!((sites[0].longitude - 30.075).abs() < 1e-12);
    }

    #[test]
    fn test_very_wide_box_stays_in_bounds() {
        let bounds = DistrictBounds {
            min_lat: 0.0,
            max_lat: 1e-9,
            min_lon: 0.0,
            max_lon: 10.0,
        };
        let sites = generate_candidates(&bounds, 5).unwrap();
        assert_eq!(sites.len(), 5);
        assert!(sites.iter().all(|s| strictly_inside(&bounds, s)));
    }

    #[test]
    fn test_degenerate_bounds_rejected() {
        let cases = [
            DistrictBounds { min_lat: -1.9, max_lat: -1.9, min_lon: 30.0, max_lon: 30.1 },
            DistrictBounds { min_lat: -1.8, max_lat: -1.9, min_lon: 30.0, max_lon: 30.1 },
            DistrictBounds { min_lat: -2.0, max_lat: -1.9, min_lon: 30.1, max_lon: 30.1 },
            DistrictBounds { min_lat: -2.0, max_lat: -1.9, min_lon: 30.2, max_lon: 30.1 },
        ];
        for bounds in cases {
            assert!(
                matches!(
                    generate_candidates(&bounds, 20),
                    Err(RecommendError::InvalidBounds(_))
                ),
                "{bounds:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(matches!(
            generate_candidates(&scenario_bounds(), 0),
            Err(RecommendError::InvalidRequest(_))
        ));
    }
}
