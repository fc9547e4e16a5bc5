use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bounding rectangle of a district, in WGS84 degrees.
///
/// Validated by `DistrictBounds::validate` before any candidate is generated;
/// a value of this type is not guaranteed to be well-formed on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DistrictBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl DistrictBounds {
    /// Whole-country extent used when a district's geometry cannot be looked up.
    pub const COUNTRY_DEFAULT: DistrictBounds = DistrictBounds {
        min_lat: -2.85,
        max_lat: -1.05,
        min_lon: 28.85,
        max_lon: 30.90,
    };

    /// Returns a description of the first violated invariant, if any.
    pub fn validate(&self) -> Result<(), String> {
        let coords = [self.min_lat, self.max_lat, self.min_lon, self.max_lon];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(format!("non-finite coordinate in {self:?}"));
        }
        if self.min_lat >= self.max_lat {
            return Err(format!(
                "min_lat ({}) must be less than max_lat ({})",
                self.min_lat, self.max_lat
            ));
        }
        if self.min_lon >= self.max_lon {
            return Err(format!(
                "min_lon ({}) must be less than max_lon ({})",
                self.min_lon, self.max_lon
            ));
        }
        Ok(())
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Inclusive containment check.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lon..=self.max_lon).contains(&longitude)
    }
}

/// Aggregate view of a district fed to the recommendation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictAnalysis {
    pub district_id: i32,
    pub district_name: String,
    pub bounds: DistrictBounds,
    pub population: i64,
    pub facility_count: i64,
    /// Mean travel time to the nearest facility, when surveyed.
    pub avg_travel_time_minutes: Option<f64>,
    pub target_travel_time_minutes: f64,
}

/// Row shape of the `districts` table joined with its facility count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DistrictStatsRow {
    pub id: i32,
    pub name: String,
    pub population: i64,
    pub avg_travel_time_minutes: Option<f64>,
    pub target_travel_time_minutes: Option<f64>,
    pub facility_count: i64,
}
