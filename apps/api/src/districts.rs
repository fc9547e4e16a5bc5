use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::district::{DistrictAnalysis, DistrictBounds, DistrictStatsRow};

/// Travel-time goal used when a district has none recorded.
pub const DEFAULT_TARGET_TRAVEL_TIME_MINUTES: f64 = 30.0;

/// Bounding box of the district geometry, `None` when the district has no geometry.
pub async fn fetch_district_bounds(pool: &PgPool, district_id: i32) -> Result<Option<DistrictBounds>> {
    let bounds = sqlx::query_as::<_, DistrictBounds>(
        r#"
        SELECT ST_YMin(geom::box2d) AS min_lat,
               ST_YMax(geom::box2d) AS max_lat,
               ST_XMin(geom::box2d) AS min_lon,
               ST_XMax(geom::box2d) AS max_lon
        FROM districts
        WHERE id = $1 AND geom IS NOT NULL
        "#,
    )
    .bind(district_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to look up bounds for district {district_id}"))?;
    Ok(bounds)
}

/// Population, facility count and travel-time figures, `None` for an unknown district.
pub async fn load_district_stats(pool: &PgPool, district_id: i32) -> Result<Option<DistrictStatsRow>> {
    let row = sqlx::query_as::<_, DistrictStatsRow>(
        r#"
        SELECT d.id, d.name, d.population,
               d.avg_travel_time_minutes, d.target_travel_time_minutes,
               COUNT(f.id) AS facility_count
        FROM districts d
        LEFT JOIN facilities f ON f.district_id = d.id
        WHERE d.id = $1
        GROUP BY d.id
        "#,
    )
    .bind(district_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to load statistics for district {district_id}"))?;
    Ok(row)
}

/// Combines district statistics with the bounds chosen for this request.
pub fn build_analysis(stats: DistrictStatsRow, bounds: DistrictBounds) -> DistrictAnalysis {
    DistrictAnalysis {
        district_id: stats.id,
        district_name: stats.name,
        bounds,
        population: stats.population,
        facility_count: stats.facility_count,
        avg_travel_time_minutes: stats.avg_travel_time_minutes,
        target_travel_time_minutes: stats
            .target_travel_time_minutes
            .unwrap_or(DEFAULT_TARGET_TRAVEL_TIME_MINUTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(target: Option<f64>) -> DistrictStatsRow {
        DistrictStatsRow {
            id: 7,
            name: "Musanze".to_string(),
            population: 476_522,
            avg_travel_time_minutes: None,
            target_travel_time_minutes: target,
            facility_count: 15,
        }
    }

    #[test]
    fn test_missing_target_uses_default() {
        let analysis = build_analysis(stats(None), DistrictBounds::COUNTRY_DEFAULT);
        assert_eq!(analysis.target_travel_time_minutes, DEFAULT_TARGET_TRAVEL_TIME_MINUTES);
        assert_eq!(analysis.district_name, "Musanze");
        assert!(analysis.avg_travel_time_minutes.is_none());
    }

    #[test]
    fn test_recorded_target_is_kept() {
        let analysis = build_analysis(stats(Some(25.0)), DistrictBounds::COUNTRY_DEFAULT);
        assert_eq!(analysis.target_travel_time_minutes, 25.0);
        assert_eq!(analysis.facility_count, 15);
    }
}
