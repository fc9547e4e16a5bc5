use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::recommendation::{RecommendationRow, RecommendationSet};

/// Persists one recommendation run. All rows share `request_id`; the insert is
/// all-or-nothing.
pub async fn save_recommendations(
    pool: &PgPool,
    district_id: i32,
    request_id: Uuid,
    set: &RecommendationSet,
) -> Result<Vec<RecommendationRow>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut rows = Vec::with_capacity(set.recommendations.len());

    for rec in &set.recommendations {
        let row = sqlx::query_as::<_, RecommendationRow>(
            r#"
            INSERT INTO recommendations
                (id, district_id, request_id, name, latitude, longitude,
                 facility_type, justification, method, probability, confidence_tier)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(district_id)
        .bind(request_id)
        .bind(&rec.name)
        .bind(rec.latitude)
        .bind(rec.longitude)
        .bind(rec.facility_type.as_str())
        .bind(&rec.justification)
        .bind(set.method.as_str())
        .bind(rec.score_metadata.map(|m| m.probability))
        .bind(rec.score_metadata.map(|m| m.confidence_tier.as_str()))
        .fetch_one(&mut *tx)
        .await?;
        rows.push(row);
    }

    tx.commit().await?;
    info!(
        "Stored {} {} recommendations for district {} (request {})",
        rows.len(),
        set.method,
        district_id,
        request_id
    );
    Ok(rows)
}

/// Most recent stored recommendations for a district, newest run first.
pub async fn list_recommendations(
    pool: &PgPool,
    district_id: i32,
    limit: i64,
) -> Result<Vec<RecommendationRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RecommendationRow>(
        r#"
        SELECT * FROM recommendations
        WHERE district_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2
        "#,
    )
    .bind(district_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
