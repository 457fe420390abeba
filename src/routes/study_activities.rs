use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sqlx::Row;

use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ActivityItem {
    id: i64,
    name: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct ActivityListResponse {
    items: Vec<ActivityItem>,
}

/// GET /api/study-activities
///
/// The activity table stays small (one row per external practice tool), so
/// the full list is returned without pagination.
pub async fn list_activities(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query(
        r#"SELECT "id", "name", "url" FROM "study_activities" ORDER BY "name""#,
    )
    .fetch_all(state.pool())
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(ActivityItem {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
        });
    }

    Ok(Json(ActivityListResponse { items }))
}
