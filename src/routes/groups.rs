use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::pagination::{PageQuery, Pagination};
use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct GroupItem {
    id: i64,
    name: String,
    words_count: i64,
}

#[derive(Debug, Serialize)]
struct GroupListResponse {
    items: Vec<GroupItem>,
    total: i64,
    page: i64,
    per_page: i64,
    total_pages: i64,
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::from_query(&query);
    let pool = state.pool();

    let total = count_groups(pool).await?;
    let items = select_group_page(pool, pagination).await?;

    Ok(Json(GroupListResponse {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages: pagination.total_pages(total),
    }))
}

/// GET /api/groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query(
        r#"
        SELECT
            g."id",
            g."name",
            COUNT(wg."id") AS "words_count"
        FROM "groups" g
        LEFT JOIN "word_groups" wg ON wg."group_id" = g."id"
        WHERE g."id" = ?
        GROUP BY g."id"
        "#,
    )
    .bind(group_id)
    .fetch_optional(state.pool())
    .await?;

    let Some(row) = row else {
        return Err(AppError::not_found("Group not found"));
    };

    Ok(Json(GroupItem {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        words_count: row.try_get("words_count")?,
    }))
}

async fn count_groups(pool: &SqlitePool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "groups""#)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn select_group_page(
    pool: &SqlitePool,
    pagination: Pagination,
) -> Result<Vec<GroupItem>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT
            g."id",
            g."name",
            COUNT(wg."id") AS "words_count"
        FROM "groups" g
        LEFT JOIN "word_groups" wg ON wg."group_id" = g."id"
        GROUP BY g."id"
        ORDER BY g."name"
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(GroupItem {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            words_count: row.try_get("words_count")?,
        });
    }
    Ok(items)
}
