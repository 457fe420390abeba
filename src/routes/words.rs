use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::pagination::{PageQuery, Pagination};
use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct WordItem {
    id: i64,
    kanji: String,
    romaji: String,
    french: String,
    correct_count: i64,
    wrong_count: i64,
}

#[derive(Debug, Serialize)]
struct WordListResponse {
    items: Vec<WordItem>,
    total: i64,
    page: i64,
    per_page: i64,
    total_pages: i64,
}

/// GET /api/words
///
/// Review tallies are derived from word_review_items on every read; nothing
/// is persisted per word.
pub async fn list_words(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::from_query(&query);
    let pool = state.pool();

    let total = count_words(pool).await?;
    let items = select_word_page(pool, pagination).await?;

    Ok(Json(WordListResponse {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages: pagination.total_pages(total),
    }))
}

/// GET /api/words/:id
pub async fn get_word(
    State(state): State<AppState>,
    Path(word_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let Some(word) = select_word(state.pool(), word_id).await? else {
        return Err(AppError::not_found("Word not found"));
    };
    Ok(Json(word))
}

async fn count_words(pool: &SqlitePool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn select_word_page(
    pool: &SqlitePool,
    pagination: Pagination,
) -> Result<Vec<WordItem>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT
            w."id",
            w."kanji",
            w."romaji",
            w."french",
            COALESCE(SUM(CASE WHEN wri."correct" = 1 THEN 1 ELSE 0 END), 0) AS "correct_count",
            COALESCE(SUM(CASE WHEN wri."correct" = 0 THEN 1 ELSE 0 END), 0) AS "wrong_count"
        FROM "words" w
        LEFT JOIN "word_review_items" wri ON wri."word_id" = w."id"
        GROUP BY w."id"
        ORDER BY w."kanji"
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(word_from_row(&row)?);
    }
    Ok(items)
}

async fn select_word(pool: &SqlitePool, word_id: i64) -> Result<Option<WordItem>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT
            w."id",
            w."kanji",
            w."romaji",
            w."french",
            COALESCE(SUM(CASE WHEN wri."correct" = 1 THEN 1 ELSE 0 END), 0) AS "correct_count",
            COALESCE(SUM(CASE WHEN wri."correct" = 0 THEN 1 ELSE 0 END), 0) AS "wrong_count"
        FROM "words" w
        LEFT JOIN "word_review_items" wri ON wri."word_id" = w."id"
        WHERE w."id" = ?
        GROUP BY w."id"
        "#,
    )
    .bind(word_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(word_from_row).transpose()
}

fn word_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<WordItem, AppError> {
    Ok(WordItem {
        id: row.try_get("id")?,
        kanji: row.try_get("kanji")?,
        romaji: row.try_get("romaji")?,
        french: row.try_get("french")?,
        correct_count: row.try_get("correct_count")?,
        wrong_count: row.try_get("wrong_count")?,
    })
}
