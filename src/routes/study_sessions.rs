use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::pagination::{PageQuery, Pagination};
use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateSessionRequest {
    group_id: Option<i64>,
    study_activity_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    session_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogReviewRequest {
    answers: Option<Vec<ReviewAnswer>>,
}

#[derive(Debug, Deserialize)]
struct ReviewAnswer {
    word_id: Option<i64>,
    correct: Option<bool>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    id: i64,
    group_id: i64,
    group_name: String,
    activity_id: i64,
    activity_name: String,
    start_time: String,
    end_time: String,
    review_items_count: i64,
}

#[derive(Debug, Serialize)]
struct SessionListResponse {
    items: Vec<SessionSummary>,
    total: i64,
    page: i64,
    per_page: i64,
    total_pages: i64,
}

#[derive(Debug, Serialize)]
struct SessionDetail {
    #[serde(flatten)]
    summary: SessionSummary,
    total_correct: i64,
    total_wrong: i64,
    accuracy: f64,
    grade: &'static str,
    feedback: &'static str,
}

#[derive(Debug, Serialize)]
struct ReviewedWord {
    id: i64,
    kanji: String,
    romaji: String,
    french: String,
    correct_count: i64,
    wrong_count: i64,
}

#[derive(Debug, Serialize)]
struct SessionDetailResponse {
    session: SessionDetail,
    words: Vec<ReviewedWord>,
    total: i64,
    page: i64,
    per_page: i64,
    total_pages: i64,
}

/// POST /study_sessions
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group_id = payload
        .group_id
        .ok_or_else(|| AppError::validation("group_id is required"))?;
    let study_activity_id = payload
        .study_activity_id
        .ok_or_else(|| AppError::validation("study_activity_id is required"))?;

    let pool = state.pool();

    if !group_exists(pool, group_id).await? {
        return Err(AppError::not_found("Group not found"));
    }
    if !activity_exists(pool, study_activity_id).await? {
        return Err(AppError::not_found("Study activity not found"));
    }

    let session_id = insert_session(pool, group_id, study_activity_id).await?;
    tracing::debug!(session_id, group_id, study_activity_id, "study session created");

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    ))
}

/// GET /api/study-sessions
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::from_query(&query);
    let pool = state.pool();

    let total = count_sessions(pool).await?;
    let items = select_session_page(pool, pagination).await?;

    Ok(Json(SessionListResponse {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages: pagination.total_pages(total),
    }))
}

/// GET /api/study-sessions/:id
pub async fn get_one(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = Pagination::from_query(&query);
    let pool = state.pool();

    let Some(session) = select_session_detail(pool, session_id).await? else {
        return Err(AppError::not_found("Study session not found"));
    };

    let total = count_reviewed_words(pool, session_id).await?;
    let words = select_reviewed_words(pool, session_id, pagination).await?;

    Ok(Json(SessionDetailResponse {
        session,
        words,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages: pagination.total_pages(total),
    }))
}

/// POST /study_sessions/:id/review
///
/// The whole batch runs in one transaction: any invalid answer rolls back
/// every insert made before it, so a failed batch leaves no rows behind.
pub async fn log_review(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(payload): Json<LogReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let answers = payload
        .answers
        .filter(|answers| !answers.is_empty())
        .ok_or_else(|| AppError::validation("answers are required"))?;

    let mut tx = state.pool().begin().await?;

    if !session_exists(&mut tx, session_id).await? {
        return Err(AppError::not_found("Study session not found"));
    }

    for answer in &answers {
        let (Some(word_id), Some(correct)) = (answer.word_id, answer.correct) else {
            return Err(AppError::validation(
                "word_id and correct fields are required",
            ));
        };

        if !word_exists(&mut tx, word_id).await? {
            return Err(AppError::not_found("Word not found"));
        }

        insert_review_item(&mut tx, session_id, word_id, correct).await?;
    }

    tx.commit().await?;
    tracing::debug!(session_id, count = answers.len(), "review batch logged");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Review logged successfully",
        }),
    ))
}

/// POST /api/study-sessions/reset
///
/// Registered only when `ENABLE_HISTORY_RESET` is on; wipes review items
/// before sessions so no review ever points at a deleted session.
pub async fn reset_history(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = state.pool().begin().await?;

    sqlx::query(r#"DELETE FROM "word_review_items""#)
        .execute(&mut *tx)
        .await?;
    sqlx::query(r#"DELETE FROM "study_sessions""#)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("study history cleared");

    Ok(Json(MessageResponse {
        message: "Study history cleared successfully",
    }))
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn group_exists(pool: &SqlitePool, group_id: i64) -> Result<bool, AppError> {
    let id: Option<i64> = sqlx::query_scalar(r#"SELECT "id" FROM "groups" WHERE "id" = ?"#)
        .bind(group_id)
        .fetch_optional(pool)
        .await?;
    Ok(id.is_some())
}

async fn activity_exists(pool: &SqlitePool, activity_id: i64) -> Result<bool, AppError> {
    let id: Option<i64> =
        sqlx::query_scalar(r#"SELECT "id" FROM "study_activities" WHERE "id" = ?"#)
            .bind(activity_id)
            .fetch_optional(pool)
            .await?;
    Ok(id.is_some())
}

async fn session_exists(conn: &mut SqliteConnection, session_id: i64) -> Result<bool, AppError> {
    let id: Option<i64> = sqlx::query_scalar(r#"SELECT "id" FROM "study_sessions" WHERE "id" = ?"#)
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id.is_some())
}

async fn word_exists(conn: &mut SqliteConnection, word_id: i64) -> Result<bool, AppError> {
    let id: Option<i64> = sqlx::query_scalar(r#"SELECT "id" FROM "words" WHERE "id" = ?"#)
        .bind(word_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id.is_some())
}

async fn insert_session(
    pool: &SqlitePool,
    group_id: i64,
    study_activity_id: i64,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO "study_sessions" ("group_id", "study_activity_id", "created_at")
        VALUES (?, ?, ?)
        "#,
    )
    .bind(group_id)
    .bind(study_activity_id)
    .bind(now_iso())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn insert_review_item(
    conn: &mut SqliteConnection,
    session_id: i64,
    word_id: i64,
    correct: bool,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO "word_review_items" ("word_id", "study_session_id", "correct", "created_at")
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(word_id)
    .bind(session_id)
    .bind(correct)
    .bind(now_iso())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn count_sessions(pool: &SqlitePool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM "study_sessions" ss
        JOIN "groups" g ON g."id" = ss."group_id"
        JOIN "study_activities" sa ON sa."id" = ss."study_activity_id"
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}

async fn select_session_page(
    pool: &SqlitePool,
    pagination: Pagination,
) -> Result<Vec<SessionSummary>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT
            ss."id",
            ss."group_id",
            g."name" AS "group_name",
            sa."id" AS "activity_id",
            sa."name" AS "activity_name",
            ss."created_at",
            COUNT(wri."id") AS "review_items_count"
        FROM "study_sessions" ss
        JOIN "groups" g ON g."id" = ss."group_id"
        JOIN "study_activities" sa ON sa."id" = ss."study_activity_id"
        LEFT JOIN "word_review_items" wri ON wri."study_session_id" = ss."id"
        GROUP BY ss."id"
        ORDER BY ss."created_at" DESC, ss."id" DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at: String = row.try_get("created_at")?;
        items.push(SessionSummary {
            id: row.try_get("id")?,
            group_id: row.try_get("group_id")?,
            group_name: row.try_get("group_name")?,
            activity_id: row.try_get("activity_id")?,
            activity_name: row.try_get("activity_name")?,
            start_time: created_at.clone(),
            end_time: created_at,
            review_items_count: row.try_get("review_items_count")?,
        });
    }
    Ok(items)
}

async fn select_session_detail(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Option<SessionDetail>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT
            ss."id",
            ss."group_id",
            g."name" AS "group_name",
            sa."id" AS "activity_id",
            sa."name" AS "activity_name",
            ss."created_at",
            COUNT(wri."id") AS "review_items_count",
            COALESCE(SUM(CASE WHEN wri."correct" = 1 THEN 1 ELSE 0 END), 0) AS "total_correct",
            COALESCE(SUM(CASE WHEN wri."correct" = 0 THEN 1 ELSE 0 END), 0) AS "total_wrong"
        FROM "study_sessions" ss
        JOIN "groups" g ON g."id" = ss."group_id"
        JOIN "study_activities" sa ON sa."id" = ss."study_activity_id"
        LEFT JOIN "word_review_items" wri ON wri."study_session_id" = ss."id"
        WHERE ss."id" = ?
        GROUP BY ss."id"
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };

    let created_at: String = row.try_get("created_at")?;
    let total_correct: i64 = row.try_get("total_correct")?;
    let total_wrong: i64 = row.try_get("total_wrong")?;
    let accuracy = accuracy_percent(total_correct, total_wrong);

    Ok(Some(SessionDetail {
        summary: SessionSummary {
            id: row.try_get("id")?,
            group_id: row.try_get("group_id")?,
            group_name: row.try_get("group_name")?,
            activity_id: row.try_get("activity_id")?,
            activity_name: row.try_get("activity_name")?,
            start_time: created_at.clone(),
            end_time: created_at,
            review_items_count: row.try_get("review_items_count")?,
        },
        total_correct,
        total_wrong,
        accuracy,
        grade: grade_for_accuracy(accuracy),
        feedback: feedback_for_accuracy(accuracy),
    }))
}

async fn count_reviewed_words(pool: &SqlitePool, session_id: i64) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT w."id")
        FROM "words" w
        JOIN "word_review_items" wri ON wri."word_id" = w."id"
        WHERE wri."study_session_id" = ?
        "#,
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

async fn select_reviewed_words(
    pool: &SqlitePool,
    session_id: i64,
    pagination: Pagination,
) -> Result<Vec<ReviewedWord>, AppError> {
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
        JOIN "word_review_items" wri ON wri."word_id" = w."id"
        WHERE wri."study_session_id" = ?
        GROUP BY w."id"
        ORDER BY w."kanji"
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(session_id)
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let mut words = Vec::with_capacity(rows.len());
    for row in rows {
        words.push(ReviewedWord {
            id: row.try_get("id")?,
            kanji: row.try_get("kanji")?,
            romaji: row.try_get("romaji")?,
            french: row.try_get("french")?,
            correct_count: row.try_get("correct_count")?,
            wrong_count: row.try_get("wrong_count")?,
        });
    }
    Ok(words)
}

/// Percentage of correct answers, 0 when nothing was reviewed, rounded to
/// 2 decimals.
fn accuracy_percent(correct: i64, wrong: i64) -> f64 {
    let total = correct + wrong;
    if total == 0 {
        return 0.0;
    }
    let raw = correct as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

fn grade_for_accuracy(accuracy: f64) -> &'static str {
    if accuracy >= 90.0 {
        "A"
    } else if accuracy >= 80.0 {
        "B"
    } else if accuracy >= 70.0 {
        "C"
    } else if accuracy >= 60.0 {
        "D"
    } else {
        "E"
    }
}

fn feedback_for_accuracy(accuracy: f64) -> &'static str {
    if accuracy >= 90.0 {
        "Excellent travail!"
    } else if accuracy >= 80.0 {
        "Bon travail!"
    } else if accuracy >= 70.0 {
        "Pas mal!"
    } else if accuracy >= 60.0 {
        "Peut mieux faire"
    } else {
        "Continuez à pratiquer!"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_is_zero_without_reviews() {
        assert_eq!(accuracy_percent(0, 0), 0.0);
    }

    #[test]
    fn accuracy_rounds_to_two_decimals() {
        assert_eq!(accuracy_percent(9, 1), 90.0);
        assert_eq!(accuracy_percent(1, 2), 33.33);
        assert_eq!(accuracy_percent(2, 1), 66.67);
    }

    #[test]
    fn grade_thresholds_match_the_scale() {
        assert_eq!(grade_for_accuracy(100.0), "A");
        assert_eq!(grade_for_accuracy(90.0), "A");
        assert_eq!(grade_for_accuracy(89.99), "B");
        assert_eq!(grade_for_accuracy(80.0), "B");
        assert_eq!(grade_for_accuracy(70.0), "C");
        assert_eq!(grade_for_accuracy(60.0), "D");
        assert_eq!(grade_for_accuracy(59.99), "E");
        assert_eq!(grade_for_accuracy(0.0), "E");
    }

    #[test]
    fn feedback_follows_the_grade_bands() {
        assert_eq!(feedback_for_accuracy(95.0), "Excellent travail!");
        assert_eq!(feedback_for_accuracy(85.0), "Bon travail!");
        assert_eq!(feedback_for_accuracy(75.0), "Pas mal!");
        assert_eq!(feedback_for_accuracy(65.0), "Peut mieux faire");
        assert_eq!(feedback_for_accuracy(10.0), "Continuez à pratiquer!");
    }
}
