use sqlx::SqlitePool;

struct DemoWord {
    kanji: &'static str,
    romaji: &'static str,
    french: &'static str,
}

const DEMO_GROUP: &str = "Salutations de base";
const DEMO_ACTIVITY: (&str, &str) = ("Flashcards", "http://localhost:8080");

const DEMO_WORDS: &[DemoWord] = &[
    DemoWord {
        kanji: "こんにちは",
        romaji: "konnichiwa",
        french: "bonjour",
    },
    DemoWord {
        kanji: "ありがとう",
        romaji: "arigatou",
        french: "merci",
    },
    DemoWord {
        kanji: "さようなら",
        romaji: "sayounara",
        french: "au revoir",
    },
    DemoWord {
        kanji: "おはよう",
        romaji: "ohayou",
        french: "bonjour (matin)",
    },
    DemoWord {
        kanji: "すみません",
        romaji: "sumimasen",
        french: "excusez-moi",
    },
];

/// Seeds one demo group, one activity and a handful of greeting words when
/// the words table is empty. Errors are logged and swallowed: a failed seed
/// must not keep the service from starting.
pub async fn seed_demo_data(pool: &SqlitePool) {
    let existing: i64 = match sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
        .fetch_one(pool)
        .await
    {
        Ok(count) => count,
        Err(err) => {
            tracing::warn!(error = %err, "failed to inspect words table, skipping seed");
            return;
        }
    };

    if existing > 0 {
        tracing::debug!("words table already populated, skipping demo seed");
        return;
    }

    if let Err(err) = insert_demo_rows(pool).await {
        tracing::warn!(error = %err, "failed to seed demo data");
    } else {
        tracing::info!(words = DEMO_WORDS.len(), "seeded demo data");
    }
}

async fn insert_demo_rows(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let group_id = sqlx::query(r#"INSERT INTO "groups" ("name") VALUES (?)"#)
        .bind(DEMO_GROUP)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    sqlx::query(r#"INSERT INTO "study_activities" ("name", "url") VALUES (?, ?)"#)
        .bind(DEMO_ACTIVITY.0)
        .bind(DEMO_ACTIVITY.1)
        .execute(&mut *tx)
        .await?;

    for word in DEMO_WORDS {
        let word_id = sqlx::query(
            r#"INSERT INTO "words" ("kanji", "romaji", "french") VALUES (?, ?, ?)"#,
        )
        .bind(word.kanji)
        .bind(word.romaji)
        .bind(word.french)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(r#"INSERT INTO "word_groups" ("word_id", "group_id") VALUES (?, ?)"#)
            .bind(word_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await
}
