use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

/// A persisted processing run. Rows are written once at pipeline completion
/// and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResultRecord {
    pub id: i64,
    /// Original client-supplied file name. Untrusted, informational only.
    pub file_name: String,
    /// Normalized text. Raw OCR output is never persisted.
    pub extracted_text: String,
    /// Client-declared MIME type. Untrusted.
    pub content_type: String,
    pub file_size: i64,
    pub processed_at: DateTime<Utc>,
}

/// Column values for a new row; the id is assigned by the database.
#[derive(Debug)]
pub struct NewOcrResult<'a> {
    pub file_name: &'a str,
    pub extracted_text: &'a str,
    pub content_type: &'a str,
    pub file_size: i64,
    pub processed_at: DateTime<Utc>,
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ocr_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT NOT NULL,
            extracted_text TEXT NOT NULL,
            content_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            processed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_result(pool: &DbPool, new: &NewOcrResult<'_>) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO ocr_results (file_name, extracted_text, content_type, file_size, processed_at) VALUES (?, ?, ?, ?, ?)"
    )
    .bind(new.file_name)
    .bind(new.extracted_text)
    .bind(new.content_type)
    .bind(new.file_size)
    .bind(new.processed_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_result(pool: &DbPool, id: i64) -> Result<Option<OcrResultRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String, String, String, i64, String)>(
        "SELECT id, file_name, extracted_text, content_type, file_size, processed_at FROM ocr_results WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_record))
}

/// Newest-first page of results.
pub async fn list_results(
    pool: &DbPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<OcrResultRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, String, String, i64, String)>(
        "SELECT id, file_name, extracted_text, content_type, file_size, processed_at FROM ocr_results ORDER BY id DESC LIMIT ? OFFSET ?"
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_record).collect())
}

pub async fn count_results(pool: &DbPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM ocr_results")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

fn row_to_record(r: (i64, String, String, String, i64, String)) -> OcrResultRecord {
    OcrResultRecord {
        id: r.0,
        file_name: r.1,
        extracted_text: r.2,
        content_type: r.3,
        file_size: r.4,
        processed_at: DateTime::parse_from_rfc3339(&r.5)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_db() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }

    fn sample(processed_at: DateTime<Utc>) -> NewOcrResult<'static> {
        NewOcrResult {
            file_name: "cin-front.jpg",
            extracted_text: "MARIE CURIE Née le 07.11.1867 à PARIS 123456789",
            content_type: "image/jpeg",
            file_size: 48213,
            processed_at,
        }
    }

    #[tokio::test]
    async fn insert_then_get_returns_fields_unchanged() {
        let (_dir, pool) = test_db().await;
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 10, 30, 0).unwrap();

        let id = insert_result(&pool, &sample(at)).await.unwrap();
        let record = get_result(&pool, id).await.unwrap().unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.file_name, "cin-front.jpg");
        assert_eq!(
            record.extracted_text,
            "MARIE CURIE Née le 07.11.1867 à PARIS 123456789"
        );
        assert_eq!(record.content_type, "image/jpeg");
        assert_eq!(record.file_size, 48213);
        assert_eq!(record.processed_at, at);
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let (_dir, pool) = test_db().await;
        assert!(get_result(&pool, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paginated() {
        let (_dir, pool) = test_db().await;
        for _ in 0..5 {
            insert_result(&pool, &sample(Utc::now())).await.unwrap();
        }

        assert_eq!(count_results(&pool).await.unwrap(), 5);

        let page = list_results(&pool, 2, 0).await.unwrap();
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 4]);

        let page = list_results(&pool, 2, 4).await.unwrap();
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn ids_are_monotonic() {
        let (_dir, pool) = test_db().await;
        let a = insert_result(&pool, &sample(Utc::now())).await.unwrap();
        let b = insert_result(&pool, &sample(Utc::now())).await.unwrap();
        assert!(b > a);
    }
}
