//! SQLite History Repository

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{ConversionRecord, HistoryRepositoryPort, RepositoryError};
use crate::domain::conversion::JobStatus;

const SELECT_COLUMNS: &str = "SELECT id, title, markdown_text, text_preview, voice_id, status, \
     file_path, file_size, error_message, created_at FROM conversions";

/// SQLite History Repository
pub struct SqliteHistoryRepository {
    pool: DbPool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// 定宽时间戳，保证按字符串排序即按时间排序
fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(FromRow)]
struct ConversionRow {
    id: String,
    title: Option<String>,
    markdown_text: String,
    text_preview: String,
    voice_id: Option<String>,
    status: String,
    file_path: Option<String>,
    file_size: Option<i64>,
    error_message: Option<String>,
    created_at: String,
}

impl TryFrom<ConversionRow> for ConversionRecord {
    type Error = RepositoryError;

    fn try_from(row: ConversionRow) -> Result<Self, Self::Error> {
        Ok(ConversionRecord {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            title: row.title,
            markdown_text: row.markdown_text,
            text_preview: row.text_preview,
            voice_id: row.voice_id,
            status: JobStatus::from_str(&row.status).ok_or_else(|| {
                RepositoryError::SerializationError(format!("unknown status: {}", row.status))
            })?,
            file_path: row.file_path,
            file_size: row.file_size.map(|size| size.max(0) as u64),
            error_message: row.error_message,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl HistoryRepositoryPort for SqliteHistoryRepository {
    async fn create_pending(&self, record: &ConversionRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO conversions
                (id, title, markdown_text, text_preview, voice_id, status,
                 file_path, file_size, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.title)
        .bind(&record.markdown_text)
        .bind(&record.text_preview)
        .bind(&record.voice_id)
        .bind(record.status.as_str())
        .bind(&record.file_path)
        .bind(record.file_size.map(|size| size as i64))
        .bind(&record.error_message)
        .bind(format_timestamp(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Duplicate(record.id.to_string())
            }
            other => RepositoryError::DatabaseError(other.to_string()),
        })?;

        Ok(())
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        file_path: &str,
        file_size: u64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE conversions
            SET status = ?, file_path = ?, file_size = ?, error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(JobStatus::Completed.as_str())
        .bind(file_path)
        .bind(file_size as i64)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversions SET status = ?, error_message = ? WHERE id = ?")
            .bind(JobStatus::Failed.as_str())
            .bind(error_message)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ConversionRecord>, RepositoryError> {
        let row: Option<ConversionRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ConversionRecord::try_from).transpose()
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<ConversionRecord>, RepositoryError> {
        let rows: Vec<ConversionRow> = sqlx::query_as(&format!(
            "{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ConversionRecord::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM conversions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn cleanup_older_than(&self, max_age_days: u64) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - Duration::days(max_age_days.min(i64::MAX as u64 / 86_400) as i64);

        let result = sqlx::query("DELETE FROM conversions WHERE created_at < ?")
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(deleted, max_age_days, "Old conversion records removed");
        }
        Ok(deleted)
    }
}
