use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

use crate::message::{MessageOut, SenderCount, StatsResponse, WebhookMessage};

pub type DbPool = Pool<Sqlite>;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    message_id  TEXT PRIMARY KEY,
    from_msisdn TEXT NOT NULL,
    to_msisdn   TEXT NOT NULL,
    ts          TEXT NOT NULL,
    text        TEXT,
    created_at  TEXT NOT NULL
)
"#;

/// Outcome of an idempotent insert.
///
/// `Duplicate` is not an error: webhook delivery is at-least-once and a
/// retried `message_id` must converge to exactly one stored row. The
/// `StorageError` detail is for logging only and never reaches untrusted
/// callers.
#[derive(Debug)]
pub enum InsertOutcome {
    Created,
    Duplicate,
    StorageError(String),
}

/// Optional filters for message listing, AND-combined when present.
#[derive(Debug, Default, Clone)]
pub struct MessageFilter {
    /// Exact match on the sender MSISDN.
    pub from: Option<String>,
    /// Inclusive lower bound on `ts`, compared as strings.
    pub since: Option<String>,
    /// Case-insensitive substring match on `text`; NULL text never matches.
    pub q: Option<String>,
}

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true);

    // An in-memory SQLite database exists per connection; keep the pool at
    // a single connection so all statements see the same database.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("failed to connect to database")?;
    Ok(pool)
}

pub async fn init_schema(pool: &DbPool) -> Result<()> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await
        .context("failed to initialize schema")?;
    Ok(())
}

/// Cheap liveness probe for readiness reporting.
pub async fn ready(pool: &DbPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Inserts a validated message, keyed by `message_id`.
///
/// Duplicate detection relies on the PRIMARY KEY constraint enforced by the
/// storage engine, not a read-then-write check, so concurrent inserts of
/// the same id cannot race into two rows. `created_at` is server-assigned
/// at insert and never updated.
pub async fn insert_message(pool: &DbPool, msg: &WebhookMessage) -> InsertOutcome {
    let created_at = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO messages (message_id, from_msisdn, to_msisdn, ts, text, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&msg.message_id)
    .bind(&msg.from_msisdn)
    .bind(&msg.to_msisdn)
    .bind(&msg.ts)
    .bind(&msg.text)
    .bind(&created_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => InsertOutcome::Created,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            InsertOutcome::Duplicate
        }
        Err(e) => InsertOutcome::StorageError(e.to_string()),
    }
}

/// Lists stored messages with filters and pagination.
///
/// Returns the page of rows ordered `(ts ASC, message_id ASC)` together
/// with the total count of rows matching the filters before pagination.
/// `limit` is clamped to [1, 100] and `offset` to >= 0.
pub async fn list_messages(
    pool: &DbPool,
    filter: &MessageFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<MessageOut>, i64)> {
    let limit = limit.clamp(1, 100);
    let offset = offset.max(0);

    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if let Some(from) = &filter.from {
        conditions.push("from_msisdn = ?");
        params.push(from.clone());
    }
    if let Some(since) = &filter.since {
        conditions.push("ts >= ?");
        params.push(since.clone());
    }
    if let Some(q) = &filter.q {
        conditions.push("LOWER(text) LIKE ?");
        params.push(format!("%{}%", q.to_lowercase()));
    }

    let where_sql = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM messages {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for param in &params {
        count_query = count_query.bind(param);
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("failed to count messages")?;

    let rows_sql = format!(
        r#"
        SELECT message_id, from_msisdn, to_msisdn, ts, text
        FROM messages
        {where_sql}
        ORDER BY ts ASC, message_id ASC
        LIMIT ? OFFSET ?
        "#
    );
    let mut rows_query = sqlx::query_as::<_, MessageOut>(&rows_sql);
    for param in &params {
        rows_query = rows_query.bind(param);
    }
    let rows = rows_query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("failed to list messages")?;

    Ok((rows, total))
}

/// Computes aggregate statistics over all stored messages.
///
/// `senders_count` is the true distinct-sender count, independent of the
/// top-10 cutoff applied to `messages_per_sender`. Ties among equal counts
/// break by sender ascending to keep the result deterministic.
pub async fn stats(pool: &DbPool) -> Result<StatsResponse> {
    let total_messages = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(pool)
        .await
        .context("failed to count messages")?;

    let senders_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT from_msisdn) FROM messages")
            .fetch_one(pool)
            .await
            .context("failed to count distinct senders")?;

    let messages_per_sender = sqlx::query_as::<_, SenderCount>(
        r#"
        SELECT from_msisdn, COUNT(*) AS count
        FROM messages
        GROUP BY from_msisdn
        ORDER BY count DESC, from_msisdn ASC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to aggregate per-sender counts")?;

    let first_message_ts = sqlx::query_scalar::<_, String>(
        "SELECT ts FROM messages ORDER BY ts ASC, message_id ASC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .context("failed to read first message timestamp")?;

    let last_message_ts = sqlx::query_scalar::<_, String>(
        "SELECT ts FROM messages ORDER BY ts DESC, message_id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .context("failed to read last message timestamp")?;

    Ok(StatsResponse {
        total_messages,
        senders_count,
        messages_per_sender,
        first_message_ts,
        last_message_ts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DbPool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    fn msg(id: &str, from: &str, ts: &str, text: Option<&str>) -> WebhookMessage {
        WebhookMessage {
            message_id: id.to_string(),
            from_msisdn: from.to_string(),
            to_msisdn: "+14155550100".to_string(),
            ts: ts.to_string(),
            text: text.map(|t| t.to_string()),
        }
    }

    async fn seed(pool: &DbPool) {
        let msgs = [
            msg("m1", "+919876543210", "2025-01-15T09:00:00Z", Some("Earlier")),
            msg("m2", "+919876543210", "2025-01-15T09:30:00Z", Some("Mid")),
            msg("m3", "+911234567890", "2025-01-15T10:00:00Z", Some("Hello")),
        ];
        for m in &msgs {
            assert!(matches!(insert_message(pool, m).await, InsertOutcome::Created));
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let pool = test_pool().await;
        let m = msg("m1", "+919876543210", "2025-01-15T09:00:00Z", Some("Hello"));

        assert!(matches!(insert_message(&pool, &m).await, InsertOutcome::Created));
        for _ in 0..3 {
            assert!(matches!(insert_message(&pool, &m).await, InsertOutcome::Duplicate));
        }

        let (rows, total) = list_messages(&pool, &MessageFilter::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message_id, "m1");
    }

    #[tokio::test]
    async fn test_duplicate_does_not_mutate_first_row() {
        let pool = test_pool().await;
        let original = msg("m1", "+919876543210", "2025-01-15T09:00:00Z", Some("first"));
        let retry = msg("m1", "+911111111111", "2025-02-01T00:00:00Z", Some("second"));

        insert_message(&pool, &original).await;
        assert!(matches!(insert_message(&pool, &retry).await, InsertOutcome::Duplicate));

        let (rows, _) = list_messages(&pool, &MessageFilter::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(rows[0].from_msisdn, "+919876543210");
        assert_eq!(rows[0].text.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_ordering_by_ts_then_message_id() {
        let pool = test_pool().await;
        // Insert out of order, including a timestamp collision.
        insert_message(&pool, &msg("b", "+2", "2025-01-15T09:00:00Z", None)).await;
        insert_message(&pool, &msg("c", "+3", "2025-01-14T09:00:00Z", None)).await;
        insert_message(&pool, &msg("a", "+1", "2025-01-15T09:00:00Z", None)).await;

        let (rows, total) = list_messages(&pool, &MessageFilter::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(total, 3);
        let ids: Vec<_> = rows.iter().map(|r| r.message_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_filters_are_and_combined() {
        let pool = test_pool().await;
        seed(&pool).await;

        let filter = MessageFilter {
            from: Some("+919876543210".to_string()),
            ..Default::default()
        };
        let (rows, total) = list_messages(&pool, &filter, 50, 0).await.unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|r| r.from_msisdn == "+919876543210"));

        let filter = MessageFilter {
            from: Some("+919876543210".to_string()),
            since: Some("2025-01-15T09:30:00Z".to_string()),
            ..Default::default()
        };
        let (_, total) = list_messages(&pool, &filter, 50, 0).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_since_is_inclusive() {
        let pool = test_pool().await;
        seed(&pool).await;

        let filter = MessageFilter {
            since: Some("2025-01-15T09:30:00Z".to_string()),
            ..Default::default()
        };
        let (rows, total) = list_messages(&pool, &filter, 50, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].message_id, "m2");
    }

    #[tokio::test]
    async fn test_text_search_is_case_insensitive_and_skips_null() {
        let pool = test_pool().await;
        seed(&pool).await;
        insert_message(&pool, &msg("m4", "+911234567890", "2025-01-15T11:00:00Z", None)).await;

        let filter = MessageFilter {
            q: Some("hello".to_string()),
            ..Default::default()
        };
        let (rows, total) = list_messages(&pool, &filter, 50, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].message_id, "m3");
    }

    #[tokio::test]
    async fn test_total_is_independent_of_pagination() {
        let pool = test_pool().await;
        seed(&pool).await;

        let (rows, total) = list_messages(&pool, &MessageFilter::default(), 2, 0)
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 2);

        let (rows, total) = list_messages(&pool, &MessageFilter::default(), 2, 2)
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message_id, "m3");
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let pool = test_pool().await;
        seed(&pool).await;

        let (rows, _) = list_messages(&pool, &MessageFilter::default(), 0, 0)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1); // clamped up to 1

        let (rows, _) = list_messages(&pool, &MessageFilter::default(), 1000, 0)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3); // clamp to 100 still covers all rows
    }

    #[tokio::test]
    async fn test_stats_aggregates() {
        let pool = test_pool().await;
        seed(&pool).await;

        let s = stats(&pool).await.unwrap();
        assert_eq!(s.total_messages, 3);
        assert_eq!(s.senders_count, 2);
        assert_eq!(s.first_message_ts.as_deref(), Some("2025-01-15T09:00:00Z"));
        assert_eq!(s.last_message_ts.as_deref(), Some("2025-01-15T10:00:00Z"));

        let sum: i64 = s.messages_per_sender.iter().map(|c| c.count).sum();
        assert_eq!(sum, s.total_messages);
        // Descending by count, ties broken by sender ascending.
        assert_eq!(s.messages_per_sender[0].from_msisdn, "+919876543210");
        assert_eq!(s.messages_per_sender[0].count, 2);
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let pool = test_pool().await;

        let s = stats(&pool).await.unwrap();
        assert_eq!(s.total_messages, 0);
        assert_eq!(s.senders_count, 0);
        assert!(s.messages_per_sender.is_empty());
        assert!(s.first_message_ts.is_none());
        assert!(s.last_message_ts.is_none());
    }

    #[tokio::test]
    async fn test_top_senders_capped_at_ten() {
        let pool = test_pool().await;
        for i in 0..12 {
            let m = msg(
                &format!("m{i}"),
                &format!("+91{i:010}"),
                "2025-01-15T09:00:00Z",
                None,
            );
            insert_message(&pool, &m).await;
        }

        let s = stats(&pool).await.unwrap();
        assert_eq!(s.total_messages, 12);
        assert_eq!(s.senders_count, 12); // not capped by the top-10 cutoff
        assert_eq!(s.messages_per_sender.len(), 10);
    }

    #[tokio::test]
    async fn test_ready_probe() {
        let pool = test_pool().await;
        assert!(ready(&pool).await);
    }
}
