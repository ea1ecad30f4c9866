use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow}, Pool, QueryBuilder, Row, Sqlite};

use crate::domain::{
    repository::TodoRepository,
    todo::{Todo, TodoId},
};

/// Ids bound per `DELETE ... IN (...)` statement, well under SQLite's variable limit.
const DELETE_CHUNK: usize = 500;

const COLUMNS: &str = "id, subject, description, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteTodoRepository {
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with(database_url, 5, Duration::from_secs(30)).await
    }

    pub async fn connect_with(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {database_url}"))?
            .create_if_missing(true);

        let pool_options = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
        let pool_options = if is_in_memory(database_url) {
            // Every in-memory connection is a separate database; keep exactly one alive.
            pool_options.max_connections(1).min_connections(1).idle_timeout(None::<Duration>).max_lifetime(None::<Duration>)
        } else {
            ensure_parent_dir(database_url)?;
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("connect to {database_url}"))?;
        tracing::debug!(%database_url, "sqlite pool ready");
        Ok(Self { pool: Arc::new(pool) })
    }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL CHECK (subject <> ''),
                description TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL CHECK (updated_at >= created_at)
            )",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn insert(&self, subject: &str, description: &str) -> Result<TodoId> {
        let result = sqlx::query(
            "INSERT INTO todos (subject, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(subject)
        .bind(description)
        .bind(now_micros())
        .execute(&*self.pool)
        .await?;
        Ok(TodoId(result.last_insert_rowid()))
    }

    async fn find(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?1"))
            .bind(id.0)
            .fetch_optional(&*self.pool)
            .await?;
        row.map(row_to_todo).transpose()
    }

    async fn list_before(&self, prev_id: i64, limit: u32) -> Result<Vec<Todo>> {
        let rows = if prev_id == 0 {
            sqlx::query(&format!("SELECT {COLUMNS} FROM todos ORDER BY id DESC LIMIT ?1"))
                .bind(i64::from(limit))
                .fetch_all(&*self.pool)
                .await?
        } else {
            sqlx::query(&format!("SELECT {COLUMNS} FROM todos WHERE id < ?1 ORDER BY id DESC LIMIT ?2"))
                .bind(prev_id)
                .bind(i64::from(limit))
                .fetch_all(&*self.pool)
                .await?
        };
        rows.into_iter().map(row_to_todo).collect()
    }

    async fn update(&self, id: TodoId, subject: &str, description: &str) -> Result<u64> {
        // updated_at only ever moves forward, even within one clock tick
        let result = sqlx::query(
            "UPDATE todos SET subject = ?2, description = ?3, updated_at = MAX(?4, updated_at + 1)
             WHERE id = ?1",
        )
        .bind(id.0)
        .bind(subject)
        .bind(description)
        .bind(now_micros())
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, ids: &[TodoId]) -> Result<u64> {
        let mut removed = 0;
        for chunk in ids.chunks(DELETE_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM todos WHERE id IN (");
            let mut list = qb.separated(", ");
            for id in chunk {
                list.push_bind(id.0);
            }
            list.push_unseparated(")");
            removed += qb.build().execute(&*self.pool).await?.rows_affected();
        }
        Ok(removed)
    }
}

fn row_to_todo(row: SqliteRow) -> Result<Todo> {
    Ok(Todo {
        id: TodoId(row.try_get("id")?),
        subject: row.try_get("subject")?,
        description: row.try_get("description")?,
        created_at: from_micros(row.try_get("created_at")?)?,
        updated_at: from_micros(row.try_get("updated_at")?)?,
    })
}

fn now_micros() -> i64 { Utc::now().timestamp_micros() }

fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).with_context(|| format!("stored timestamp {micros} out of range"))
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Creates the directory holding a file-backed database.
fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://").or_else(|| database_url.strip_prefix("sqlite:")) else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    // On Windows, absolute paths may look like /C:/path; strip the leading slash
    let path = if cfg!(windows) && path.len() >= 3 && path.as_bytes()[0] == b'/' && path.as_bytes()[2] == b':' {
        &path[1..]
    } else {
        path
    };
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> SqliteTodoRepository {
        let repo = SqliteTodoRepository::connect("sqlite::memory:").await.unwrap();
        repo.init().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let repo = repo().await;
        repo.init().await.unwrap();
        assert!(repo.list_before(0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids_and_equal_timestamps() {
        let repo = repo().await;
        let a = repo.insert("a", "").await.unwrap();
        let b = repo.insert("b", "desc").await.unwrap();
        assert!(a.0 > 0 && b.0 > a.0);

        let row = repo.find(b).await.unwrap().unwrap();
        assert_eq!(row.subject, "b");
        assert_eq!(row.description, "desc");
        assert_eq!(row.created_at, row.updated_at);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = repo().await;
        let a = repo.insert("a", "").await.unwrap();
        repo.delete_many(&[a]).await.unwrap();
        let b = repo.insert("b", "").await.unwrap();
        assert!(b.0 > a.0);
    }

    #[tokio::test]
    async fn store_refuses_empty_subject() {
        let repo = repo().await;
        assert!(repo.insert("", "x").await.is_err());
    }

    #[tokio::test]
    async fn back_to_back_updates_advance_updated_at() {
        let repo = repo().await;
        let id = repo.insert("a", "").await.unwrap();
        let mut last = repo.find(id).await.unwrap().unwrap().updated_at;
        for i in 0..5 {
            assert_eq!(repo.update(id, &format!("a{i}"), "").await.unwrap(), 1);
            let now = repo.find(id).await.unwrap().unwrap().updated_at;
            assert!(now > last);
            last = now;
        }
    }

    #[tokio::test]
    async fn update_missing_row_matches_nothing() {
        let repo = repo().await;
        assert_eq!(repo.update(TodoId(12), "s", "").await.unwrap(), 0);
        assert!(repo.find(TodoId(12)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_before_respects_cursor_and_limit() {
        let repo = repo().await;
        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(repo.insert(&format!("t{i}"), "").await.unwrap());
        }
        let page: Vec<_> = repo.list_before(0, 2).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(page, vec![ids[5], ids[4]]);
        let page: Vec<_> = repo.list_before(ids[4].0, 3).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(page, vec![ids[3], ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn delete_many_spans_chunks() {
        let repo = repo().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(repo.insert(&format!("t{i}"), "").await.unwrap());
        }
        let mut targets: Vec<TodoId> = (10_000..10_000 + DELETE_CHUNK as i64 * 2).map(TodoId).collect();
        targets.push(ids[0]);
        targets.push(ids[2]);
        assert_eq!(repo.delete_many(&targets).await.unwrap(), 2);
        assert_eq!(repo.delete_many(&targets).await.unwrap(), 0);
        let left: Vec<_> = repo.list_before(0, 10).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(left, vec![ids[1]]);
    }

    #[test]
    fn in_memory_urls_are_detected() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:todos?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://todos.db"));
    }
}
