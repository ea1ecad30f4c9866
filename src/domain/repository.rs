use async_trait::async_trait;
use super::todo::{Todo, TodoId};

/// Relational store for TODO rows.
///
/// Every method issues its own statement(s) and releases the connection when
/// the future completes or is dropped.
#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    /// Inserts a row and returns the id the store assigned to it.
    async fn insert(&self, subject: &str, description: &str) -> anyhow::Result<TodoId>;
    async fn find(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    /// Newest-first rows, restricted to `id < prev_id` unless `prev_id` is 0.
    async fn list_before(&self, prev_id: i64, limit: u32) -> anyhow::Result<Vec<Todo>>;
    /// Returns the number of rows matched.
    async fn update(&self, id: TodoId, subject: &str, description: &str) -> anyhow::Result<u64>;
    /// Returns the number of rows removed.
    async fn delete_many(&self, ids: &[TodoId]) -> anyhow::Result<u64>;
}
