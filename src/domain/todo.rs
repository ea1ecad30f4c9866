use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned row id. Zero never names a persisted record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TodoId(pub i64);

impl TodoId {
    pub fn is_zero(self) -> bool { self.0 == 0 }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// A persisted TODO item.
///
/// `Todo::default()` is the zero-value record: id 0, empty text and both
/// timestamps at the Unix epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub subject: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodo {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTodo {
    #[serde(default)]
    pub id: TodoId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

/// Cursor page over the newest-first feed.
///
/// `prev_id == 0` starts at the newest record, otherwise only records with
/// `id < prev_id` are returned. `size == 0` asks for the service default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub prev_id: i64,
    pub size: u32,
}

impl PageRequest {
    pub fn first(size: u32) -> Self { Self { prev_id: 0, size } }

    /// The request for the page that follows `last`, keeping the same size.
    pub fn after(self, last: &Todo) -> Self { Self { prev_id: last.id.0, size: self.size } }
}
