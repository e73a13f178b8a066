//! Read-only user projection.
//!
//! Account CRUD belongs to the external identity service; the core only
//! reads the rows it needs for snapshot exports.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use vflix_models::Snapshot;

use crate::error::DbResult;

/// One user row as seen by the exporter.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl Snapshot for UserRow {
    const NAME: &'static str = "user";

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "email": self.email,
            "is_staff": self.is_staff,
            "created_at": self.created_at.to_rfc3339(),
        })
    }
}

/// Read access to user rows.
#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All rows, for the snapshot exporter.
    pub async fn list_all(&self) -> DbResult<Vec<UserRow>> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, is_staff, created_at FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_snapshot_record() {
        let row = UserRow {
            id: 3,
            email: "viewer@example.com".to_string(),
            is_staff: false,
            created_at: Utc::now(),
        };
        let record = row.snapshot();
        assert_eq!(record["email"], "viewer@example.com");
        assert_eq!(record["is_staff"], false);
        assert_eq!(UserRow::NAME, "user");
    }
}
