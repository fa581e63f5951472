//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Registered members
CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    membership_no TEXT,
    active_no TEXT,
    profession TEXT,
    designation TEXT,
    mandal TEXT,
    dob TEXT,
    blood_group TEXT,
    contact_no TEXT NOT NULL,
    address TEXT,
    pdf_proof_path TEXT,
    photo_path TEXT,
    status TEXT NOT NULL DEFAULT 'pending_payment',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_members_membership_no ON members(membership_no);
CREATE INDEX IF NOT EXISTS idx_members_status ON members(status);
"#;
