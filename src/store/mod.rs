//! Relational storage for users, the course catalog and everything students
//! attach to it. Uniqueness, score range, the course/pairing XOR and cascading
//! deletes all live in the schema under `migrations/`; the code here only reads
//! and writes rows and sorts constraint failures into [`crate::error::Error`].

pub mod models;
pub mod target;

use sqlx::migrate::Migrator;
use sqlx::{Connection, Sqlite, SqliteConnection, Transaction};

use crate::error::Result;

pub use models::*;
pub use target::{AttachmentTarget, TargetSelector};

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Opens the request's transaction. Callers commit once; dropping it rolls back.
pub async fn begin(conn: &mut SqliteConnection) -> Result<Transaction<'_, Sqlite>> {
    Ok(conn.begin().await?)
}
