//! Postgres wiring shared by the catalog and inventory backends.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | Duplicate ISBN or location name |
//! | Database (foreign key violation) | `23503` | `MissingReference` | Inventory write for a deleted book/location |
//! | Database (check constraint violation) | `23514` | `Constraint` | Negative quantity reached the table |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / Io / other | N/A | `Backend` | Connection failures |

pub mod filter;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use shelfkeep_core::Resource;

use crate::error::StoreError;

const SCHEMA: &str = include_str!("../../migrations/0001_schema.sql");

/// Open a connection pool.
#[instrument(skip(url), err)]
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Create tables and indexes if they do not exist yet. Idempotent.
#[instrument(skip(pool), err)]
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    Ok(())
}

/// Map a SQLx error into a [`StoreError`].
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") => {
                    let resource = match db_err.constraint() {
                        Some(name) if name.contains("location") => Resource::Location,
                        _ => Resource::Book,
                    };
                    StoreError::MissingReference(resource)
                }
                Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Map a row decoding failure.
pub(crate) fn corrupt(operation: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("failed to decode row in {}: {}", operation, err))
}

/// Signed row count as an unsigned total.
pub(crate) fn total_from(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Stored versions are `BIGINT`; they never go negative.
pub(crate) fn version_from(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| StoreError::Corrupt(format!("negative version {version}")))
}

pub(crate) fn version_to(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Constraint(format!("version {version} out of range")))
}

pub(crate) fn direction_sql(direction: shelfkeep_core::Direction) -> &'static str {
    match direction {
        shelfkeep_core::Direction::Asc => " ASC",
        shelfkeep_core::Direction::Desc => " DESC",
    }
}

/// `LIMIT`/`OFFSET` values for a page request.
pub(crate) fn limit_offset<K>(
    page: &shelfkeep_core::PageRequest<K>,
) -> Result<(i64, i64), StoreError> {
    let offset = i64::try_from(page.offset())
        .map_err(|_| StoreError::Constraint(format!("page offset {} out of range", page.offset())))?;
    Ok((i64::from(page.size()), offset))
}
