use blockpage_render::RenderError;
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";
/// Uniqueness constraint on `(page_id, version_number)`.
pub const VERSION_CONSTRAINT: &str = "page_versions_page_version_key";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Version {version} of page {page_id} was written concurrently")]
    VersionConflict { page_id: Uuid, version: i32 },

    #[error("Page {0} not found")]
    PageNotFound(Uuid),

    #[error("Page {page_id} has no version {version}")]
    VersionNotFound { page_id: Uuid, version: i32 },

    #[error("Theme {0} not found")]
    ThemeNotFound(Uuid),

    #[error(transparent)]
    Registry(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Classify a failed page version insert.
    ///
    /// A unique violation on the version constraint means another writer
    /// took `version` first; anything else is a plain database error.
    pub fn from_version_insert(err: sqlx::Error, page_id: Uuid, version: i32) -> Self {
        if is_version_conflict(&err) {
            StoreError::VersionConflict { page_id, version }
        } else {
            StoreError::Db(err)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

fn is_version_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db.constraint() == Some(VERSION_CONSTRAINT)
        }
        _ => false,
    }
}
