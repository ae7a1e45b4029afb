use blockpage_render::BlockInstance;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::versioning::next_version_number;

/// A page's block list as it was before one update. Never modified.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVersion {
    pub id: Uuid,
    pub page_id: Uuid,
    pub version_number: i32,
    pub blocks_snapshot: Json<Vec<BlockInstance>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PageVersion {
    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks_snapshot.0
    }
}

pub struct PageVersionService {
    pool: PgPool,
}

impl PageVersionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All versions of a page, oldest first.
    pub async fn list(&self, page_id: Uuid) -> Result<Vec<PageVersion>, sqlx::Error> {
        sqlx::query_as::<_, PageVersion>(
            r#"
            SELECT id, page_id, version_number, blocks_snapshot, created_by, created_at
            FROM page_versions
            WHERE page_id = $1
            ORDER BY version_number ASC
            "#,
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get(&self, page_id: Uuid, version_number: i32) -> Result<Option<PageVersion>, sqlx::Error> {
        sqlx::query_as::<_, PageVersion>(
            r#"
            SELECT id, page_id, version_number, blocks_snapshot, created_by, created_at
            FROM page_versions
            WHERE page_id = $1 AND version_number = $2
            "#,
        )
        .bind(page_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
    }

    /// Highest version number of a page, or None if it has no history yet.
    pub async fn latest_number(&self, page_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::max_version(&mut conn, page_id).await
    }

    /// Snapshot `current_blocks` as the next version of `page_id`, if the page exists.
    ///
    /// Returns `Ok(None)` for a page that is being created. Must run in the
    /// same transaction as the page write it precedes.
    pub async fn record_version_on_update(
        conn: &mut PgConnection,
        page_id: Uuid,
        current_blocks: &[BlockInstance],
        editor_id: Uuid,
    ) -> Result<Option<PageVersion>, StoreError> {
        let (exists,) = sqlx::query_as::<_, (bool,)>("SELECT EXISTS (SELECT 1 FROM pages WHERE id = $1)")
            .bind(page_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            return Ok(None);
        }
        Self::snapshot(conn, page_id, current_blocks, editor_id)
            .await
            .map(Some)
    }

    /// Insert `blocks` as version `max + 1` of an existing page.
    ///
    /// Fails with [`StoreError::VersionConflict`] when a concurrent writer
    /// took the same number; the caller's transaction is then aborted.
    pub async fn snapshot(
        conn: &mut PgConnection,
        page_id: Uuid,
        blocks: &[BlockInstance],
        editor_id: Uuid,
    ) -> Result<PageVersion, StoreError> {
        let version = next_version_number(Self::max_version(conn, page_id).await?);

        let record = sqlx::query_as::<_, PageVersion>(
            r#"
            INSERT INTO page_versions (id, page_id, version_number, blocks_snapshot, created_by)
            VALUES (gen_random_uuid(), $1, $2, $3, $4)
            RETURNING id, page_id, version_number, blocks_snapshot, created_by, created_at
            "#,
        )
        .bind(page_id)
        .bind(version)
        .bind(Json(blocks))
        .bind(editor_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| StoreError::from_version_insert(e, page_id, version))?;

        debug!(%page_id, version, blocks = blocks.len(), "page version recorded");
        Ok(record)
    }

    async fn max_version(conn: &mut PgConnection, page_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        let (max,) = sqlx::query_as::<_, (Option<i32>,)>(
            "SELECT MAX(version_number) FROM page_versions WHERE page_id = $1",
        )
        .bind(page_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::page_service::PageService;
    use serde_json::json;

    #[test]
    fn test_version_serializes_in_camel_case() {
        let page_id = Uuid::new_v4();
        let version = PageVersion {
            id: Uuid::new_v4(),
            page_id,
            version_number: 3,
            blocks_snapshot: Json(vec![BlockInstance::new("hero", json!({ "title": "Hi" }))]),
            created_by: Uuid::nil(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(&version).unwrap();
        assert_eq!(value["pageId"], json!(page_id.to_string()));
        assert_eq!(value["versionNumber"], json!(3));
        assert_eq!(
            value["blocksSnapshot"],
            json!([{ "type": "hero", "config": { "title": "Hi" } }])
        );
        assert_eq!(value["createdBy"], json!("00000000-0000-0000-0000-000000000000"));
        assert_eq!(value["createdAt"], json!("2024-05-01T12:00:00Z"));
    }

    #[tokio::test]
    async fn test_no_version_for_missing_page() {
        let pool = super::super::test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let recorded = PageVersionService::record_version_on_update(
            &mut conn,
            Uuid::new_v4(),
            &[],
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert!(recorded.is_none());
    }

    #[tokio::test]
    async fn test_record_version_numbers_from_one() {
        let pool = super::super::test_pool().await;
        let pages = PageService::new(pool.clone());
        let versions = PageVersionService::new(pool.clone());
        let editor = Uuid::new_v4();

        let page = pages
            .create(Uuid::new_v4(), "home", "Home", &[], &json!({}))
            .await
            .unwrap();
        assert_eq!(versions.latest_number(page.id).await.unwrap(), None);

        let blocks = vec![BlockInstance::new("hero", json!({ "title": "v0" }))];
        let mut conn = pool.acquire().await.unwrap();
        for expected in 1..=2 {
            let version = PageVersionService::record_version_on_update(&mut conn, page.id, &blocks, editor)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(version.version_number, expected);
            assert_eq!(version.blocks(), blocks.as_slice());
            assert_eq!(version.created_by, editor);
        }
        assert_eq!(versions.latest_number(page.id).await.unwrap(), Some(2));
        assert!(versions.get(page.id, 3).await.unwrap().is_none());
    }
}
