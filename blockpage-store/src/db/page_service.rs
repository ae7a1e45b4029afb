use blockpage_render::BlockInstance;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::page_version_service::{PageVersion, PageVersionService};
use crate::config::DEFAULT_VERSION_RETRIES;
use crate::error::StoreError;
use crate::versioning::retry_on_conflict;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub slug: String,
    pub title: String,
    /// Rendering order
    pub blocks: Json<Vec<BlockInstance>>,
    pub is_published: bool,
    pub seo_settings: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks.0
    }
}

/// Result of a block list write.
#[derive(Debug, Clone, Serialize)]
pub struct PageUpdate {
    pub page: Page,
    /// Snapshot of the previous block list; None when the write created the page.
    pub version: Option<PageVersion>,
}

pub struct PageService {
    pool: PgPool,
    max_attempts: u32,
}

impl PageService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            max_attempts: DEFAULT_VERSION_RETRIES,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        slug: &str,
        title: &str,
        blocks: &[BlockInstance],
        seo_settings: &Value,
    ) -> Result<Page, sqlx::Error> {
        sqlx::query_as::<_, Page>(
            r#"
            INSERT INTO pages (id, tenant_id, slug, title, blocks, seo_settings)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5)
            RETURNING id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(slug)
        .bind(title)
        .bind(Json(blocks))
        .bind(seo_settings)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get(&self, page_id: Uuid) -> Result<Option<Page>, sqlx::Error> {
        sqlx::query_as::<_, Page>(
            r#"
            SELECT id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
            FROM pages WHERE id = $1
            "#,
        )
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_by_slug(&self, tenant_id: Uuid, slug: &str) -> Result<Option<Page>, sqlx::Error> {
        sqlx::query_as::<_, Page>(
            r#"
            SELECT id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
            FROM pages WHERE tenant_id = $1 AND slug = $2
            "#,
        )
        .bind(tenant_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
    }

    /// Replace a page's blocks, snapshotting the previous list first.
    ///
    /// Snapshot and write commit together. A version conflict reruns the
    /// whole transaction up to the configured number of attempts.
    pub async fn update_blocks(
        &self,
        page_id: Uuid,
        blocks: &[BlockInstance],
        editor_id: Uuid,
    ) -> Result<(Page, PageVersion), StoreError> {
        retry_on_conflict(self.max_attempts, |_| {
            self.try_update_blocks(page_id, blocks, editor_id)
        })
        .await
    }

    async fn try_update_blocks(
        &self,
        page_id: Uuid,
        blocks: &[BlockInstance],
        editor_id: Uuid,
    ) -> Result<(Page, PageVersion), StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = lock_page(&mut tx, page_id).await? else {
            tx.rollback().await?;
            return Err(StoreError::PageNotFound(page_id));
        };
        let version = PageVersionService::snapshot(&mut tx, page_id, current.blocks(), editor_id).await?;
        let page = write_blocks(&mut tx, page_id, blocks).await?;

        tx.commit().await?;
        info!(%page_id, version = version.version_number, "page blocks updated");
        Ok((page, version))
    }

    /// Save a tenant's page by slug, creating it if needed.
    ///
    /// Creating a page records no version; every later save snapshots the
    /// list it replaces.
    pub async fn upsert_blocks(
        &self,
        tenant_id: Uuid,
        slug: &str,
        title: &str,
        blocks: &[BlockInstance],
        editor_id: Uuid,
    ) -> Result<PageUpdate, StoreError> {
        retry_on_conflict(self.max_attempts, |_| {
            self.try_upsert_blocks(tenant_id, slug, title, blocks, editor_id)
        })
        .await
    }

    async fn try_upsert_blocks(
        &self,
        tenant_id: Uuid,
        slug: &str,
        title: &str,
        blocks: &[BlockInstance],
        editor_id: Uuid,
    ) -> Result<PageUpdate, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = match lock_page_by_slug(&mut tx, tenant_id, slug).await? {
            Some(page) => page,
            None => match insert_if_absent(&mut tx, tenant_id, slug, title, blocks).await? {
                Some(page) => {
                    tx.commit().await?;
                    info!(page_id = %page.id, %tenant_id, slug, "page created");
                    return Ok(PageUpdate {
                        page,
                        version: None,
                    });
                }
                // A concurrent save created it first; it is committed and visible now.
                None => lock_page_by_slug(&mut tx, tenant_id, slug)
                    .await?
                    .ok_or(StoreError::Db(sqlx::Error::RowNotFound))?,
            },
        };

        let version = PageVersionService::record_version_on_update(
            &mut tx,
            existing.id,
            existing.blocks(),
            editor_id,
        )
        .await?;
        let page = sqlx::query_as::<_, Page>(
            r#"
            UPDATE pages SET blocks = $2, title = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
            "#,
        )
        .bind(existing.id)
        .bind(Json(blocks))
        .bind(title)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            page_id = %page.id,
            version = ?version.as_ref().map(|v| v.version_number),
            "page blocks saved"
        );
        Ok(PageUpdate { page, version })
    }

    /// Put a past version's blocks back. The list being replaced is snapshotted like any update.
    pub async fn restore_version(
        &self,
        page_id: Uuid,
        version_number: i32,
        editor_id: Uuid,
    ) -> Result<(Page, PageVersion), StoreError> {
        let versions = PageVersionService::new(self.pool.clone());
        let Some(version) = versions.get(page_id, version_number).await? else {
            return Err(StoreError::VersionNotFound {
                page_id,
                version: version_number,
            });
        };
        info!(%page_id, version_number, "restoring page version");
        self.update_blocks(page_id, version.blocks(), editor_id).await
    }

    pub async fn set_published(&self, page_id: Uuid, is_published: bool) -> Result<Page, StoreError> {
        sqlx::query_as::<_, Page>(
            r#"
            UPDATE pages SET is_published = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
            "#,
        )
        .bind(page_id)
        .bind(is_published)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::PageNotFound(page_id))
    }

    /// Delete a page and, by cascade, its whole version history.
    pub async fn delete(&self, page_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(page_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn lock_page(conn: &mut PgConnection, page_id: Uuid) -> Result<Option<Page>, sqlx::Error> {
    sqlx::query_as::<_, Page>(
        r#"
        SELECT id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
        FROM pages WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(page_id)
    .fetch_optional(conn)
    .await
}

async fn lock_page_by_slug(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    slug: &str,
) -> Result<Option<Page>, sqlx::Error> {
    sqlx::query_as::<_, Page>(
        r#"
        SELECT id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
        FROM pages WHERE tenant_id = $1 AND slug = $2
        FOR UPDATE
        "#,
    )
    .bind(tenant_id)
    .bind(slug)
    .fetch_optional(conn)
    .await
}

async fn insert_if_absent(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    slug: &str,
    title: &str,
    blocks: &[BlockInstance],
) -> Result<Option<Page>, sqlx::Error> {
    sqlx::query_as::<_, Page>(
        r#"
        INSERT INTO pages (id, tenant_id, slug, title, blocks)
        VALUES (gen_random_uuid(), $1, $2, $3, $4)
        ON CONFLICT (tenant_id, slug) DO NOTHING
        RETURNING id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
        "#,
    )
    .bind(tenant_id)
    .bind(slug)
    .bind(title)
    .bind(Json(blocks))
    .fetch_optional(conn)
    .await
}

async fn write_blocks(
    conn: &mut PgConnection,
    page_id: Uuid,
    blocks: &[BlockInstance],
) -> Result<Page, sqlx::Error> {
    sqlx::query_as::<_, Page>(
        r#"
        UPDATE pages SET blocks = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, tenant_id, slug, title, blocks, is_published, seo_settings, created_at, updated_at
        "#,
    )
    .bind(page_id)
    .bind(Json(blocks))
    .fetch_one(conn)
    .await
}
