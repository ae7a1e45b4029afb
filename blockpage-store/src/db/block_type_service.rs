use blockpage_render::{BlockType, Registry, RegistryHandle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::error::StoreError;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTypeRecord {
    pub name: String,
    pub category: String,
    pub template: String,
    pub default_config: Value,
    pub config_schema: Option<Value>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BlockTypeRecord> for BlockType {
    fn from(record: BlockTypeRecord) -> Self {
        BlockType {
            name: record.name,
            category: record.category,
            template: record.template,
            default_config: record.default_config,
            schema: record.config_schema.unwrap_or(Value::Null),
            enabled: record.enabled,
        }
    }
}

pub struct BlockTypeService {
    pool: PgPool,
}

impl BlockTypeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_enabled(&self) -> Result<Vec<BlockType>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BlockTypeRecord>(
            r#"
            SELECT name, category, template, default_config, config_schema, enabled, created_at, updated_at
            FROM block_types
            WHERE enabled = TRUE
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BlockType::from).collect())
    }

    pub async fn get(&self, name: &str) -> Result<Option<BlockTypeRecord>, sqlx::Error> {
        sqlx::query_as::<_, BlockTypeRecord>(
            r#"
            SELECT name, category, template, default_config, config_schema, enabled, created_at, updated_at
            FROM block_types WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a block type, or replace every field of the existing one with the same name.
    pub async fn upsert(&self, block_type: &BlockType) -> Result<BlockTypeRecord, sqlx::Error> {
        let schema = (!block_type.schema.is_null()).then_some(&block_type.schema);
        sqlx::query_as::<_, BlockTypeRecord>(
            r#"
            INSERT INTO block_types (name, category, template, default_config, config_schema, enabled)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO UPDATE SET
                category = EXCLUDED.category,
                template = EXCLUDED.template,
                default_config = EXCLUDED.default_config,
                config_schema = EXCLUDED.config_schema,
                enabled = EXCLUDED.enabled,
                updated_at = now()
            RETURNING name, category, template, default_config, config_schema, enabled, created_at, updated_at
            "#,
        )
        .bind(&block_type.name)
        .bind(&block_type.category)
        .bind(&block_type.template)
        .bind(&block_type.default_config)
        .bind(schema)
        .bind(block_type.enabled)
        .fetch_one(&self.pool)
        .await
    }

    /// Returns false if no block type has that name.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE block_types SET enabled = $2, updated_at = now() WHERE name = $1",
        )
        .bind(name)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Compile every enabled block type into a fresh registry.
    pub async fn load_registry(&self) -> Result<Registry, StoreError> {
        let rows = self.list_enabled().await?;
        Ok(Registry::load(rows)?)
    }

    /// Rebuild the registry behind `handle`. The old one stays live on failure.
    pub async fn reload(&self, handle: &RegistryHandle) -> Result<usize, StoreError> {
        let rows = self.list_enabled().await?;
        let count = handle.reload(rows)?;
        info!(block_types = count, "registry reloaded from database");
        Ok(count)
    }
}
