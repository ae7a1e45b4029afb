//! PostgreSQL persistence for block pages: block types, pages, append-only
//! page versions, and per-tenant themes.

pub mod config;
pub mod db;
pub mod error;
pub mod versioning;

pub use config::StoreConfig;
pub use db::block_type_service::{BlockTypeRecord, BlockTypeService};
pub use db::page_service::{Page, PageService, PageUpdate};
pub use db::page_version_service::{PageVersion, PageVersionService};
pub use db::theme_service::{Theme, ThemeService};
pub use error::{StoreError, StoreResult};
