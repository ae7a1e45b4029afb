use anyhow::{Context, Result, bail};
use blockpage_render::document::{PageMeta, render_document};
use blockpage_render::render_page;
use blockpage_store::db::{self, block_type_service::BlockTypeService};
use blockpage_store::{PageService, PageVersionService, StoreConfig, ThemeService};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Operator tool for the block page store
#[derive(Debug, Parser)]
#[command(name = "blockpage", version)]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or update the database schema
    Migrate,
    /// Render a stored page to stdout
    Render {
        #[arg(long)]
        page: Uuid,
        /// Print only the block HTML, without the surrounding document
        #[arg(long)]
        fragment: bool,
    },
    /// List a page's version history
    Versions {
        #[arg(long)]
        page: Uuid,
        /// Print the full history, snapshots included, as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put a past version's blocks back on a page
    Restore {
        #[arg(long)]
        page: Uuid,
        #[arg(long)]
        version: i32,
        #[arg(long)]
        editor: Uuid,
    },
    /// Make a theme the tenant's active theme
    ActivateTheme {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        theme: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = StoreConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config = config.with_database_url(url);
    }

    let pool = db::connect(&config)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::Migrate => {
            db::run_migrations(&pool).await?;
            println!("✓ migrations applied");
        }
        Command::Render { page, fragment } => {
            let pages = PageService::new(pool.clone());
            let Some(record) = pages.get(page).await? else {
                bail!("page {} not found", page);
            };
            let registry = BlockTypeService::new(pool.clone()).load_registry().await?;
            let body = render_page(record.blocks(), &registry);

            if fragment {
                print!("{}", body);
            } else {
                let theme = ThemeService::new(pool).active(record.tenant_id).await?;
                let meta = PageMeta {
                    title: &record.title,
                    seo_settings: &record.seo_settings,
                };
                print!(
                    "{}",
                    render_document(&meta, &body, theme.as_ref().map(|t| &t.settings))
                );
            }
        }
        Command::Versions { page, json } => {
            let versions = PageVersionService::new(pool).list(page).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&versions)?);
                return Ok(());
            }
            if versions.is_empty() {
                println!("page {} has no versions", page);
            }
            for version in versions {
                println!(
                    "{:>4}  {}  {} blocks  by {}",
                    version.version_number,
                    version.created_at.format("%Y-%m-%d %H:%M:%S"),
                    version.blocks().len(),
                    version.created_by
                );
            }
        }
        Command::Restore {
            page,
            version,
            editor,
        } => {
            let pages = PageService::new(pool).with_max_attempts(config.version_retries);
            let (_, snapshot) = pages.restore_version(page, version, editor).await?;
            println!(
                "✓ restored version {} of page {} (previous blocks saved as version {})",
                version, page, snapshot.version_number
            );
        }
        Command::ActivateTheme { tenant, theme } => {
            let activated = ThemeService::new(pool).activate(tenant, theme).await?;
            println!("✓ theme '{}' is now active", activated.name);
        }
    }

    Ok(())
}
