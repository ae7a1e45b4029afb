use blockpage_render::document::{render_document, PageMeta};
use blockpage_render::{
    load_registry, parse_block_types, render_page, schema, BlockInstance, BlockType, RenderError,
};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Validate block type definitions and preview pages built from them
#[derive(Debug, Parser)]
#[command(name = "blockpage-check", version)]
struct Cli {
    /// YAML files, each holding one block type or a list of them
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Render a JSON block list against the loaded block types
    #[arg(long, value_name = "PAGE_JSON")]
    render: Option<PathBuf>,

    /// With --render, wrap the output in a full HTML document with this title
    #[arg(long, value_name = "TITLE", requires = "render")]
    document: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut exit_code = 0;
    let mut all_types: Vec<BlockType> = Vec::new();

    for file_path in &cli.files {
        match check_file(file_path) {
            Ok(types) => {
                println!("✓ {} is valid ({} block types)", file_path.display(), types.len());
                all_types.extend(types);
            }
            Err(e) => {
                eprintln!("✗ {} has errors:", file_path.display());
                print_error(&e);
                exit_code = 1;
            }
        }
    }

    if let Some(page_path) = &cli.render {
        if exit_code != 0 {
            eprintln!("Skipping render: block type definitions have errors");
            process::exit(exit_code);
        }
        match render_file(page_path, all_types, cli.document.as_deref()) {
            Ok(html) => print!("{}", html),
            Err(e) => {
                eprintln!("✗ {} could not be rendered:", page_path.display());
                print_error(&e);
                exit_code = 1;
            }
        }
    }

    process::exit(exit_code);
}

fn check_file(path: &Path) -> Result<Vec<BlockType>, RenderError> {
    let content = fs::read_to_string(path)
        .map_err(|e| RenderError::Deserialization(format!("Failed to read file: {}", e)))?;

    let types = parse_block_types(&content)?;
    load_registry(types.clone())?;

    for block_type in &types {
        for issue in schema::check(&block_type.schema, &block_type.default_config)? {
            eprintln!("  warning: '{}' default config: {}", block_type.name, issue);
        }
    }
    Ok(types)
}

fn render_file(
    path: &Path,
    types: Vec<BlockType>,
    document_title: Option<&str>,
) -> Result<String, RenderError> {
    let content = fs::read_to_string(path)
        .map_err(|e| RenderError::Deserialization(format!("Failed to read file: {}", e)))?;
    let blocks: Vec<BlockInstance> = serde_json::from_str(&content)?;
    let registry = load_registry(types)?;
    let body = render_page(&blocks, &registry);

    Ok(match document_title {
        Some(title) => {
            let seo = serde_json::Value::Null;
            render_document(
                &PageMeta {
                    title,
                    seo_settings: &seo,
                },
                &body,
                None,
            )
        }
        None => body,
    })
}

fn print_error(error: &RenderError) {
    match error {
        RenderError::TemplateSyntax {
            block_type,
            line,
            column,
            message,
        } => {
            eprintln!("  Template syntax error in '{}' at line {}, column {}:", block_type, line, column);
            eprintln!("    {}", message);
        }
        RenderError::InvalidBlockType { name, reason } => {
            eprintln!("  Invalid block type '{}':", name);
            eprintln!("    {}", reason);
        }
        RenderError::Deserialization(msg) => {
            eprintln!("  Deserialization error:");
            eprintln!("    {}", msg);
        }
        e => {
            eprintln!("  {}", e);
        }
    }
}
