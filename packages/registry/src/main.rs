use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::{ContentHash, EnvRemovalPolicy, RemovalPolicy};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use registry::FileRegistry;
use registry::config::AppConfig;
use registry::database::init_db;
use registry::models::file::{
    CreateFileParams, FileCategory, FileQuery, SortOrder, UpdateFileParams,
};

#[derive(Parser)]
#[command(name = "registry", about = "Inspect and maintain per-user file records")]
struct Cli {
    /// User whose records are addressed.
    #[arg(long, env = "REGISTRY_USER")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a local file, deduplicating its content by SHA-256.
    Add {
        path: PathBuf,
        /// Storage URL the blob was uploaded to.
        #[arg(long)]
        url: String,
        /// Display name (defaults to the file name).
        #[arg(long)]
        name: Option<String>,
        /// Link the record to a knowledge base.
        #[arg(long = "kb")]
        knowledge_base: Option<String>,
    },
    /// List records.
    Ls {
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        category: Option<FileCategory>,
        #[arg(long = "kb")]
        knowledge_base: Option<String>,
        /// Hide records linked to any knowledge base.
        #[arg(long)]
        hide_kb_files: bool,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        order: Option<SortOrder>,
    },
    /// Show one record.
    Show { id: String },
    /// Rename a record.
    Rename { id: String, name: String },
    /// Delete records.
    Rm {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete every record of the user.
    Clear,
    /// Total logical bytes of the user's records.
    Usage,
    /// Look up a content hash in the content store.
    CheckHash { hash: String },
    /// Count records of all users referencing a content hash.
    CountHash { hash: String },
    /// Remove an unreferenced content store entry.
    DropGlobal { hash: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    let db = init_db(&config.database.url, config.database.max_connections)
        .await
        .context("failed to initialize database")?;

    let policy: Arc<dyn RemovalPolicy> = Arc::new(
        EnvRemovalPolicy::default().with_fallback(config.files.disable_remove_global_file),
    );
    let files = FileRegistry::new(&db, cli.user, policy);

    match cli.command {
        Command::Add {
            path,
            url,
            name,
            knowledge_base,
        } => {
            let hash_path = path.clone();
            let (hash, size) = tokio::task::spawn_blocking(move || {
                let file = std::fs::File::open(&hash_path)?;
                ContentHash::compute_reader(std::io::BufReader::new(file))
            })
            .await??;

            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("path has no file name")?,
            };
            let file_type = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string();

            let hash = hash.to_hex();
            let known = files.check_hash(&hash).await?.exists;
            let record = files
                .create(CreateFileParams {
                    name,
                    url,
                    size: record_size(size)?,
                    file_type,
                    file_hash: Some(hash),
                    knowledge_base_id: knowledge_base,
                    insert_global_file: true,
                    ..Default::default()
                })
                .await?;
            info!(id = %record.id, deduplicated = known, "registered file");
            print_json(&record)?;
        }
        Command::Ls {
            q,
            category,
            knowledge_base,
            hide_kb_files,
            sort,
            order,
        } => {
            let records = files
                .query(FileQuery {
                    q,
                    category,
                    knowledge_base_id: knowledge_base,
                    show_files_in_knowledge_base: hide_kb_files.then_some(false),
                    sorter: sort,
                    sort_type: order,
                })
                .await?;
            print_json(&records)?;
        }
        Command::Show { id } => print_json(&files.find_by_id(&id).await?)?,
        Command::Rename { id, name } => {
            let patch = UpdateFileParams {
                name: Some(name),
                ..Default::default()
            };
            match files.update(&id, patch).await? {
                Some(record) => print_json(&record)?,
                None => anyhow::bail!("file {id} not found"),
            }
        }
        Command::Rm { ids } => print_json(&files.delete_many(&ids).await?)?,
        Command::Clear => print_json(&files.clear().await?)?,
        Command::Usage => print_json(&serde_json::json!({ "bytes": files.count_usage().await? }))?,
        Command::CheckHash { hash } => print_json(&files.check_hash(&hash).await?)?,
        Command::CountHash { hash } => {
            print_json(&serde_json::json!({ "count": files.count_files_by_hash(&hash).await? }))?
        }
        Command::DropGlobal { hash } => {
            print_json(&serde_json::json!({ "removed": files.delete_global_file(&hash).await? }))?
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Byte length of a local file as stored on the record.
fn record_size(len: u64) -> anyhow::Result<i64> {
    i64::try_from(len).with_context(|| format!("file length {len} does not fit a record size"))
}
