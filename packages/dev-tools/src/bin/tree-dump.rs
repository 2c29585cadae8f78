//! Collection Tree Dump
//!
//! Opens a hierarchy database and prints its views as JSON, for manual
//! inspection of stored hierarchies.
//!
//! # Usage
//!
//! ```bash
//! # Roots and select options, as an admin sees them
//! cargo run --bin tree-dump
//!
//! # Breadcrumb tree of collection 12, as a public visitor sees it
//! cargo run --bin tree-dump -- --public 12
//!
//! # Migrate historical schemas first
//! cargo run --bin tree-dump -- --upgrade
//! ```
//!
//! # Environment Variables
//!
//! - `TREE_DB_PATH`: Database file (default: ~/.collection-tree/collection-tree.db)
//! - `TREE_CONFIG_PATH`: JSON configuration file (default: built-in defaults)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use collection_tree_core::config::{TreeConfig, Viewer};
use collection_tree_core::db::{DatabaseService, TursoStore};
use collection_tree_core::models::CollectionId;
use collection_tree_core::services::TreeSession;
use serde_json::json;

struct Args {
    upgrade: bool,
    public: bool,
    collection_id: Option<CollectionId>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        upgrade: false,
        public: false,
        collection_id: None,
    };

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--upgrade" => args.upgrade = true,
            "--public" => args.public = true,
            other => {
                let id = other
                    .parse::<CollectionId>()
                    .map_err(|_| anyhow::anyhow!("Unexpected argument: {}", other))?;
                args.collection_id = Some(id);
            }
        }
    }

    Ok(args)
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?;
    Ok(home_dir
        .join(".collection-tree")
        .join("collection-tree.db"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;

    let db_path = match env::var("TREE_DB_PATH") {
        Ok(path) => PathBuf::from(path),
        Err(_) => default_db_path()?,
    };

    let config = match env::var("TREE_CONFIG_PATH") {
        Ok(path) => TreeConfig::load(&path).await?,
        Err(_) => TreeConfig::default(),
    };

    tracing::info!("Database: {}", db_path.display());

    let db = Arc::new(DatabaseService::with_node_source(db_path, config.node_source.clone()).await?);

    if args.upgrade {
        let report = db.upgrade().await?;
        tracing::info!("Upgrade: {:?}", report);
    }

    let viewer = if args.public {
        Viewer::public()
    } else {
        Viewer::admin()
    };

    let store = Arc::new(TursoStore::new(db));
    let mut session = TreeSession::new(store, config, viewer)?;

    let roots = session.get_root_nodes().await?;
    let select_options = session.get_select_options(None).await?;
    let mut output = json!({
        "roots": roots,
        "selectOptions": select_options,
    });

    if let Some(id) = args.collection_id {
        output["tree"] = serde_json::to_value(session.get_tree(id).await?)?;
        output["ancestors"] = serde_json::to_value(session.get_ancestors(id, false).await?)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
