use clap::{Parser, Subcommand};
use folio::cli as prog_cli;
use folio::config::DbConfig;
use folio::engine::Engine;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Folio embedded document database CLI", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). If omitted, defaults are used.")]
    config: Option<PathBuf>,
    /// Override the data directory (takes precedence over config)
    #[arg(long, help = "Override the data directory. Takes precedence over config/env.")]
    db: Option<PathBuf>,
    #[arg(long, help = "Output format: human|plain|json", default_value = "human")]
    format: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // Collections
    #[command(name = "create-collection", about = "Create a collection")]
    ColCreate {
        #[arg(help = "Collection name to create")]
        name: String,
    },
    #[command(name = "drop-collection", about = "Drop a collection")]
    ColDrop {
        #[arg(help = "Collection name to drop")]
        name: String,
    },
    #[command(name = "list-collections", about = "List all collections")]
    ColList,
    #[command(name = "rename-collection", about = "Rename a collection")]
    ColRename {
        #[arg(help = "Existing collection name")]
        old: String,
        #[arg(help = "New collection name")]
        new: String,
    },
    #[command(about = "Import data into a collection from a file (NDJSON/CSV)")]
    Import {
        #[arg(help = "Target collection name")]
        collection: String,
        #[arg(help = "Path to input file")]
        file: PathBuf,
        #[arg(long, help = "Format override: ndjson|csv; defaults to auto-detect")]
        format: Option<String>,
    },
    #[command(about = "Insert a JSON document into a collection")]
    Insert {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Document JSON (e.g., {\"title\":\"Dune\"})")]
        json: String,
    },
    // Queries
    #[command(about = "Find documents matching a filter; prints NDJSON to stdout")]
    Find {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Filter JSON (e.g., {\"published_year\": {\"$gt\": 2000}})")]
        filter: String,
        #[arg(long, help = "Projection JSON (e.g., {\"title\":1,\"_id\":0})")]
        project: Option<String>,
        #[arg(long, help = "Sort JSON (e.g., {\"price\": -1})")]
        sort: Option<String>,
        #[arg(long, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "Skip N results")]
        skip: Option<usize>,
    },
    #[command(about = "Count documents matching a filter")]
    Count {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Filter JSON")]
        filter: String,
    },
    #[command(name = "update-one", about = "Update the first document matching a filter")]
    UpdateOne {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Filter JSON")]
        filter: String,
        #[arg(help = "Update JSON (e.g., {\"$set\": {\"price\": 12.99}})")]
        update: String,
    },
    #[command(name = "update-many", about = "Update all documents matching a filter")]
    UpdateMany {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Filter JSON")]
        filter: String,
        #[arg(help = "Update JSON")]
        update: String,
    },
    #[command(name = "delete-one", about = "Delete the first document matching a filter")]
    DeleteOne {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Filter JSON")]
        filter: String,
    },
    #[command(name = "delete-many", about = "Delete all documents matching a filter")]
    DeleteMany {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Filter JSON")]
        filter: String,
    },
    #[command(about = "Explain how a find would execute (plan and stats)")]
    Explain {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Filter JSON")]
        filter: String,
        #[arg(long, help = "Sort JSON")]
        sort: Option<String>,
        #[arg(long, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "Skip N results")]
        skip: Option<usize>,
    },
    #[command(about = "Run an aggregation pipeline; prints NDJSON to stdout")]
    Aggregate {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Pipeline JSON (array of stages)")]
        pipeline: String,
    },
    // Indexes
    #[command(name = "create-index", about = "Create an index on a collection")]
    CreateIndex {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Key JSON (e.g., {\"title\": 1} or {\"author\":1,\"published_year\":1})")]
        keys: String,
        #[arg(long, help = "Index kind: btree|hash; defaults to btree")]
        kind: Option<String>,
    },
    #[command(name = "drop-index", about = "Drop an index by name")]
    DropIndex {
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(help = "Index name (e.g., title_1)")]
        name: String,
    },
    #[command(name = "list-indexes", about = "List indexes on a collection")]
    ListIndexes {
        #[arg(help = "Collection name")]
        collection: String,
    },
    // Maintenance
    #[command(about = "Rewrite the write-ahead log to its live contents")]
    Compact,
}

/// Precedence: CLI > env > config file > defaults.
fn load_config(cli: &Cli) -> DbConfig {
    let mut paths: Vec<PathBuf> = vec![];
    if let Some(p) = &cli.config {
        paths.push(p.clone());
    }
    if let Ok(p) = std::env::var("FOLIO_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("folio.toml"));
    }
    let mut cfg = DbConfig::default();
    for p in paths {
        if p.exists()
            && let Ok(file_cfg) = DbConfig::load(&p)
        {
            cfg = file_cfg;
            break;
        }
    }
    if let Ok(s) = std::env::var("FOLIO_DB") {
        cfg.data_dir = PathBuf::from(s);
    }
    if let Some(db) = &cli.db {
        cfg.data_dir = db.clone();
    }
    cfg
}

fn parse_mode(s: &str) -> prog_cli::OutputMode {
    match s.to_ascii_lowercase().as_str() {
        "json" => prog_cli::OutputMode::Json,
        "plain" => prog_cli::OutputMode::Plain,
        _ => prog_cli::OutputMode::Human,
    }
}

fn to_command(commands: Commands) -> prog_cli::Command {
    match commands {
        Commands::ColCreate { name } => prog_cli::Command::ColCreate { name },
        Commands::ColDrop { name } => prog_cli::Command::ColDrop { name },
        Commands::ColList => prog_cli::Command::ColList,
        Commands::ColRename { old, new } => prog_cli::Command::ColRename { old, new },
        Commands::Import { collection, file, format } => {
            prog_cli::Command::Import { collection, file, format }
        }
        Commands::Insert { collection, json } => prog_cli::Command::Insert { collection, json },
        Commands::Find { collection, filter, project, sort, limit, skip } => {
            prog_cli::Command::Find {
                collection,
                filter_json: filter,
                project_json: project,
                sort_json: sort,
                limit,
                skip,
            }
        }
        Commands::Count { collection, filter } => {
            prog_cli::Command::Count { collection, filter_json: filter }
        }
        Commands::UpdateOne { collection, filter, update } => prog_cli::Command::UpdateOne {
            collection,
            filter_json: filter,
            update_json: update,
        },
        Commands::UpdateMany { collection, filter, update } => prog_cli::Command::UpdateMany {
            collection,
            filter_json: filter,
            update_json: update,
        },
        Commands::DeleteOne { collection, filter } => {
            prog_cli::Command::DeleteOne { collection, filter_json: filter }
        }
        Commands::DeleteMany { collection, filter } => {
            prog_cli::Command::DeleteMany { collection, filter_json: filter }
        }
        Commands::Explain { collection, filter, sort, limit, skip } => prog_cli::Command::Explain {
            collection,
            filter_json: filter,
            sort_json: sort,
            limit,
            skip,
        },
        Commands::Aggregate { collection, pipeline } => {
            prog_cli::Command::Aggregate { collection, pipeline_json: pipeline }
        }
        Commands::CreateIndex { collection, keys, kind } => {
            prog_cli::Command::IndexCreate { collection, keys_json: keys, kind }
        }
        Commands::DropIndex { collection, name } => {
            prog_cli::Command::IndexDrop { collection, name }
        }
        Commands::ListIndexes { collection } => prog_cli::Command::IndexList { collection },
        Commands::Compact => prog_cli::Command::Compact,
    }
}

fn main() {
    let cli = Cli::parse();
    let cfg = load_config(&cli);
    let log_init = if cfg.log_to_file {
        folio::logger::init_for_db(&cfg.data_dir, cfg.level_filter())
    } else {
        folio::logger::init(cfg.level_filter())
    };
    if let Err(e) = log_init {
        eprintln!("warning: logging not initialized: {e}");
    }
    let mode = parse_mode(&cli.format);
    let r = match Engine::open(cfg.engine_options()) {
        Ok(engine) => prog_cli::run_with_format(&engine, to_command(cli.command), mode),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = r {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
