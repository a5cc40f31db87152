use crate::document::Document;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::import::{ImportOptions, import_file};
use crate::query::{self, FindOptions};
use crate::utils::json::{doc_to_json, parse_json_document};

use super::command::Command;
use super::util::{parse_import_format, parse_index_keys, parse_index_kind};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

pub fn run(engine: &Engine, cmd: Command) -> Result<(), Box<dyn std::error::Error>> {
    run_with_format(engine, cmd, OutputMode::Human)
}

fn resolve(
    engine: &Engine,
    name: &str,
) -> Result<std::sync::Arc<crate::collection::Collection>, DbError> {
    engine.get_collection(name).ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
}

fn find_options(
    project_json: Option<String>,
    sort_json: Option<String>,
    limit: Option<usize>,
    skip: Option<usize>,
) -> Result<FindOptions, DbError> {
    let mut opts = FindOptions::default();
    if let Some(p) = project_json {
        opts.projection = Some(query::parse_projection_json(&p)?);
    }
    if let Some(s) = sort_json {
        opts.sort = Some(query::parse_sort_json(&s)?);
    }
    opts.limit = limit;
    opts.skip = skip;
    Ok(opts)
}

pub fn run_with_format(
    engine: &Engine,
    cmd: Command,
    mode: OutputMode,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::ColCreate { name } => {
            engine.create_collection(name.clone())?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"action":"created","collection": name});
                    println!("{json}");
                }
                OutputMode::Plain => println!("created {name}"),
                OutputMode::Human => println!("created collection={name}"),
            }
            Ok(())
        }
        Command::ColDrop { name } => {
            let dropped = engine.drop_collection(&name)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"action":"dropped","collection": name, "existed": dropped});
                    println!("{json}");
                }
                _ => println!("dropped={dropped}"),
            }
            Ok(())
        }
        Command::ColList => {
            let names = engine.list_collection_names();
            match mode {
                OutputMode::Json => {
                    let names_json = serde_json::to_string(&names)?;
                    println!("{names_json}");
                }
                _ => {
                    for n in names {
                        println!("{n}");
                    }
                }
            }
            Ok(())
        }
        Command::ColRename { old, new } => {
            engine.rename_collection(&old, &new)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"action":"renamed","from": old, "to": new});
                    println!("{json}");
                }
                _ => println!("renamed {old} -> {new}"),
            }
            Ok(())
        }
        Command::Import { collection, file, format } => {
            let col = match engine.get_collection(&collection) {
                Some(c) => c,
                None => engine.create_collection(collection.clone())?,
            };
            let opts =
                ImportOptions { format: parse_import_format(&format), ..ImportOptions::default() };
            let report = import_file(&col, &file, &opts)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({
                        "inserted": report.inserted,
                        "skipped": report.skipped
                    });
                    println!("{json}");
                }
                _ => println!("inserted={} skipped={}", report.inserted, report.skipped),
            }
            Ok(())
        }
        Command::Insert { collection, json } => {
            let col = match engine.get_collection(&collection) {
                Some(c) => c,
                None => engine.create_collection(collection.clone())?,
            };
            let bdoc = parse_json_document(&json)?;
            let id = col.insert_document(Document::new(bdoc))?;
            match mode {
                OutputMode::Json => {
                    let id0 = id.0;
                    let out = serde_json::json!({"id": id0});
                    println!("{out}");
                }
                _ => println!("{id}"),
            }
            Ok(())
        }
        Command::Find { collection, filter_json, project_json, sort_json, limit, skip } => {
            let col = resolve(engine, &collection)?;
            let filter = query::parse_filter_json(&filter_json)?;
            let opts = find_options(project_json, sort_json, limit, skip)?;
            let cursor = query::find_docs(&col, &filter, &opts);
            // Stream as NDJSON to stdout
            for doc in cursor {
                let line = serde_json::to_string(&doc_to_json(&doc.data.0))?;
                println!("{line}");
            }
            Ok(())
        }
        Command::Count { collection, filter_json } => {
            let col = resolve(engine, &collection)?;
            let filter = query::parse_filter_json(&filter_json)?;
            let n = query::count_docs(&col, &filter);
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"count": n});
                    println!("{json}");
                }
                _ => println!("{n}"),
            }
            Ok(())
        }
        Command::UpdateOne { collection, filter_json, update_json } => {
            let col = resolve(engine, &collection)?;
            let filter = query::parse_filter_json(&filter_json)?;
            let update = query::parse_update_json(&update_json)?;
            let r = query::update_one(&col, &filter, &update)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"matched": r.matched, "modified": r.modified});
                    println!("{json}");
                }
                _ => println!("matched={} modified={}", r.matched, r.modified),
            }
            Ok(())
        }
        Command::UpdateMany { collection, filter_json, update_json } => {
            let col = resolve(engine, &collection)?;
            let filter = query::parse_filter_json(&filter_json)?;
            let update = query::parse_update_json(&update_json)?;
            let r = query::update_many(&col, &filter, &update)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"matched": r.matched, "modified": r.modified});
                    println!("{json}");
                }
                _ => println!("matched={} modified={}", r.matched, r.modified),
            }
            Ok(())
        }
        Command::DeleteOne { collection, filter_json } => {
            let col = resolve(engine, &collection)?;
            let filter = query::parse_filter_json(&filter_json)?;
            let r = query::delete_one(&col, &filter)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"deleted": r.deleted});
                    println!("{json}");
                }
                _ => println!("deleted={}", r.deleted),
            }
            Ok(())
        }
        Command::DeleteMany { collection, filter_json } => {
            let col = resolve(engine, &collection)?;
            let filter = query::parse_filter_json(&filter_json)?;
            let r = query::delete_many(&col, &filter)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"deleted": r.deleted});
                    println!("{json}");
                }
                _ => println!("deleted={}", r.deleted),
            }
            Ok(())
        }
        Command::Explain { collection, filter_json, sort_json, limit, skip } => {
            let col = resolve(engine, &collection)?;
            let filter = query::parse_filter_json(&filter_json)?;
            let opts = find_options(None, sort_json, limit, skip)?;
            let report = query::explain(&col, &filter, &opts);
            let json_report = serde_json::to_string_pretty(&report)?;
            println!("{json_report}");
            Ok(())
        }
        Command::Aggregate { collection, pipeline_json } => {
            let col = resolve(engine, &collection)?;
            let pipeline = crate::aggregate::parse_pipeline_json(&pipeline_json)?;
            let results = crate::aggregate::run_pipeline(&col, &pipeline)?;
            for doc in results {
                let line = serde_json::to_string(&doc_to_json(&doc))?;
                println!("{line}");
            }
            Ok(())
        }
        Command::IndexCreate { collection, keys_json, kind } => {
            let col = resolve(engine, &collection)?;
            let spec = parse_index_keys(&keys_json)?;
            let name = col.create_index(spec, parse_index_kind(&kind))?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"created": name});
                    println!("{json}");
                }
                _ => println!("{name}"),
            }
            Ok(())
        }
        Command::IndexDrop { collection, name } => {
            let col = resolve(engine, &collection)?;
            let dropped = col.drop_index(&name)?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"dropped": dropped});
                    println!("{json}");
                }
                _ => println!("dropped={dropped}"),
            }
            Ok(())
        }
        Command::IndexList { collection } => {
            let col = resolve(engine, &collection)?;
            let descriptors = col.list_indexes();
            match mode {
                OutputMode::Json => {
                    let json = serde_json::to_string(&descriptors)?;
                    println!("{json}");
                }
                _ => {
                    for d in descriptors {
                        println!("{}\t{:?}", d.name, d.kind);
                    }
                }
            }
            Ok(())
        }
        Command::Compact => {
            engine.compact()?;
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"compacted": true});
                    println!("{json}");
                }
                _ => println!("compacted"),
            }
            Ok(())
        }
    }
}
