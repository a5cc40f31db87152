use crate::errors::DbError;
use crate::import::ImportFormat;
use crate::index::{IndexKind, IndexSpec};
use crate::query::Order;

pub fn parse_format_input(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|x| x.to_lowercase())
}

pub fn parse_import_format(s: &Option<String>) -> ImportFormat {
    match parse_format_input(s).as_deref() {
        Some("csv") => ImportFormat::Csv,
        Some("ndjson" | "json" | "jsonl") => ImportFormat::Ndjson,
        _ => ImportFormat::Auto,
    }
}

pub fn parse_index_kind(s: &Option<String>) -> IndexKind {
    match parse_format_input(s).as_deref() {
        Some("hash") => IndexKind::Hash,
        _ => IndexKind::BTree,
    }
}

/// Parse an index key document like `{"title": 1}` or
/// `{"author": 1, "published_year": -1}` into an ordered field list.
pub fn parse_index_keys(json: &str) -> Result<IndexSpec, DbError> {
    let v: serde_json::Value = serde_json::from_str(json)?;
    let obj = v
        .as_object()
        .ok_or_else(|| DbError::QueryError("index keys must be a JSON object".into()))?;
    if obj.is_empty() {
        return Err(DbError::QueryError("index keys must not be empty".into()));
    }
    let mut fields = Vec::with_capacity(obj.len());
    for (field, dir) in obj {
        let order = match dir.as_i64() {
            Some(1) => Order::Asc,
            Some(-1) => Order::Desc,
            _ => {
                return Err(DbError::QueryError(format!(
                    "index direction for '{field}' must be 1 or -1"
                )));
            }
        };
        fields.push((field.clone(), order));
    }
    Ok(IndexSpec::compound(fields))
}
