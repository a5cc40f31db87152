use bson::{Bson, Document as BsonDocument};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::utils::json::json_to_bson;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Auto,
    Ndjson,
    Csv,
}

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_headers: bool,
    pub type_infer: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',', has_headers: true, type_infer: true }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub format: ImportFormat,
    pub skip_errors: bool,
    pub csv: CsvOptions,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { format: ImportFormat::Auto, skip_errors: true, csv: CsvOptions::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Seed a collection from a file, picking the format from the extension
/// when `Auto` (`.csv` is CSV, anything else NDJSON).
pub fn import_file(
    col: &Arc<Collection>,
    path: &Path,
    opts: &ImportOptions,
) -> Result<ImportReport, DbError> {
    let format = match opts.format {
        ImportFormat::Auto => {
            if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
                ImportFormat::Csv
            } else {
                ImportFormat::Ndjson
            }
        }
        other => other,
    };
    let file = File::open(path)?;
    let mut report = ImportReport::default();
    match format {
        ImportFormat::Csv => import_csv(col, file, opts, &mut report)?,
        _ => import_ndjson(col, file, opts, &mut report)?,
    }
    log::info!(
        "import collection={} file={} inserted={} skipped={}",
        col.name_str(),
        path.display(),
        report.inserted,
        report.skipped
    );
    Ok(report)
}

pub fn import_ndjson<R: Read>(
    col: &Arc<Collection>,
    reader: R,
    opts: &ImportOptions,
    report: &mut ImportReport,
) -> Result<(), DbError> {
    for (line_no, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(&line);
        let doc = match parsed.map(|v| json_to_bson(&v)) {
            Ok(Bson::Document(d)) => d,
            Ok(_) | Err(_) if opts.skip_errors => {
                log::warn!("import: skipping malformed line {}", line_no + 1);
                report.skipped += 1;
                continue;
            }
            Ok(_) => {
                return Err(DbError::ImportError(format!(
                    "line {}: expected a JSON object",
                    line_no + 1
                )));
            }
            Err(e) => return Err(DbError::ImportError(format!("line {}: {e}", line_no + 1))),
        };
        col.insert_document(Document::new(doc))?;
        report.inserted += 1;
    }
    Ok(())
}

pub fn import_csv<R: Read>(
    col: &Arc<Collection>,
    reader: R,
    opts: &ImportOptions,
    report: &mut ImportReport,
) -> Result<(), DbError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(opts.csv.has_headers)
        .delimiter(opts.csv.delimiter)
        .from_reader(reader);
    let headers: Vec<String> = if opts.csv.has_headers {
        rdr.headers()
            .map(|h| h.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    for (row_no, rec) in rdr.records().enumerate() {
        let rec = match rec {
            Ok(r) => r,
            Err(e) if opts.skip_errors => {
                log::warn!("import: skipping malformed row {}: {e}", row_no + 1);
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(DbError::ImportError(format!("row {}: {e}", row_no + 1))),
        };
        let mut doc = BsonDocument::new();
        for (i, field) in rec.iter().enumerate() {
            let key = headers.get(i).cloned().unwrap_or_else(|| format!("field_{i}"));
            doc.insert(key, field_to_bson(field, opts.csv.type_infer));
        }
        col.insert_document(Document::new(doc))?;
        report.inserted += 1;
    }
    Ok(())
}

/// Best-effort type inference for one CSV cell: int, float, bool, else
/// string.
fn field_to_bson(field: &str, type_infer: bool) -> Bson {
    if !type_infer {
        return Bson::String(field.to_string());
    }
    if let Ok(i) = field.parse::<i64>() {
        return if let Ok(small) = i32::try_from(i) {
            Bson::Int32(small)
        } else {
            Bson::Int64(i)
        };
    }
    if let Ok(f) = field.parse::<f64>() {
        return Bson::Double(f);
    }
    match field {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        _ => Bson::String(field.to_string()),
    }
}
