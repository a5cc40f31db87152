use folio::engine::Engine;
use folio::import::{
    ImportFormat, ImportOptions, ImportReport, import_csv, import_file, import_ndjson,
};
use std::io::Cursor;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn import_ndjson_basic() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(dir.path()).unwrap();
    let col = engine.create_collection("books").unwrap();
    let data = "{\"title\":\"Dune\"}\n{\"title\":\"Hyperion\"}\n";
    let mut report = ImportReport::default();
    import_ndjson(&col, Cursor::new(data.as_bytes()), &ImportOptions::default(), &mut report)
        .unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(col.len(), 2);
}

#[test]
fn import_ndjson_skips_malformed_lines() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(dir.path()).unwrap();
    let col = engine.create_collection("books").unwrap();
    let data = "{\"title\":\"Dune\"}\nnot json\n[1,2,3]\n\n{\"title\":\"Hyperion\"}\n";
    let mut report = ImportReport::default();
    import_ndjson(&col, Cursor::new(data.as_bytes()), &ImportOptions::default(), &mut report)
        .unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 2);
}

#[test]
fn import_ndjson_strict_mode_errors() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(dir.path()).unwrap();
    let col = engine.create_collection("books").unwrap();
    let opts = ImportOptions { skip_errors: false, ..ImportOptions::default() };
    let mut report = ImportReport::default();
    let r = import_ndjson(&col, Cursor::new(b"garbage\n".as_slice()), &opts, &mut report);
    assert!(r.is_err());
}

#[test]
fn import_csv_with_headers_and_inference() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(dir.path()).unwrap();
    let col = engine.create_collection("books").unwrap();
    let data = "title,published_year,price,in_stock\nDune,1965,9.99,true\nHyperion,1989,11.50,false\n";
    let mut report = ImportReport::default();
    import_csv(&col, Cursor::new(data.as_bytes()), &ImportOptions::default(), &mut report)
        .unwrap();
    assert_eq!(report.inserted, 2);

    let doc = col.all_documents().remove(0);
    assert_eq!(doc.data.0.get_str("title").unwrap(), "Dune");
    assert_eq!(doc.data.0.get_i32("published_year").unwrap(), 1965);
    assert_eq!(doc.data.0.get_f64("price").unwrap(), 9.99);
    assert!(doc.data.0.get_bool("in_stock").unwrap());
}

#[test]
fn import_file_detects_format_from_extension() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(dir.path().join("data")).unwrap();
    let col = engine.create_collection("books").unwrap();

    let csv_path = dir.path().join("books.csv");
    let mut f = std::fs::File::create(&csv_path).unwrap();
    writeln!(f, "title,price").unwrap();
    writeln!(f, "Dune,9.99").unwrap();
    drop(f);
    let report = import_file(&col, &csv_path, &ImportOptions::default()).unwrap();
    assert_eq!(report.inserted, 1);

    let ndjson_path = dir.path().join("books.ndjson");
    std::fs::write(&ndjson_path, "{\"title\":\"Hyperion\"}\n").unwrap();
    let report = import_file(&col, &ndjson_path, &ImportOptions::default()).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(col.len(), 2);
}

#[test]
fn import_csv_without_type_inference() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(dir.path()).unwrap();
    let col = engine.create_collection("books").unwrap();
    let mut opts = ImportOptions { format: ImportFormat::Csv, ..ImportOptions::default() };
    opts.csv.type_infer = false;
    let mut report = ImportReport::default();
    import_csv(&col, Cursor::new(b"year\n1965\n".as_slice()), &opts, &mut report).unwrap();
    let doc = col.all_documents().remove(0);
    assert_eq!(doc.data.0.get_str("year").unwrap(), "1965");
}
