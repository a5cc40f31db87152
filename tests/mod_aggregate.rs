use bson::{Bson, doc};
use folio::aggregate::{parse_pipeline_json, run_pipeline};
use folio::document::Document;
use folio::engine::Engine;
use std::sync::Arc;
use tempfile::tempdir;

fn seeded() -> (tempfile::TempDir, Engine, Arc<folio::collection::Collection>) {
    let dir = tempdir().unwrap();
    let engine = Engine::new(dir.path()).unwrap();
    let col = engine.create_collection("books").unwrap();
    let rows = vec![
        doc! {"title": "A", "genre": "Fiction", "published_year": 1999, "price": 5.00},
        doc! {"title": "B", "genre": "Fantasy", "published_year": 2005, "price": 7.50},
        doc! {"title": "C", "genre": "Fiction", "published_year": 2012, "price": 10.00},
        doc! {"title": "D", "genre": "Memoir", "published_year": 2020, "price": 12.00},
        doc! {"title": "E", "genre": "Fantasy", "published_year": 1987, "price": 2.50},
    ];
    for r in rows {
        col.insert_document(Document::new(r)).unwrap();
    }
    (dir, engine, col)
}

#[test]
fn match_then_group() {
    let (_dir, _engine, col) = seeded();
    let p = parse_pipeline_json(
        r#"[
            {"$match": {"published_year": {"$gte": 2000}}},
            {"$group": {"_id": "$genre", "count": {"$sum": 1}}}
        ]"#,
    )
    .unwrap();
    let out = run_pipeline(&col, &p).unwrap();
    // group keys appear in first-seen order over the matched docs
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].get_str("_id").unwrap(), "Fantasy");
    assert_eq!(out[0].get_i64("count").unwrap(), 1);
    assert_eq!(out[1].get_str("_id").unwrap(), "Fiction");
    assert_eq!(out[2].get_str("_id").unwrap(), "Memoir");
}

#[test]
fn group_min_max() {
    let (_dir, _engine, col) = seeded();
    let p = parse_pipeline_json(
        r#"[{"$group": {"_id": "$genre", "cheapest": {"$min": "$price"}, "dearest": {"$max": "$price"}}}]"#,
    )
    .unwrap();
    let out = run_pipeline(&col, &p).unwrap();
    let fantasy = out.iter().find(|d| d.get_str("_id") == Ok("Fantasy")).unwrap();
    assert_eq!(fantasy.get_f64("cheapest").unwrap(), 2.50);
    assert_eq!(fantasy.get_f64("dearest").unwrap(), 7.50);
}

#[test]
fn avg_of_missing_field_is_null() {
    let (_dir, _engine, col) = seeded();
    let p = parse_pipeline_json(
        r#"[{"$group": {"_id": "$genre", "avgRating": {"$avg": "$rating"}}}]"#,
    )
    .unwrap();
    let out = run_pipeline(&col, &p).unwrap();
    for d in &out {
        assert_eq!(d.get("avgRating"), Some(&Bson::Null));
    }
}

#[test]
fn sort_skip_limit_stages() {
    let (_dir, _engine, col) = seeded();
    let p = parse_pipeline_json(
        r#"[
            {"$sort": {"price": -1}},
            {"$skip": 1},
            {"$limit": 2}
        ]"#,
    )
    .unwrap();
    let out = run_pipeline(&col, &p).unwrap();
    let titles: Vec<&str> = out.iter().map(|d| d.get_str("title").unwrap()).collect();
    assert_eq!(titles, vec!["C", "B"]);
}

#[test]
fn project_stage_trims_fields() {
    let (_dir, _engine, col) = seeded();
    let p = parse_pipeline_json(
        r#"[
            {"$match": {"genre": "Fiction"}},
            {"$project": {"title": 1, "price": 1, "_id": 0}}
        ]"#,
    )
    .unwrap();
    let out = run_pipeline(&col, &p).unwrap();
    assert_eq!(out.len(), 2);
    for d in &out {
        let keys: Vec<&str> = d.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "price"]);
    }
}

#[test]
fn sum_of_doubles_stays_double() {
    let (_dir, _engine, col) = seeded();
    let p = parse_pipeline_json(
        r#"[{"$group": {"_id": null, "total": {"$sum": "$price"}}}]"#,
    )
    .unwrap();
    let out = run_pipeline(&col, &p).unwrap();
    assert_eq!(out.len(), 1);
    let total = out[0].get_f64("total").unwrap();
    assert!((total - 37.00).abs() < 1e-9);
}

#[test]
fn decade_key_concat_tostring() {
    let (_dir, _engine, col) = seeded();
    let p = parse_pipeline_json(
        r#"[
            {"$group": {
                "_id": {"$concat": [
                    {"$toString": {"$multiply": [{"$floor": {"$divide": ["$published_year", 10]}}, 10]}},
                    "s"
                ]},
                "count": {"$sum": 1}
            }},
            {"$sort": {"_id": 1}}
        ]"#,
    )
    .unwrap();
    let out = run_pipeline(&col, &p).unwrap();
    let keys: Vec<&str> = out.iter().map(|d| d.get_str("_id").unwrap()).collect();
    assert_eq!(keys, vec!["1980s", "1990s", "2000s", "2010s", "2020s"]);
}

#[test]
fn unknown_stage_is_rejected() {
    assert!(parse_pipeline_json(r#"[{"$lookup": {"from": "authors"}}]"#).is_err());
    assert!(parse_pipeline_json(r#"{"$match": {}}"#).is_err());
    assert!(parse_pipeline_json(r#"[{"$group": {"count": {"$sum": 1}}}]"#).is_err());
}
