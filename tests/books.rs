//! End-to-end coverage of the canonical book-catalog statements: filters,
//! single-document mutations, projection, sorting, pagination, aggregation
//! pipelines, index declarations, and explain output.

use bson::doc;
use folio::Database;
use folio::index::{IndexKind, IndexSpec};
use folio::query::{self, FindOptions};
use tempfile::tempdir;

fn seed(db: &Database) {
    db.create_collection("books").unwrap();
    let fixture = vec![
        doc! {"title": "The Great Gatsby", "author": "F. Scott Fitzgerald", "genre": "Fiction", "published_year": 1925, "price": 10.99, "in_stock": true},
        doc! {"title": "Moby Dick", "author": "Herman Melville", "genre": "Fiction", "published_year": 1851, "price": 9.50, "in_stock": false},
        doc! {"title": "1984", "author": "George Orwell", "genre": "Dystopian", "published_year": 1949, "price": 8.99, "in_stock": true},
        doc! {"title": "Animal Farm", "author": "George Orwell", "genre": "Dystopian", "published_year": 1945, "price": 7.99, "in_stock": true},
        doc! {"title": "Burmese Days", "author": "George Orwell", "genre": "Fiction", "published_year": 1934, "price": 8.50, "in_stock": false},
        doc! {"title": "Beloved", "author": "Toni Morrison", "genre": "Fiction", "published_year": 1987, "price": 12.50, "in_stock": true},
        doc! {"title": "The Road", "author": "Cormac McCarthy", "genre": "Post-Apocalyptic", "published_year": 2006, "price": 11.00, "in_stock": false},
        doc! {"title": "The Martian", "author": "Andy Weir", "genre": "Science Fiction", "published_year": 2011, "price": 14.99, "in_stock": true},
        doc! {"title": "Project Hail Mary", "author": "Andy Weir", "genre": "Science Fiction", "published_year": 2021, "price": 18.99, "in_stock": true},
        doc! {"title": "Circe", "author": "Madeline Miller", "genre": "Fantasy", "published_year": 2018, "price": 13.50, "in_stock": true},
        doc! {"title": "The Night Circus", "author": "Erin Morgenstern", "genre": "Fantasy", "published_year": 2011, "price": 12.99, "in_stock": false},
        doc! {"title": "Klara and the Sun", "author": "Kazuo Ishiguro", "genre": "Science Fiction", "published_year": 2021, "price": 16.99, "in_stock": true},
        doc! {"title": "Educated", "author": "Tara Westover", "genre": "Memoir", "published_year": 2018, "price": 15.00, "in_stock": true},
    ];
    for d in fixture {
        db.insert("books", d).unwrap();
    }
}

fn titles(docs: &[folio::document::Document]) -> Vec<String> {
    docs.iter().map(|d| d.data.0.get_str("title").unwrap().to_string()).collect()
}

#[test]
fn find_by_genre() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let filter = query::parse_filter_json(r#"{ "genre": "Fiction" }"#).unwrap();
    let docs = db.find("books", &filter, &FindOptions::default()).unwrap().to_vec();
    assert_eq!(
        titles(&docs),
        vec!["The Great Gatsby", "Moby Dick", "Burmese Days", "Beloved"]
    );
}

#[test]
fn find_published_after_year() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let filter = query::parse_filter_json(r#"{ "published_year": { "$gt": 2000 } }"#).unwrap();
    let docs = db.find("books", &filter, &FindOptions::default()).unwrap().to_vec();
    assert_eq!(docs.len(), 7);
    for d in &docs {
        assert!(d.data.0.get_i32("published_year").unwrap() > 2000);
    }
}

#[test]
fn find_by_author() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let filter = query::parse_filter_json(r#"{ "author": "George Orwell" }"#).unwrap();
    assert_eq!(db.count("books", &filter).unwrap(), 3);
}

#[test]
fn update_one_sets_price_and_nothing_else() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let filter = query::parse_filter_json(r#"{ "title": "The Great Gatsby" }"#).unwrap();
    let update = query::parse_update_json(r#"{ "$set": { "price": 15.99 } }"#).unwrap();
    let r = db.update_one("books", &filter, &update).unwrap();
    assert_eq!(r.matched, 1);
    assert_eq!(r.modified, 1);

    let doc = db.find("books", &filter, &FindOptions::default()).unwrap().advance().unwrap();
    assert_eq!(doc.data.0.get_f64("price").unwrap(), 15.99);
    assert_eq!(doc.data.0.get_str("author").unwrap(), "F. Scott Fitzgerald");
    assert_eq!(doc.data.0.get_i32("published_year").unwrap(), 1925);
    assert!(doc.data.0.get_bool("in_stock").unwrap());
}

#[test]
fn delete_one_by_title() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let filter = query::parse_filter_json(r#"{ "title": "Moby Dick" }"#).unwrap();
    let r = db.delete_one("books", &filter).unwrap();
    assert_eq!(r.deleted, 1);
    assert_eq!(db.count("books", &query::Filter::True).unwrap(), 12);
    assert_eq!(db.count("books", &filter).unwrap(), 0);
}

#[test]
fn find_in_stock_published_after_2010() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let filter = query::parse_filter_json(
        r#"{ "in_stock": true, "published_year": { "$gt": 2010 } }"#,
    )
    .unwrap();
    let docs = db.find("books", &filter, &FindOptions::default()).unwrap().to_vec();
    assert_eq!(
        titles(&docs),
        vec!["The Martian", "Project Hail Mary", "Circe", "Klara and the Sun", "Educated"]
    );
}

#[test]
fn projection_keeps_only_named_fields() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let opts = FindOptions {
        projection: Some(
            query::parse_projection_json(r#"{ "title": 1, "author": 1, "price": 1, "_id": 0 }"#)
                .unwrap(),
        ),
        ..FindOptions::default()
    };
    let docs = db.find("books", &query::Filter::True, &opts).unwrap().to_vec();
    assert_eq!(docs.len(), 13);
    for d in &docs {
        let keys: Vec<&str> = d.data.0.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "author", "price"]);
    }
}

#[test]
fn sort_by_price_ascending() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let opts = FindOptions {
        sort: Some(query::parse_sort_json(r#"{ "price": 1 }"#).unwrap()),
        ..FindOptions::default()
    };
    let docs = db.find("books", &query::Filter::True, &opts).unwrap().to_vec();
    let prices: Vec<f64> = docs.iter().map(|d| d.data.0.get_f64("price").unwrap()).collect();
    assert_eq!(prices.len(), 13);
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(prices[0], 7.99);
}

#[test]
fn sort_by_price_descending() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let opts = FindOptions {
        sort: Some(query::parse_sort_json(r#"{ "price": -1 }"#).unwrap()),
        ..FindOptions::default()
    };
    let docs = db.find("books", &query::Filter::True, &opts).unwrap().to_vec();
    let prices: Vec<f64> = docs.iter().map(|d| d.data.0.get_f64("price").unwrap()).collect();
    assert!(prices.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(prices[0], 18.99);
}

#[test]
fn pagination_skip_limit_is_page_two() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let all = db.find("books", &query::Filter::True, &FindOptions::default()).unwrap().to_vec();
    let opts = FindOptions { skip: Some(5), limit: Some(5), ..FindOptions::default() };
    let page = db.find("books", &query::Filter::True, &opts).unwrap().to_vec();
    assert_eq!(page.len(), 5);
    assert_eq!(titles(&page), titles(&all[5..10]));
}

#[test]
fn aggregate_average_price_by_genre() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let pipeline = folio::aggregate::parse_pipeline_json(
        r#"[ { "$group": { "_id": "$genre", "avgPrice": { "$avg": "$price" } } } ]"#,
    )
    .unwrap();
    let out = db.aggregate("books", &pipeline).unwrap();
    let dystopian = out
        .iter()
        .find(|d| d.get_str("_id") == Ok("Dystopian"))
        .expect("Dystopian group present");
    let avg = dystopian.get_f64("avgPrice").unwrap();
    assert!((avg - 8.49).abs() < 1e-9);
    // one group per distinct genre
    assert_eq!(out.len(), 6);
}

#[test]
fn aggregate_author_with_most_books() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let pipeline = folio::aggregate::parse_pipeline_json(
        r#"[
            { "$group": { "_id": "$author", "count": { "$sum": 1 } } },
            { "$sort": { "count": -1 } },
            { "$limit": 1 }
        ]"#,
    )
    .unwrap();
    let out = db.aggregate("books", &pipeline).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get_str("_id").unwrap(), "George Orwell");
    assert_eq!(out[0].get_i64("count").unwrap(), 3);
}

#[test]
fn aggregate_group_by_publication_decade() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let pipeline = folio::aggregate::parse_pipeline_json(
        r#"[
            { "$group": {
                "_id": { "$concat": [
                    { "$toString": { "$multiply": [ { "$floor": { "$divide": ["$published_year", 10] } }, 10 ] } },
                    "s"
                ] },
                "count": { "$sum": 1 }
            } }
        ]"#,
    )
    .unwrap();
    let out = db.aggregate("books", &pipeline).unwrap();
    let count_of = |decade: &str| {
        out.iter()
            .find(|d| d.get_str("_id") == Ok(decade))
            .and_then(|d| d.get_i64("count").ok())
    };
    assert_eq!(count_of("1980s"), Some(1));
    assert_eq!(count_of("1940s"), Some(2));
    assert_eq!(count_of("2010s"), Some(4));
    assert_eq!(count_of("2020s"), Some(2));
    assert_eq!(count_of("1850s"), Some(1));
}

#[test]
fn create_index_on_title() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let name = db.create_index("books", IndexSpec::single("title"), IndexKind::BTree).unwrap();
    assert_eq!(name, "title_1");
    let descriptors = db.list_indexes("books").unwrap();
    assert!(descriptors.iter().any(|d| d.name == "title_1"));
}

#[test]
fn create_compound_index_on_author_and_year() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let spec = folio::cli::parse_index_keys(r#"{ "author": 1, "published_year": 1 }"#).unwrap();
    let name = db.create_index("books", spec, IndexKind::BTree).unwrap();
    assert_eq!(name, "author_1_published_year_1");

    // equality on both fields should now run off the index
    let filter = query::parse_filter_json(
        r#"{ "author": "George Orwell", "published_year": 1949 }"#,
    )
    .unwrap();
    let report = db.explain("books", &filter, &FindOptions::default()).unwrap();
    assert_eq!(report.query_planner.winning_plan, "IXSCAN");
    assert_eq!(report.query_planner.index_name.as_deref(), Some("author_1_published_year_1"));
    assert_eq!(report.execution_stats.n_returned, 1);
}

#[test]
fn explain_execution_stats_for_title_lookup() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    seed(&db);
    let filter = query::parse_filter_json(r#"{ "title": "1984" }"#).unwrap();

    let before = db.explain("books", &filter, &FindOptions::default()).unwrap();
    assert_eq!(before.query_planner.winning_plan, "COLLSCAN");
    assert_eq!(before.execution_stats.n_returned, 1);
    assert_eq!(before.execution_stats.total_docs_examined, 13);

    db.create_index("books", IndexSpec::single("title"), IndexKind::BTree).unwrap();
    let after = db.explain("books", &filter, &FindOptions::default()).unwrap();
    assert_eq!(after.query_planner.winning_plan, "IXSCAN");
    assert_eq!(after.execution_stats.n_returned, 1);
    assert_eq!(after.execution_stats.total_docs_examined, 1);
}
