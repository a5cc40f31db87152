use folio::document::Document;
use folio::engine::Engine;
use folio::query::{Filter, FindOptions, Order, SortSpec, find_docs};
use proptest::prelude::*;

proptest! {
    #[test]
    fn multi_key_sort_is_non_decreasing(v in proptest::collection::vec((any::<i64>(), any::<i64>()), 0..50)) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(dir.path()).unwrap();
        let col = engine.create_collection("srt").unwrap();
        for (a, b) in &v {
            col.insert_document(Document::new(bson::doc!{"a": *a, "b": *b})).unwrap();
        }
        let opts = FindOptions {
            sort: Some(vec![
                SortSpec { field: "a".into(), order: Order::Asc },
                SortSpec { field: "b".into(), order: Order::Asc },
            ]),
            ..FindOptions::default()
        };
        let docs = find_docs(&col, &Filter::True, &opts).to_vec();
        prop_assert_eq!(docs.len(), v.len());
        for w in docs.windows(2) {
            let a0 = w[0].data.0.get_i64("a").unwrap();
            let b0 = w[0].data.0.get_i64("b").unwrap();
            let a1 = w[1].data.0.get_i64("a").unwrap();
            let b1 = w[1].data.0.get_i64("b").unwrap();
            prop_assert!(a0 < a1 || (a0 == a1 && b0 <= b1));
        }
    }

    #[test]
    fn skip_limit_never_overlap(n in 0usize..30, skip in 0usize..40, limit in 1usize..10) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(dir.path()).unwrap();
        let col = engine.create_collection("pg").unwrap();
        for i in 0..n {
            col.insert_document(Document::new(bson::doc!{"i": i as i64})).unwrap();
        }
        let all = find_docs(&col, &Filter::True, &FindOptions::default()).to_vec();
        let opts = FindOptions { skip: Some(skip), limit: Some(limit), ..FindOptions::default() };
        let page = find_docs(&col, &Filter::True, &opts).to_vec();
        let expected: Vec<i64> = all
            .iter()
            .skip(skip)
            .take(limit)
            .map(|d| d.data.0.get_i64("i").unwrap())
            .collect();
        let got: Vec<i64> = page.iter().map(|d| d.data.0.get_i64("i").unwrap()).collect();
        prop_assert_eq!(got, expected);
    }
}
