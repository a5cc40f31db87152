use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::types::DocumentId;

use super::cursor::Cursor;
use super::eval::{compare_docs, eval_filter, project_fields};
use super::plan::choose_plan;
use super::types::{
    DeleteReport, Filter, FindOptions, MAX_LIMIT, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS,
    UpdateDoc, UpdateReport,
};

pub(crate) struct FindStats {
    pub docs_examined: usize,
    pub keys_examined: usize,
    pub index_name: Option<String>,
}

/// Shared find path: plan, filter, sort, project, paginate. Both
/// `find_docs` and `explain` run through here so reported stats match
/// real execution.
pub(crate) fn run_find(
    col: &Arc<Collection>,
    filter: &Filter,
    opts: &FindOptions,
) -> (Vec<Document>, FindStats) {
    let start = std::time::Instant::now();
    let plan = choose_plan(col, filter);
    let used_index = plan.index_name.is_some();

    // Candidate ids from an index come back unordered; restore insertion
    // order so unsorted results stay deterministic.
    let ids: Vec<DocumentId> = match plan.candidates {
        Some(candidates) => {
            let pos: HashMap<DocumentId, usize> =
                col.list_ids().into_iter().enumerate().map(|(i, id)| (id, i)).collect();
            let mut c = candidates;
            c.sort_by_key(|id| pos.get(id).copied().unwrap_or(usize::MAX));
            c
        }
        None => col.list_ids(),
    };

    let mut docs_examined = 0usize;
    let mut docs: Vec<Document> = ids
        .iter()
        .filter_map(|id| col.find_document(id))
        .inspect(|_| docs_examined += 1)
        .filter(|d| eval_filter(&d.data.0, filter))
        .collect();

    if let Some(sort) = &opts.sort {
        if sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec too long: {}", sort.len());
        }
        docs.sort_by(|a, b| compare_docs(&a.data.0, &b.data.0, sort));
    }

    if let Some(fields) = &opts.projection {
        let fields: Vec<String> = fields.iter().take(MAX_PROJECTION_FIELDS).cloned().collect();
        for d in &mut docs {
            d.data.0 = project_fields(&d.data.0, &fields);
        }
    }

    let skip = opts.skip.unwrap_or(0);
    let limit = opts.limit.unwrap_or(usize::MAX).min(MAX_LIMIT);
    let docs: Vec<Document> = if skip >= docs.len() {
        Vec::new()
    } else {
        let end = skip.saturating_add(limit).min(docs.len());
        docs[skip..end].to_vec()
    };

    log::debug!(
        "find collection={} duration_ms={} used_index={used_index} examined={docs_examined} returned={} skip={skip} limit={}",
        col.name_str(),
        start.elapsed().as_millis(),
        docs.len(),
        opts.limit.map_or_else(|| "none".into(), |l| l.to_string()),
    );

    (
        docs,
        FindStats {
            docs_examined,
            keys_examined: plan.keys_examined,
            index_name: plan.index_name,
        },
    )
}

#[must_use]
pub fn find_docs(col: &Arc<Collection>, filter: &Filter, opts: &FindOptions) -> Cursor {
    let (docs, _stats) = run_find(col, filter, opts);
    Cursor::new(docs)
}

#[must_use]
pub fn count_docs(col: &Arc<Collection>, filter: &Filter) -> usize {
    col.list_ids()
        .into_iter()
        .filter(|id| col.find_document(id).is_some_and(|d| eval_filter(&d.data.0, filter)))
        .count()
}

fn matching_ids(col: &Arc<Collection>, filter: &Filter) -> Vec<DocumentId> {
    col.list_ids()
        .into_iter()
        .filter(|id| col.find_document(id).is_some_and(|d| eval_filter(&d.data.0, filter)))
        .collect()
}

pub fn update_many(
    col: &Arc<Collection>,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    let mut matched = 0u64;
    let mut modified = 0u64;
    for id in matching_ids(col, filter) {
        if let Some(mut doc) = col.find_document(&id) {
            matched += 1;
            if apply_update(&mut doc, update) {
                modified += 1;
            }
            col.update_document(&id, doc)?;
        }
    }
    log::debug!(
        "update_many collection={} matched={matched} modified={modified}",
        col.name_str()
    );
    Ok(UpdateReport { matched, modified })
}

/// Update the first matching document in insertion order.
pub fn update_one(
    col: &Arc<Collection>,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    if let Some(id) = matching_ids(col, filter).into_iter().next()
        && let Some(mut doc) = col.find_document(&id)
    {
        let changed = apply_update(&mut doc, update);
        col.update_document(&id, doc)?;
        return Ok(UpdateReport { matched: 1, modified: u64::from(changed) });
    }
    Ok(UpdateReport::default())
}

pub fn delete_many(col: &Arc<Collection>, filter: &Filter) -> Result<DeleteReport, DbError> {
    let mut deleted = 0u64;
    for id in matching_ids(col, filter) {
        if col.delete_document(&id)? {
            deleted += 1;
        }
    }
    log::debug!("delete_many collection={} deleted={deleted}", col.name_str());
    Ok(DeleteReport { deleted })
}

/// Delete the first matching document in insertion order.
pub fn delete_one(col: &Arc<Collection>, filter: &Filter) -> Result<DeleteReport, DbError> {
    if let Some(id) = matching_ids(col, filter).into_iter().next() {
        let deleted = u64::from(col.delete_document(&id)?);
        return Ok(DeleteReport { deleted });
    }
    Ok(DeleteReport::default())
}

/// Apply `$set` / `$inc` / `$unset` to a document payload. Returns true
/// when anything actually changed.
pub fn apply_update(doc: &mut Document, upd: &UpdateDoc) -> bool {
    fn ensure_subdoc<'a>(root: &'a mut bson::Document, key: &str) -> &'a mut bson::Document {
        let needs_new = !matches!(root.get(key), Some(bson::Bson::Document(_)));
        if needs_new {
            root.insert(key.to_string(), bson::Bson::Document(bson::Document::new()));
        }
        match root.get_mut(key) {
            Some(bson::Bson::Document(d)) => d,
            _ => unreachable!(),
        }
    }

    fn traverse_to_parent<'a>(
        root: &'a mut bson::Document,
        path: &str,
    ) -> (&'a mut bson::Document, String) {
        let mut cur = root;
        let mut iter = path.split('.').peekable();
        let mut last = String::new();
        while let Some(seg) = iter.next() {
            if iter.peek().is_none() {
                last = seg.to_string();
                break;
            }
            cur = ensure_subdoc(cur, seg);
        }
        (cur, last)
    }

    fn set_path(root: &mut bson::Document, path: &str, value: bson::Bson) -> bool {
        let (parent, last) = traverse_to_parent(root, path);
        let old = parent.insert(last, value.clone());
        old.as_ref() != Some(&value)
    }

    fn get_path(root: &bson::Document, path: &str) -> Option<bson::Bson> {
        super::eval::get_path(root, path).cloned()
    }

    fn unset_path(root: &mut bson::Document, path: &str) -> bool {
        let (parent, last) = traverse_to_parent(root, path);
        parent.remove(&last).is_some()
    }

    fn as_f64(v: &bson::Bson) -> f64 {
        match v {
            bson::Bson::Double(f) => *f,
            bson::Bson::Int32(i) => f64::from(*i),
            bson::Bson::Int64(i) => *i as f64,
            _ => 0.0,
        }
    }

    let mut changed = false;
    for (k, v) in &upd.set {
        if set_path(&mut doc.data.0, k, v.clone()) {
            changed = true;
        }
    }
    for (k, by) in &upd.inc {
        let cur = get_path(&doc.data.0, k).unwrap_or(bson::Bson::Double(0.0));
        if set_path(&mut doc.data.0, k, bson::Bson::Double(as_f64(&cur) + by)) {
            changed = true;
        }
    }
    for k in &upd.unset {
        if unset_path(&mut doc.data.0, k) {
            changed = true;
        }
    }
    if changed {
        doc.metadata.updated_at = crate::types::SerializableDateTime(chrono::Utc::now());
    }
    changed
}
