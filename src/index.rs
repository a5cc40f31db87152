use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Bound;

use crate::errors::DbError;
use crate::query::Order;
use crate::types::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Hash,
    BTree,
}

/// Ordered list of `(field, direction)` pairs. One entry makes a
/// single-field index; more make a compound index keyed by field
/// precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub fields: Vec<(String, Order)>,
}

impl IndexSpec {
    #[must_use]
    pub fn single(field: impl Into<String>) -> Self {
        Self { fields: vec![(field.into(), Order::Asc)] }
    }

    #[must_use]
    pub fn compound(fields: Vec<(String, Order)>) -> Self {
        Self { fields }
    }

    /// Mongo-style name: `title_1`, `author_1_published_year_1`.
    #[must_use]
    pub fn name(&self) -> String {
        self.fields
            .iter()
            .map(|(f, o)| format!("{f}_{}", match o {
                Order::Asc => "1",
                Order::Desc => "-1",
            }))
            .collect::<Vec<_>>()
            .join("_")
    }

    #[must_use]
    pub fn first_field(&self) -> &str {
        self.fields.first().map_or("", |(f, _)| f.as_str())
    }
}

/// Index key component. Numerics collapse to `Num` so `1987`,
/// `1987_i64` and `1987.0` land on the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    Bool(bool),
    Num(OrderedFloat<f64>),
    Str(String),
}

#[must_use]
pub fn key_from_bson(v: &Bson) -> Option<IndexKey> {
    match v {
        Bson::Boolean(b) => Some(IndexKey::Bool(*b)),
        Bson::Int32(i) => Some(IndexKey::Num(OrderedFloat(f64::from(*i)))),
        Bson::Int64(i) => Some(IndexKey::Num(OrderedFloat(*i as f64))),
        Bson::Double(f) => Some(IndexKey::Num(OrderedFloat(*f))),
        Bson::String(s) => Some(IndexKey::Str(s.clone())),
        _ => None,
    }
}

fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut cur = doc.get(first)?;
    for p in parts {
        match cur {
            Bson::Document(d) => cur = d.get(p)?,
            _ => return None,
        }
    }
    Some(cur)
}

/// Full composite key for a document, or `None` if any indexed field is
/// missing or of an unindexable type (such documents are simply absent
/// from the index).
fn composite_key(doc: &BsonDocument, spec: &IndexSpec) -> Option<Vec<IndexKey>> {
    spec.fields.iter().map(|(f, _)| get_path(doc, f).and_then(key_from_bson)).collect()
}

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub keys: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub build_time_ms: u128,
}

#[derive(Debug, Clone)]
pub struct HashIndex {
    pub spec: IndexSpec,
    pub map: HashMap<Vec<IndexKey>, HashSet<DocumentId>>,
    pub stats: IndexStats,
}

impl HashIndex {
    #[must_use]
    pub fn new(spec: IndexSpec) -> Self {
        Self { spec, map: HashMap::new(), stats: IndexStats::default() }
    }

    pub fn insert(&mut self, doc: &BsonDocument, id: &DocumentId) {
        if let Some(k) = composite_key(doc, &self.spec) {
            let set = self.map.entry(k).or_default();
            if set.insert(id.clone()) {
                self.stats.entries += 1;
            }
            self.stats.keys = self.map.len();
        }
    }

    pub fn remove(&mut self, doc: &BsonDocument, id: &DocumentId) {
        if let Some(k) = composite_key(doc, &self.spec)
            && let Some(set) = self.map.get_mut(&k)
        {
            if set.remove(id) {
                self.stats.entries = self.stats.entries.saturating_sub(1);
            }
            if set.is_empty() {
                self.map.remove(&k);
            }
            self.stats.keys = self.map.len();
        }
    }

    pub fn lookup_eq(&mut self, key: &[IndexKey]) -> Option<Vec<DocumentId>> {
        if let Some(set) = self.map.get(key) {
            self.stats.hits += 1;
            return Some(set.iter().cloned().collect());
        }
        self.stats.misses += 1;
        None
    }
}

#[derive(Debug, Clone)]
pub struct BTreeIndex {
    pub spec: IndexSpec,
    pub map: BTreeMap<Vec<IndexKey>, BTreeSet<DocumentId>>,
    pub stats: IndexStats,
}

impl BTreeIndex {
    #[must_use]
    pub fn new(spec: IndexSpec) -> Self {
        Self { spec, map: BTreeMap::new(), stats: IndexStats::default() }
    }

    pub fn insert(&mut self, doc: &BsonDocument, id: &DocumentId) {
        if let Some(k) = composite_key(doc, &self.spec) {
            let set = self.map.entry(k).or_default();
            if set.insert(id.clone()) {
                self.stats.entries += 1;
            }
            self.stats.keys = self.map.len();
        }
    }

    pub fn remove(&mut self, doc: &BsonDocument, id: &DocumentId) {
        if let Some(k) = composite_key(doc, &self.spec)
            && let Some(set) = self.map.get_mut(&k)
        {
            if set.remove(id) {
                self.stats.entries = self.stats.entries.saturating_sub(1);
            }
            if set.is_empty() {
                self.map.remove(&k);
            }
            self.stats.keys = self.map.len();
        }
    }

    pub fn lookup_eq(&mut self, key: &[IndexKey]) -> Option<Vec<DocumentId>> {
        if let Some(set) = self.map.get(key) {
            self.stats.hits += 1;
            return Some(set.iter().cloned().collect());
        }
        self.stats.misses += 1;
        None
    }

    /// Range scan over a single-field index. Returns `None` (and counts a
    /// miss) when nothing falls inside the bounds.
    pub fn lookup_range(
        &mut self,
        min: Option<&Bson>,
        max: Option<&Bson>,
        inclusive_min: bool,
        inclusive_max: bool,
    ) -> Option<Vec<DocumentId>> {
        let lo = match min.and_then(key_from_bson) {
            Some(k) if inclusive_min => Bound::Included(vec![k]),
            Some(k) => Bound::Excluded(vec![k]),
            None => Bound::Unbounded,
        };
        let hi = match max.and_then(key_from_bson) {
            Some(k) if inclusive_max => Bound::Included(vec![k]),
            Some(k) => Bound::Excluded(vec![k]),
            None => Bound::Unbounded,
        };
        let mut out: Vec<DocumentId> = Vec::new();
        for (_k, set) in self.map.range((lo, hi)) {
            out.extend(set.iter().cloned());
        }
        if out.is_empty() {
            self.stats.misses += 1;
            None
        } else {
            self.stats.hits += 1;
            Some(out)
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndexImpl {
    Hash(HashIndex),
    BTree(BTreeIndex),
}

impl IndexImpl {
    #[must_use]
    pub fn spec(&self) -> &IndexSpec {
        match self {
            Self::Hash(h) => &h.spec,
            Self::BTree(b) => &b.spec,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        match self {
            Self::Hash(_) => IndexKind::Hash,
            Self::BTree(_) => IndexKind::BTree,
        }
    }

    pub fn insert(&mut self, doc: &BsonDocument, id: &DocumentId) {
        match self {
            Self::Hash(h) => h.insert(doc, id),
            Self::BTree(b) => b.insert(doc, id),
        }
    }

    pub fn remove(&mut self, doc: &BsonDocument, id: &DocumentId) {
        match self {
            Self::Hash(h) => h.remove(doc, id),
            Self::BTree(b) => b.remove(doc, id),
        }
    }

    pub fn lookup_eq(&mut self, values: &[Bson]) -> Option<Vec<DocumentId>> {
        let key: Option<Vec<IndexKey>> = values.iter().map(key_from_bson).collect();
        let key = key?;
        match self {
            Self::Hash(h) => h.lookup_eq(&key),
            Self::BTree(b) => b.lookup_eq(&key),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub spec: IndexSpec,
    pub kind: IndexKind,
}

#[derive(Debug, Default)]
pub struct IndexManager {
    pub indexes: HashMap<String, IndexImpl>, // key: derived index name
}

impl IndexManager {
    #[must_use]
    pub fn new() -> Self {
        Self { indexes: HashMap::new() }
    }

    pub fn create_index(&mut self, spec: IndexSpec, kind: IndexKind) -> Result<String, DbError> {
        let name = spec.name();
        if self.indexes.contains_key(&name) {
            return Err(DbError::IndexAlreadyExists(name));
        }
        let idx = match kind {
            IndexKind::Hash => IndexImpl::Hash(HashIndex::new(spec)),
            IndexKind::BTree => IndexImpl::BTree(BTreeIndex::new(spec)),
        };
        self.indexes.insert(name.clone(), idx);
        Ok(name)
    }

    pub fn drop_index(&mut self, name: &str) -> bool {
        self.indexes.remove(name).is_some()
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<IndexDescriptor> {
        let mut out: Vec<IndexDescriptor> = self
            .indexes
            .iter()
            .map(|(name, idx)| IndexDescriptor {
                name: name.clone(),
                spec: idx.spec().clone(),
                kind: idx.kind(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

pub fn index_insert_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in mgr.indexes.values_mut() {
        idx.insert(doc, id);
    }
}

pub fn index_remove_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in mgr.indexes.values_mut() {
        idx.remove(doc, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn spec_names_are_mongo_style() {
        assert_eq!(IndexSpec::single("title").name(), "title_1");
        let compound = IndexSpec::compound(vec![
            ("author".into(), Order::Asc),
            ("published_year".into(), Order::Asc),
        ]);
        assert_eq!(compound.name(), "author_1_published_year_1");
    }

    #[test]
    fn numeric_keys_normalize() {
        assert_eq!(key_from_bson(&Bson::Int32(1987)), key_from_bson(&Bson::Int64(1987)));
        assert_eq!(key_from_bson(&Bson::Int32(1987)), key_from_bson(&Bson::Double(1987.0)));
    }

    #[test]
    fn compound_btree_eq_lookup() {
        let spec = IndexSpec::compound(vec![
            ("author".into(), Order::Asc),
            ("published_year".into(), Order::Asc),
        ]);
        let mut idx = BTreeIndex::new(spec);
        let id1 = DocumentId::new();
        let id2 = DocumentId::new();
        idx.insert(&doc! {"author": "George Orwell", "published_year": 1949}, &id1);
        idx.insert(&doc! {"author": "George Orwell", "published_year": 1945}, &id2);
        let key = [
            key_from_bson(&Bson::String("George Orwell".into())).unwrap(),
            key_from_bson(&Bson::Int32(1949)).unwrap(),
        ];
        let hits = idx.lookup_eq(&key).unwrap();
        assert_eq!(hits, vec![id1]);
    }

    #[test]
    fn btree_range_scan_excludes_bound() {
        let mut idx = BTreeIndex::new(IndexSpec::single("published_year"));
        let ids: Vec<DocumentId> = (0..3).map(|_| DocumentId::new()).collect();
        idx.insert(&doc! {"published_year": 1999}, &ids[0]);
        idx.insert(&doc! {"published_year": 2000}, &ids[1]);
        idx.insert(&doc! {"published_year": 2003}, &ids[2]);
        let hits = idx.lookup_range(Some(&Bson::Int32(2000)), None, false, false).unwrap();
        assert_eq!(hits, vec![ids[2].clone()]);
    }

    #[test]
    fn manager_rejects_duplicate_index() {
        let mut mgr = IndexManager::new();
        mgr.create_index(IndexSpec::single("title"), IndexKind::BTree).unwrap();
        assert!(matches!(
            mgr.create_index(IndexSpec::single("title"), IndexKind::Hash),
            Err(DbError::IndexAlreadyExists(_))
        ));
        assert!(mgr.drop_index("title_1"));
        assert!(!mgr.drop_index("title_1"));
    }

    #[test]
    fn missing_field_documents_stay_out_of_the_index() {
        let mut idx = HashIndex::new(IndexSpec::single("genre"));
        idx.insert(&doc! {"title": "untagged"}, &DocumentId::new());
        assert_eq!(idx.stats.entries, 0);
    }
}
