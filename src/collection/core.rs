use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::document::Document;
use crate::index::IndexManager;
use crate::types::DocumentId;
use crate::wal::WalWriter;

/// In-memory document store for one collection. Documents iterate in
/// insertion order, which is the default result order for unsorted
/// finds and for `skip`/`limit` pagination.
#[derive(Default)]
pub(crate) struct Store {
    docs: HashMap<DocumentId, Document>,
    order: Vec<DocumentId>,
}

impl Store {
    pub(crate) fn insert(&mut self, document: Document) {
        if !self.docs.contains_key(&document.id) {
            self.order.push(document.id.clone());
        }
        self.docs.insert(document.id.clone(), document);
    }

    pub(crate) fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let removed = self.docs.remove(id);
        if removed.is_some() {
            self.order.retain(|x| x != id);
        }
        removed
    }

    pub(crate) fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.docs.get(id)
    }

    pub(crate) fn ids(&self) -> Vec<DocumentId> {
        self.order.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(|id| self.docs.get(id))
    }
}

pub struct Collection {
    pub(crate) name: RwLock<String>,
    pub(crate) store: RwLock<Store>,
    pub indexes: RwLock<IndexManager>,
    // Serializes offline index builds against writers.
    pub(crate) build_lock: RwLock<()>,
    pub(crate) wal: Arc<WalWriter>,
}

impl Collection {
    pub(crate) fn new(name: String, wal: Arc<WalWriter>) -> Self {
        Self {
            name: RwLock::new(name),
            store: RwLock::new(Store::default()),
            indexes: RwLock::new(IndexManager::new()),
            build_lock: RwLock::new(()),
            wal,
        }
    }

    pub(crate) fn set_name(&self, new_name: String) {
        *self.name.write() = new_name;
    }

    /// The collection's name as an owned `String`, hiding the lock.
    pub fn name_str(&self) -> String {
        self.name.read().clone()
    }
}
