use super::core::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::index::{index_insert_all, index_remove_all};
use crate::types::{DocumentId, Operation};
use crate::wal::WalRecord;

impl Collection {
    /// Insert a document: WAL first, then store and indexes.
    pub fn insert_document(&self, document: Document) -> Result<DocumentId, DbError> {
        let _guard = self.build_lock.read();
        let op = Operation::Insert { document: document.clone() };
        self.wal.append(&WalRecord::new(self.name_str(), op))?;
        let id = self.apply_insert(document);
        log::trace!("insert collection={} id={id}", self.name_str());
        Ok(id)
    }

    /// Apply an insert without logging; used by WAL replay.
    pub(crate) fn apply_insert(&self, document: Document) -> DocumentId {
        let id = document.id.clone();
        index_insert_all(&mut self.indexes.write(), &document.data.0, &id);
        self.store.write().insert(document);
        id
    }

    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.store.read().get(id).cloned()
    }

    /// Replace a document's payload in place. Returns false when the id
    /// is unknown.
    pub fn update_document(&self, id: &DocumentId, new_document: Document) -> Result<bool, DbError> {
        let _guard = self.build_lock.read();
        if self.store.read().get(id).is_none() {
            return Ok(false);
        }
        let mut replacement = new_document;
        replacement.id = id.clone();
        let op = Operation::Update { document_id: id.clone(), new_document: replacement.clone() };
        self.wal.append(&WalRecord::new(self.name_str(), op))?;
        self.apply_update(id, replacement);
        log::trace!("update collection={} id={id}", self.name_str());
        Ok(true)
    }

    pub(crate) fn apply_update(&self, id: &DocumentId, mut new_document: Document) {
        new_document.id = id.clone();
        let mut store = self.store.write();
        if let Some(old) = store.get(id) {
            let mut indexes = self.indexes.write();
            index_remove_all(&mut indexes, &old.data.0, id);
            index_insert_all(&mut indexes, &new_document.data.0, id);
        }
        store.insert(new_document);
    }

    pub fn delete_document(&self, id: &DocumentId) -> Result<bool, DbError> {
        let _guard = self.build_lock.read();
        if self.store.read().get(id).is_none() {
            return Ok(false);
        }
        let op = Operation::Delete { document_id: id.clone() };
        self.wal.append(&WalRecord::new(self.name_str(), op))?;
        let removed = self.apply_delete(id);
        log::trace!("delete collection={} id={id}", self.name_str());
        Ok(removed)
    }

    pub(crate) fn apply_delete(&self, id: &DocumentId) -> bool {
        let removed = self.store.write().remove(id);
        if let Some(old) = &removed {
            index_remove_all(&mut self.indexes.write(), &old.data.0, id);
        }
        removed.is_some()
    }

    /// Document ids in insertion order.
    pub fn list_ids(&self) -> Vec<DocumentId> {
        self.store.read().ids()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every document, in insertion order.
    pub fn all_documents(&self) -> Vec<Document> {
        self.store.read().iter().cloned().collect()
    }
}
