use super::core::Collection;
use crate::errors::DbError;
use crate::index::{IndexDescriptor, IndexImpl, IndexKind, IndexSpec, index_insert_all};
use crate::types::Operation;
use crate::wal::WalRecord;

impl Collection {
    /// Declare an index and build it offline from current contents.
    /// The declaration is WAL-logged so it survives reopen. Duplicate
    /// names are rejected before anything reaches the log.
    pub fn create_index(&self, spec: IndexSpec, kind: IndexKind) -> Result<String, DbError> {
        let name = spec.name();
        if self.indexes.read().indexes.contains_key(&name) {
            return Err(DbError::IndexAlreadyExists(name));
        }
        let op = Operation::CreateIndex { spec: spec.clone(), kind };
        self.wal.append(&WalRecord::new(self.name_str(), op))?;
        self.apply_create_index(spec, kind)
    }

    pub(crate) fn apply_create_index(
        &self,
        spec: IndexSpec,
        kind: IndexKind,
    ) -> Result<String, DbError> {
        let _wguard = self.build_lock.write();
        let start = std::time::Instant::now();
        let name = {
            let mut mgr = self.indexes.write();
            let name = mgr.create_index(spec, kind)?;
            for doc in self.store.read().iter() {
                index_insert_all(&mut mgr, &doc.data.0, &doc.id);
            }
            if let Some(idx) = mgr.indexes.get_mut(&name) {
                let elapsed = start.elapsed().as_millis();
                match idx {
                    IndexImpl::Hash(h) => h.stats.build_time_ms = elapsed,
                    IndexImpl::BTree(b) => b.stats.build_time_ms = elapsed,
                }
            }
            name
        };
        log::debug!(
            "index built collection={} name={name} duration_ms={}",
            self.name_str(),
            start.elapsed().as_millis()
        );
        Ok(name)
    }

    pub fn drop_index(&self, name: &str) -> Result<bool, DbError> {
        let op = Operation::DropIndex { name: name.to_string() };
        self.wal.append(&WalRecord::new(self.name_str(), op))?;
        Ok(self.apply_drop_index(name))
    }

    pub(crate) fn apply_drop_index(&self, name: &str) -> bool {
        let _wguard = self.build_lock.write();
        self.indexes.write().drop_index(name)
    }

    pub fn list_indexes(&self) -> Vec<IndexDescriptor> {
        self.indexes.read().descriptors()
    }
}
