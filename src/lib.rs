pub mod aggregate;
pub mod cli;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod import;
pub mod index;
pub mod logger;
pub mod query;
pub mod types;
pub mod utils;
pub mod wal;

use std::path::Path;
use std::sync::Arc;

use crate::collection::Collection;
use crate::config::DbConfig;
use crate::document::Document;
use crate::engine::{Engine, EngineOptions};
use crate::errors::DbError;
use crate::index::{IndexDescriptor, IndexKind, IndexSpec};
use crate::types::DocumentId;

/// The main database handle: a facade over the engine and the query,
/// aggregation, and index layers.
pub struct Database {
    engine: Arc<Engine>,
}

impl Database {
    /// Open or create a database directory with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::open_with(EngineOptions {
            path: path.as_ref().to_path_buf(),
            ..EngineOptions::default()
        })
    }

    pub fn open_with(options: EngineOptions) -> Result<Self, DbError> {
        let engine = Engine::open(options)?;
        Ok(Self { engine: Arc::new(engine) })
    }

    /// Open using a TOML config file; also configures logging.
    pub fn open_from_config(config: &DbConfig) -> Result<Self, DbError> {
        if config.log_to_file {
            logger::init_for_db(&config.data_dir, config.level_filter())?;
        } else {
            logger::init(config.level_filter())?;
        }
        Self::open_with(config.engine_options())
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    // --- Collection admin ---

    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine.create_collection(name)
    }

    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine
            .get_collection(name)
            .ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }

    pub fn drop_collection(&self, name: &str) -> Result<bool, DbError> {
        self.engine.drop_collection(name)
    }

    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        self.engine.rename_collection(old, new)
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    // --- Documents ---

    pub fn insert(&self, collection: &str, data: bson::Document) -> Result<DocumentId, DbError> {
        self.collection(collection)?.insert_document(Document::new(data))
    }

    // --- Query API (façade over the query module) ---

    pub fn find(
        &self,
        collection: &str,
        filter: &query::Filter,
        opts: &query::FindOptions,
    ) -> Result<query::Cursor, DbError> {
        Ok(query::find_docs(&self.collection(collection)?, filter, opts))
    }

    pub fn count(&self, collection: &str, filter: &query::Filter) -> Result<usize, DbError> {
        Ok(query::count_docs(&self.collection(collection)?, filter))
    }

    pub fn update_one(
        &self,
        collection: &str,
        filter: &query::Filter,
        update: &query::UpdateDoc,
    ) -> Result<query::UpdateReport, DbError> {
        query::update_one(&self.collection(collection)?, filter, update)
    }

    pub fn update_many(
        &self,
        collection: &str,
        filter: &query::Filter,
        update: &query::UpdateDoc,
    ) -> Result<query::UpdateReport, DbError> {
        query::update_many(&self.collection(collection)?, filter, update)
    }

    pub fn delete_one(
        &self,
        collection: &str,
        filter: &query::Filter,
    ) -> Result<query::DeleteReport, DbError> {
        query::delete_one(&self.collection(collection)?, filter)
    }

    pub fn delete_many(
        &self,
        collection: &str,
        filter: &query::Filter,
    ) -> Result<query::DeleteReport, DbError> {
        query::delete_many(&self.collection(collection)?, filter)
    }

    pub fn explain(
        &self,
        collection: &str,
        filter: &query::Filter,
        opts: &query::FindOptions,
    ) -> Result<query::ExplainReport, DbError> {
        Ok(query::explain(&self.collection(collection)?, filter, opts))
    }

    // --- Aggregation ---

    pub fn aggregate(
        &self,
        collection: &str,
        pipeline: &aggregate::Pipeline,
    ) -> Result<Vec<bson::Document>, DbError> {
        aggregate::run_pipeline(&self.collection(collection)?, pipeline)
    }

    // --- Indexes ---

    pub fn create_index(
        &self,
        collection: &str,
        spec: IndexSpec,
        kind: IndexKind,
    ) -> Result<String, DbError> {
        self.collection(collection)?.create_index(spec, kind)
    }

    pub fn drop_index(&self, collection: &str, name: &str) -> Result<bool, DbError> {
        self.collection(collection)?.drop_index(name)
    }

    pub fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDescriptor>, DbError> {
        Ok(self.collection(collection)?.list_indexes())
    }

    // --- Maintenance ---

    pub fn flush(&self) -> Result<(), DbError> {
        self.engine.flush()
    }

    pub fn compact(&self) -> Result<(), DbError> {
        self.engine.compact()
    }
}
