use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAL encode error: {0}")]
    WalEncode(#[from] bincode::Error),

    #[error("WAL corruption: {0}")]
    WalCorrupt(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),

    #[error("Document not found: {0}")]
    NoSuchDocument(String),

    #[error("Index not found: {0}")]
    NoSuchIndex(String),

    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Aggregation error: {0}")]
    AggregateError(String),

    #[error("Import error: {0}")]
    ImportError(String),
}
