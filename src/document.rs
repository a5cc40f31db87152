use bson::Document as BsonDocument;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, SerializableBsonDocument, SerializableDateTime};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created_at: SerializableDateTime,
    pub updated_at: SerializableDateTime,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = SerializableDateTime(Utc::now());
        Self { created_at: now.clone(), updated_at: now }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored document: a stable id, the BSON payload, and bookkeeping
/// timestamps. The payload carries no enforced schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: SerializableBsonDocument,
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        Self { id: DocumentId::new(), data: SerializableBsonDocument(data), metadata: Metadata::new() }
    }

    /// Replace the payload, bumping `updated_at`.
    pub fn update(&mut self, new_data: BsonDocument) {
        self.data = SerializableBsonDocument(new_data);
        self.metadata.updated_at = SerializableDateTime(Utc::now());
    }
}
