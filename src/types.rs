use bson::Document as BsonDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::document::Document;
use crate::index::{IndexKind, IndexSpec};

pub type CollectionName = String;

/// A wrapper around `uuid::Uuid` so WAL records stay bincode-compatible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// `bson::Document` serialized as raw BSON bytes; `Bson` itself is not
/// round-trippable through non-self-describing formats like bincode.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializableBsonDocument(pub BsonDocument);

impl Serialize for SerializableBsonDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = bson::to_vec(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for SerializableBsonDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = <Vec<u8>>::deserialize(deserializer)?;
        let doc = bson::from_slice(&bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(doc))
    }
}

/// `chrono::DateTime<Utc>` as an RFC 3339 string for the same reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializableDateTime(pub DateTime<Utc>);

impl Serialize for SerializableDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for SerializableDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let dt =
            DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)?.with_timezone(&Utc);
        Ok(Self(dt))
    }
}

/// Operations recorded in the WAL. Replaying the full sequence rebuilds
/// every collection, its documents, and its declared indexes.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Operation {
    CreateCollection,
    DropCollection,
    RenameCollection { new_name: CollectionName },
    Insert { document: Document },
    Update { document_id: DocumentId, new_document: Document },
    Delete { document_id: DocumentId },
    CreateIndex { spec: IndexSpec, kind: IndexKind },
    DropIndex { name: String },
}
