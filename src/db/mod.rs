// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document storage (Firestore, or in-process for development).
//!
//! Documents are schemaless JSON maps; typed models convert to and from
//! them at the service layer.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::snapshots::Snapshots;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{de::DeserializeOwned, Serialize};

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by identity id)
    pub const USERS: &str = "users";
    /// Goals (generated ids, filtered by owner)
    pub const GOALS: &str = "goals";
}

/// Field names shared with documents written by the mobile client.
pub mod fields {
    pub const USER_ID: &str = "userId";
    pub const PHOTO_URL: &str = "photoURL";
}

/// Raw document fields.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

impl StoredDocument {
    /// Deserialize the fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(serde_json::Value::Object(self.fields.clone())).map_err(|e| {
            AppError::Database(format!("Malformed document {}: {}", self.id, e))
        })
    }
}

/// Serialize a typed record into document fields.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, AppError> {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Internal(anyhow::anyhow!(
            "Record did not serialize to an object"
        ))),
        Err(e) => Err(AppError::Internal(e.into())),
    }
}

/// Equality filter on a string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a document's fields satisfy this filter.
    pub fn matches(&self, fields: &Document) -> bool {
        matches!(fields.get(&self.field), Some(serde_json::Value::String(v)) if *v == self.value)
    }
}

const DOCUMENT_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const DOCUMENT_ID_LEN: usize = 20;

/// Generate a random 20-character document id in the same alphabet the
/// Firebase client SDKs use for auto ids.
pub fn new_document_id() -> Result<String, AppError> {
    let rng = SystemRandom::new();
    // Largest multiple of the alphabet size below 256, to avoid modulo bias.
    let limit = (256 / DOCUMENT_ID_ALPHABET.len() * DOCUMENT_ID_ALPHABET.len()) as u8;
    let mut id = String::with_capacity(DOCUMENT_ID_LEN);
    let mut buf = [0u8; 32];

    while id.len() < DOCUMENT_ID_LEN {
        rng.fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Random id generation failed")))?;
        for byte in buf.iter().copied().filter(|b| *b < limit) {
            if id.len() == DOCUMENT_ID_LEN {
                break;
            }
            let idx = byte as usize % DOCUMENT_ID_ALPHABET.len();
            id.push(DOCUMENT_ID_ALPHABET[idx] as char);
        }
    }

    Ok(id)
}

/// Document store handle.
#[derive(Clone)]
pub struct DocumentStore {
    inner: StoreInner,
}

#[derive(Clone)]
enum StoreInner {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl DocumentStore {
    pub fn firestore(db: FirestoreDb) -> Self {
        Self {
            inner: StoreInner::Firestore(db),
        }
    }

    pub fn memory(db: MemoryDb) -> Self {
        Self {
            inner: StoreInner::Memory(db),
        }
    }

    /// The in-process store, if this handle uses one.
    pub fn as_memory(&self) -> Option<&MemoryDb> {
        match &self.inner {
            StoreInner::Memory(db) => Some(db),
            StoreInner::Firestore(_) => None,
        }
    }

    /// Read a single document.
    pub async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, AppError> {
        match &self.inner {
            StoreInner::Firestore(db) => db.get_document(collection, id).await,
            StoreInner::Memory(db) => Ok(db.get_document(collection, id)),
        }
    }

    /// Write a document, replacing all existing fields.
    pub async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<(), AppError> {
        match &self.inner {
            StoreInner::Firestore(db) => db.set_document(collection, id, fields).await,
            StoreInner::Memory(db) => db.set_document(collection, id, fields.clone()),
        }
    }

    /// Merge `fields` into an existing document.
    pub async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<(), AppError> {
        match &self.inner {
            StoreInner::Firestore(db) => db.update_document(collection, id, fields).await,
            StoreInner::Memory(db) => db.update_document(collection, id, fields.clone()),
        }
    }

    /// Write a new document under a generated id and return the id.
    pub async fn add_document(&self, collection: &str, fields: &Document) -> Result<String, AppError> {
        let id = new_document_id()?;
        self.set_document(collection, &id, fields).await?;
        Ok(id)
    }

    /// Delete a document. Deleting a missing document is not an error.
    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.inner {
            StoreInner::Firestore(db) => db.delete_document(collection, id).await,
            StoreInner::Memory(db) => db.delete_document(collection, id),
        }
    }

    /// Run an equality query in the store's default order.
    pub async fn query(
        &self,
        collection: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<StoredDocument>, AppError> {
        match &self.inner {
            StoreInner::Firestore(db) => db.query(collection, filter).await,
            StoreInner::Memory(db) => Ok(db.query(collection, filter)),
        }
    }

    /// Live snapshots of one document (`None` while it does not exist).
    pub fn watch_document(&self, collection: &str, id: &str) -> Snapshots<Option<StoredDocument>> {
        match &self.inner {
            StoreInner::Firestore(db) => db.watch_document(collection, id),
            StoreInner::Memory(db) => db.watch_document(collection, id),
        }
    }

    /// Live snapshots of a filtered query.
    pub fn watch_query(&self, collection: &str, filter: FieldFilter) -> Snapshots<Vec<StoredDocument>> {
        match &self.inner {
            StoreInner::Firestore(db) => db.watch_query(collection, filter),
            StoreInner::Memory(db) => db.watch_query(collection, filter),
        }
    }
}
