// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store for local development and tests.
//!
//! Queries return documents in insertion order. Every write broadcasts the
//! collection name so live snapshots can refresh.

use super::{Document, FieldFilter, StoredDocument};
use crate::error::AppError;
use crate::snapshots::Snapshots;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct Collection {
    next_seq: u64,
    /// id -> (insertion sequence, fields)
    docs: HashMap<String, (u64, Document)>,
}

/// In-memory document store.
#[derive(Clone)]
pub struct MemoryDb {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    changes: broadcast::Sender<String>,
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDb {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    fn notify(&self, collection: &str) {
        // No subscribers is fine.
        let _ = self.changes.send(collection.to_string());
    }

    fn read<R>(&self, f: impl FnOnce(&HashMap<String, Collection>) -> R) -> R {
        let guard = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut HashMap<String, Collection>) -> R) -> R {
        let mut guard = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn get_document(&self, collection: &str, id: &str) -> Option<StoredDocument> {
        self.read(|cols| {
            cols.get(collection)
                .and_then(|col| col.docs.get(id))
                .map(|(_, fields)| StoredDocument {
                    id: id.to_string(),
                    fields: fields.clone(),
                })
        })
    }

    pub fn set_document(&self, collection: &str, id: &str, fields: Document) -> Result<(), AppError> {
        self.write(|cols| {
            let col = cols.entry(collection.to_string()).or_default();
            match col.docs.get_mut(id) {
                Some((_, existing)) => *existing = fields,
                None => {
                    let seq = col.next_seq;
                    col.next_seq += 1;
                    col.docs.insert(id.to_string(), (seq, fields));
                }
            }
        });
        self.notify(collection);
        Ok(())
    }

    /// Merge fields into an existing document; fails if it does not exist.
    pub fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), AppError> {
        self.write(|cols| -> Result<(), AppError> {
            let existing = cols
                .get_mut(collection)
                .and_then(|col| col.docs.get_mut(id))
                .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection, id)))?;
            existing.1.extend(fields);
            Ok(())
        })?;
        self.notify(collection);
        Ok(())
    }

    pub fn delete_document(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let removed = self.write(|cols| {
            cols.get_mut(collection)
                .and_then(|col| col.docs.remove(id))
                .is_some()
        });
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    pub fn query(&self, collection: &str, filter: &FieldFilter) -> Vec<StoredDocument> {
        self.read(|cols| {
            let Some(col) = cols.get(collection) else {
                return Vec::new();
            };
            let mut matched: Vec<(u64, StoredDocument)> = col
                .docs
                .iter()
                .filter(|(_, (_, fields))| filter.matches(fields))
                .map(|(id, (seq, fields))| {
                    (
                        *seq,
                        StoredDocument {
                            id: id.clone(),
                            fields: fields.clone(),
                        },
                    )
                })
                .collect();
            matched.sort_by_key(|(seq, _)| *seq);
            matched.into_iter().map(|(_, doc)| doc).collect()
        })
    }

    pub fn watch_document(&self, collection: &str, id: &str) -> Snapshots<Option<StoredDocument>> {
        let id = id.to_string();
        self.watch(collection, move |db, collection| db.get_document(collection, &id))
    }

    pub fn watch_query(&self, collection: &str, filter: FieldFilter) -> Snapshots<Vec<StoredDocument>> {
        self.watch(collection, move |db, collection| db.query(collection, &filter))
    }

    /// Emit `read` now and again after every change to `collection` that
    /// alters its result.
    fn watch<T, F>(&self, collection: &str, read: F) -> Snapshots<T>
    where
        T: PartialEq + Clone + Send + 'static,
        F: Fn(&MemoryDb, &str) -> T + Send + 'static,
    {
        let db = self.clone();
        let collection = collection.to_string();
        // Subscribe before the first read so no change is missed.
        let mut changes = self.changes.subscribe();

        Snapshots::spawn(move |tx| async move {
            let mut last: Option<T> = None;
            loop {
                let snapshot = read(&db, &collection);
                if last.as_ref() != Some(&snapshot) {
                    if tx.send(snapshot.clone()).await.is_err() {
                        return;
                    }
                    last = Some(snapshot);
                }

                loop {
                    match changes.recv().await {
                        Ok(changed) if changed == collection => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => break,
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        })
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.read(|cols| cols.get(collection).map_or(0, |col| col.docs.len()))
    }
}
