// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::errors::StorageError;

use super::BlobStore;

/// In-process blob store used when no database is configured.
///
/// Contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<(String, String), Value>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get_json(&self, store: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let entry = self.blobs.get(&(store.to_owned(), key.to_owned()));
        Ok(entry.map(|value| value.clone()))
    }

    async fn set_json(&self, store: &str, key: &str, value: &Value) -> Result<(), StorageError> {
        self.blobs
            .insert((store.to_owned(), key.to_owned()), value.clone());
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .blobs
            .remove(&(store.to_owned(), key.to_owned()))
            .is_some())
    }

    async fn list_keys(&self, store: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .blobs
            .iter()
            .filter(|entry| entry.key().0 == store)
            .map(|entry| entry.key().1.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
