// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Key-value storage of JSON documents, grouped into named stores.
//!
//! The backend treats the store as an external service and only relies on
//! the operations of [`BlobStore`].

use std::fmt;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::errors::StorageError;

pub use memory::MemoryBlobStore;
pub use postgres::PgBlobStore;

mod memory;
mod postgres;

#[async_trait]
pub trait BlobStore: fmt::Debug + Send + Sync + 'static {
    async fn get_json(&self, store: &str, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set_json(&self, store: &str, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Returns whether a value was deleted.
    async fn delete(&self, store: &str, key: &str) -> Result<bool, StorageError>;

    /// All keys of the store in lexicographic order.
    async fn list_keys(&self, store: &str) -> Result<Vec<String>, StorageError>;
}

/// Typed access to a blob holding a JSON array.
pub(crate) async fn load_list<T: DeserializeOwned>(
    blobs: &dyn BlobStore,
    store: &str,
    key: &str,
) -> Result<Option<Vec<T>>, StorageError> {
    match blobs.get_json(store, key).await? {
        Some(value @ Value::Array(_)) => Ok(Some(serde_json::from_value(value)?)),
        Some(_) => {
            tracing::warn!(store, key, "Stored blob is not a list, treating it as empty");
            Ok(Some(Vec::new()))
        }
        None => Ok(None),
    }
}

pub(crate) async fn store_list<T: Serialize>(
    blobs: &dyn BlobStore,
    store: &str,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let value = serde_json::to_value(items)?;
    blobs.set_json(store, key, &value).await
}
