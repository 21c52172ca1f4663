//! In-memory [`HashCommands`] implementation.
//!
//! A [`Keyspace`] holds any number of named hashes in a [`DashMap`], each one
//! a key-ordered map behind its own `RwLock`. [`MemoryHash`] is a handle bound
//! to one name, the same way a remote connection handle is bound to one key.
//!
//! Scans walk a hash in field order and resume strictly after the last field
//! returned, so every field present for the whole scan is visited exactly
//! once regardless of concurrent inserts and deletes.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use remote_hash_core::commands::{HashCommands, ScanBatch};
use tracing::debug;

use crate::config::StoreConfig;

type Fields = Arc<RwLock<BTreeMap<Bytes, Bytes>>>;

/// Scan continuation token for [`MemoryHash`].
///
/// The default token both starts and ends a scan. Tokens handed out in the
/// middle of a scan carry a non-zero sequence number, so they never compare
/// equal to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryToken {
    after: Option<Bytes>,
    seq: usize,
}

/// A set of named in-memory hashes.
///
/// A hash comes into existence on its first write and disappears when its
/// last field is deleted.
#[derive(Default)]
pub struct Keyspace {
    hashes: DashMap<String, Fields>,
    config: StoreConfig,
}

impl Keyspace {
    /// Creates an empty keyspace.
    #[must_use]
    pub fn new(config: StoreConfig) -> Arc<Self> {
        Arc::new(Self {
            hashes: DashMap::new(),
            config,
        })
    }

    /// Handle bound to the hash called `name`. The hash need not exist yet.
    #[must_use]
    pub fn hash(self: &Arc<Self>, name: impl Into<String>) -> MemoryHash {
        MemoryHash {
            keyspace: Arc::clone(self),
            name: name.into(),
            scan_calls: AtomicUsize::new(0),
        }
    }

    /// Number of hashes currently present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether no hash currently exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Names of the hashes currently present, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hashes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Settings applied to every hash in this keyspace.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Handle to one named hash in a [`Keyspace`].
pub struct MemoryHash {
    keyspace: Arc<Keyspace>,
    name: String,
    scan_calls: AtomicUsize,
}

impl MemoryHash {
    fn fields(&self) -> Option<Fields> {
        self.keyspace.hashes.get(&self.name).map(|e| Arc::clone(e.value()))
    }

    /// Drops the hash from the keyspace if it has no fields left.
    fn prune_if_empty(&self) {
        self.keyspace
            .hashes
            .remove_if(&self.name, |_, fields| fields.read().is_empty());
    }

    /// Number of scan calls served so far.
    #[must_use]
    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::Relaxed)
    }
}

impl HashCommands for MemoryHash {
    type Token = MemoryToken;

    fn name(&self) -> &str {
        &self.name
    }

    fn start_token(&self) -> MemoryToken {
        MemoryToken::default()
    }

    fn end_token(&self) -> MemoryToken {
        MemoryToken::default()
    }

    fn hash_get(&self, field: &[u8]) -> anyhow::Result<Bytes> {
        Ok(self
            .fields()
            .and_then(|fields| fields.read().get(field).cloned())
            .unwrap_or_default())
    }

    fn hash_set(&self, field: &[u8], value: &[u8], _wait_for_ack: bool) -> anyhow::Result<bool> {
        // Written while the entry is held so a concurrent prune cannot orphan it.
        let entry = self.keyspace.hashes.entry(self.name.clone()).or_default();
        entry
            .value()
            .write()
            .insert(Bytes::copy_from_slice(field), Bytes::copy_from_slice(value));
        Ok(true)
    }

    fn hash_delete(&self, field: &[u8], _wait_for_ack: bool) -> anyhow::Result<bool> {
        let Some(fields) = self.fields() else {
            return Ok(false);
        };
        let removed = fields.write().remove(field).is_some();
        if removed {
            self.prune_if_empty();
        }
        Ok(removed)
    }

    fn hash_exists(&self, field: &[u8]) -> anyhow::Result<bool> {
        Ok(self
            .fields()
            .is_some_and(|fields| fields.read().contains_key(field)))
    }

    fn hash_len(&self) -> anyhow::Result<usize> {
        Ok(self.fields().map_or(0, |fields| fields.read().len()))
    }

    fn hash_keys(&self) -> anyhow::Result<Vec<Bytes>> {
        Ok(self
            .fields()
            .map(|fields| fields.read().keys().cloned().collect())
            .unwrap_or_default())
    }

    fn hash_values(&self) -> anyhow::Result<Vec<Bytes>> {
        Ok(self
            .fields()
            .map(|fields| fields.read().values().cloned().collect())
            .unwrap_or_default())
    }

    fn hash_get_all(&self) -> anyhow::Result<Vec<Bytes>> {
        Ok(self
            .fields()
            .map(|fields| {
                fields
                    .read()
                    .iter()
                    .flat_map(|(k, v)| [k.clone(), v.clone()])
                    .collect()
            })
            .unwrap_or_default())
    }

    fn scan(&self, page_size: usize, cursor: &MemoryToken) -> anyhow::Result<ScanBatch<MemoryToken>> {
        let seq = self.scan_calls.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(interval) = self.keyspace.config.effective_empty_page_interval() {
            if seq % interval == 0 {
                debug!(hash = %self.name, seq, "serving empty scan page");
                return Ok(ScanBatch {
                    entries: Vec::new(),
                    next: MemoryToken {
                        after: cursor.after.clone(),
                        seq,
                    },
                });
            }
        }

        let Some(fields) = self.fields() else {
            return Ok(ScanBatch {
                entries: Vec::new(),
                next: self.end_token(),
            });
        };
        let fields = fields.read();
        let lower = match &cursor.after {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        let mut remaining = fields.range::<Bytes, _>((lower, Bound::Unbounded));

        let mut entries = Vec::with_capacity(page_size.max(1) * 2);
        let mut last = None;
        for (field, value) in remaining.by_ref().take(page_size.max(1)) {
            entries.push(field.clone());
            entries.push(value.clone());
            last = Some(field.clone());
        }

        let next = match last {
            Some(after) if remaining.next().is_some() => MemoryToken {
                after: Some(after),
                seq,
            },
            _ => self.end_token(),
        };
        Ok(ScanBatch { entries, next })
    }

    fn collection_exists(&self) -> anyhow::Result<bool> {
        Ok(self.keyspace.hashes.contains_key(&self.name))
    }

    fn collection_delete(&self, background: bool) -> anyhow::Result<()> {
        let removed = self.keyspace.hashes.remove(&self.name);
        debug!(
            hash = %self.name,
            background,
            existed = removed.is_some(),
            "hash deleted"
        );
        Ok(())
    }
}
