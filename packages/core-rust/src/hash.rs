//! Typed facade over a remote hash collection.
//!
//! [`RemoteHash`] treats a store-resident field/value map as a local
//! associative container. Keys and values are encoded through the
//! [`codec`](crate::codec) on the way out and decoded on the way back; all
//! commands go through the owned [`HashCommands`] handle.
//!
//! Traversal has two flavours: the lazy [`HashIter`] returned by
//! [`begin`](RemoteHash::begin), which never holds more than one page, and the
//! bulk materializations ([`keys`](RemoteHash::keys),
//! [`values`](RemoteHash::values), [`to_map`](RemoteHash::to_map),
//! [`to_hash`](RemoteHash::to_hash)) which load everything.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::marker::PhantomData;

use bytes::Bytes;
use tracing::{trace, warn};

use crate::category::{Canonical, ValueCategory};
use crate::codec::{serialize_optional, Codec};
use crate::commands::{ensure_pairs, HashCommands};
use crate::config::HashConfig;
use crate::cursor::{HashIter, Scanner};
use crate::error::{CodecError, HashResult};

/// A remote hash with typed keys `K` and values `V`.
///
/// `K` and `V` are declared categories: `u32`, `Box<u32>`, `Option<u32>` and
/// `&u32` all describe the same stored type (see
/// [`ValueCategory`](crate::category::ValueCategory)). Lookups return the
/// canonical type.
///
/// # Examples
///
/// ```
/// # use remote_hash_core::commands::{HashCommands, ScanBatch};
/// # use bytes::Bytes;
/// # use std::cell::RefCell;
/// # use std::collections::BTreeMap;
/// # #[derive(Default)]
/// # struct Local(RefCell<BTreeMap<Bytes, Bytes>>);
/// # impl HashCommands for Local {
/// #     type Token = u8;
/// #     fn name(&self) -> &str { "local" }
/// #     fn start_token(&self) -> u8 { 0 }
/// #     fn end_token(&self) -> u8 { 0 }
/// #     fn hash_get(&self, f: &[u8]) -> anyhow::Result<Bytes> { Ok(self.0.borrow().get(f).cloned().unwrap_or_default()) }
/// #     fn hash_set(&self, f: &[u8], v: &[u8], _: bool) -> anyhow::Result<bool> { self.0.borrow_mut().insert(Bytes::copy_from_slice(f), Bytes::copy_from_slice(v)); Ok(true) }
/// #     fn hash_delete(&self, f: &[u8], _: bool) -> anyhow::Result<bool> { Ok(self.0.borrow_mut().remove(f).is_some()) }
/// #     fn hash_exists(&self, f: &[u8]) -> anyhow::Result<bool> { Ok(self.0.borrow().contains_key(f)) }
/// #     fn hash_len(&self) -> anyhow::Result<usize> { Ok(self.0.borrow().len()) }
/// #     fn hash_keys(&self) -> anyhow::Result<Vec<Bytes>> { Ok(self.0.borrow().keys().cloned().collect()) }
/// #     fn hash_values(&self) -> anyhow::Result<Vec<Bytes>> { Ok(self.0.borrow().values().cloned().collect()) }
/// #     fn hash_get_all(&self) -> anyhow::Result<Vec<Bytes>> { Ok(self.0.borrow().iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect()) }
/// #     fn scan(&self, _: usize, _: &u8) -> anyhow::Result<ScanBatch<u8>> { Ok(ScanBatch { entries: self.hash_get_all()?, next: 0 }) }
/// #     fn collection_exists(&self) -> anyhow::Result<bool> { Ok(!self.0.borrow().is_empty()) }
/// #     fn collection_delete(&self, _: bool) -> anyhow::Result<()> { self.0.borrow_mut().clear(); Ok(()) }
/// # }
/// use remote_hash_core::{HashConfig, RemoteHash};
///
/// let scores: RemoteHash<String, u32, _> = RemoteHash::new(Local::default(), HashConfig::default());
/// scores.insert(&"ada".to_string(), &36, true)?;
/// assert_eq!(scores.get(&"ada".to_string())?, 36);
/// assert_eq!(scores.get(&"bob".to_string())?, 0);
///
/// let mut it = scores.begin(10)?;
/// assert_eq!(it.key()?, "ada");
/// it.advance(1)?;
/// assert!(it == scores.end(10));
/// # Ok::<(), remote_hash_core::HashError>(())
/// ```
pub struct RemoteHash<K, V, C> {
    commands: C,
    config: HashConfig,
    _marker: PhantomData<fn(K, V)>,
}

impl<K, V, C> RemoteHash<K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
{
    /// Wraps a command handle bound to one collection.
    pub fn new(commands: C, config: HashConfig) -> Self {
        Self {
            commands,
            config,
            _marker: PhantomData,
        }
    }

    /// Name of the underlying collection.
    pub fn name(&self) -> &str {
        self.commands.name()
    }

    /// Encoding and paging settings this hash was created with.
    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// The owned command handle.
    pub fn commands(&self) -> &C {
        &self.commands
    }

    fn encode_key(&self, key: &K) -> Result<Bytes, CodecError> {
        serialize_optional(key.canonical(), self.config.binarize_keys)
    }

    fn encode_value(&self, value: &V) -> Result<Bytes, CodecError> {
        serialize_optional(value.canonical(), self.config.binarize_values)
    }

    fn decode_key(&self, raw: &[u8]) -> Result<Canonical<K>, CodecError> {
        <Canonical<K> as Codec>::deserialize(raw, self.config.binarize_keys)
    }

    fn decode_value(&self, raw: &[u8]) -> Result<Canonical<V>, CodecError> {
        <Canonical<V> as Codec>::deserialize(raw, self.config.binarize_values)
    }

    // --- Point operations ---

    /// Value stored under `key`, or the default value when absent.
    ///
    /// Absence and a stored empty value are indistinguishable here; use
    /// [`contains_key`](Self::contains_key) when the difference matters.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn get(&self, key: &K) -> HashResult<Canonical<V>> {
        let field = self.encode_key(key)?;
        trace!(collection = self.name(), field_len = field.len(), "hash get");
        let raw = self.commands.hash_get(&field)?;
        Ok(self.decode_value(&raw)?)
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn insert(&self, key: &K, value: &V, wait_for_ack: bool) -> HashResult<bool> {
        let field = self.encode_key(key)?;
        let raw = self.encode_value(value)?;
        trace!(
            collection = self.name(),
            field_len = field.len(),
            value_len = raw.len(),
            wait_for_ack,
            "hash set"
        );
        Ok(self.commands.hash_set(&field, &raw, wait_for_ack)?)
    }

    /// Deletes `key`. Returns whether the backend reported a removal.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn remove(&self, key: &K, wait_for_ack: bool) -> HashResult<bool> {
        let field = self.encode_key(key)?;
        trace!(collection = self.name(), field_len = field.len(), wait_for_ack, "hash delete");
        Ok(self.commands.hash_delete(&field, wait_for_ack)?)
    }

    /// [`insert`](Self::insert) with the configured acknowledgement default.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn set(&self, key: &K, value: &V) -> HashResult<bool> {
        self.insert(key, value, self.config.wait_for_ack_on_insert)
    }

    /// [`remove`](Self::remove) with the configured acknowledgement default.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn delete(&self, key: &K) -> HashResult<bool> {
        self.remove(key, self.config.wait_for_ack_on_remove)
    }

    /// Reads then deletes `key`. The two commands are not atomic.
    ///
    /// Returns the previous value (default when absent) and whether a field
    /// was removed.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn take(&self, key: &K, wait_for_ack: bool) -> HashResult<(Canonical<V>, bool)> {
        let value = self.get(key)?;
        let removed = self.remove(key, wait_for_ack)?;
        Ok((value, removed))
    }

    /// Whether `key` is present.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn contains_key(&self, key: &K) -> HashResult<bool> {
        let field = self.encode_key(key)?;
        Ok(self.commands.hash_exists(&field)?)
    }

    /// Whether the collection itself exists in the store.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub fn exists(&self) -> HashResult<bool> {
        Ok(self.commands.collection_exists()?)
    }

    /// Number of entries.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub fn len(&self) -> HashResult<usize> {
        Ok(self.commands.hash_len()?)
    }

    /// Whether the hash has no entries.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub fn is_empty(&self) -> HashResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Deletes the whole collection.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub fn clear(&self, background: bool) -> HashResult<()> {
        trace!(collection = self.name(), background, "collection delete");
        Ok(self.commands.collection_delete(background)?)
    }

    // --- Traversal ---

    /// Iterator on the first entry, fetching `page_size` pairs per scan call.
    ///
    /// # Errors
    ///
    /// Returns the backend's error from the first scan call.
    pub fn begin(&self, page_size: usize) -> HashResult<HashIter<'_, K, V, C>> {
        HashIter::begin(&self.commands, page_size, &self.config)
    }

    /// The end sentinel. Makes no remote call.
    pub fn end(&self, page_size: usize) -> HashIter<'_, K, V, C> {
        HashIter::end(&self.commands, page_size, &self.config)
    }

    /// [`begin`](Self::begin) with the configured page size.
    ///
    /// # Errors
    ///
    /// Returns the backend's error from the first scan call.
    pub fn iter(&self) -> HashResult<HashIter<'_, K, V, C>> {
        self.begin(self.config.page_size)
    }

    /// Deletes the entry under `pos` and returns the iterator moved past it.
    ///
    /// # Errors
    ///
    /// Returns the backend's error from the delete or the refill.
    pub fn erase<'a>(
        &'a self,
        pos: HashIter<'a, K, V, C>,
        wait_for_ack: bool,
    ) -> HashResult<HashIter<'a, K, V, C>> {
        pos.erase(wait_for_ack)
    }

    // --- Bulk materialization ---

    /// Raw flattened pairs: one bulk command when `chunk_size` is 0,
    /// otherwise paginated scan calls of `chunk_size` pairs.
    fn fetch_pairs(&self, chunk_size: usize) -> HashResult<Vec<Bytes>> {
        if chunk_size == 0 {
            let raw = self.commands.hash_get_all()?;
            ensure_pairs(self.name(), "get_all", &raw)?;
            Ok(raw)
        } else {
            Scanner::new(&self.commands, chunk_size).collect_all()
        }
    }

    /// All keys. `chunk_size` 0 issues a single bulk command; otherwise the
    /// keys are gathered with scan calls of `chunk_size` pairs. Order is
    /// unspecified.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn keys(&self, chunk_size: usize) -> HashResult<Vec<Canonical<K>>> {
        let raw = if chunk_size == 0 {
            self.commands.hash_keys()?
        } else {
            self.fetch_pairs(chunk_size)?.into_iter().step_by(2).collect()
        };
        raw.iter()
            .map(|field| self.decode_key(field).map_err(Into::into))
            .collect()
    }

    /// All values, fetched as in [`keys`](Self::keys).
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn values(&self, chunk_size: usize) -> HashResult<Vec<Canonical<V>>> {
        let raw = if chunk_size == 0 {
            self.commands.hash_values()?
        } else {
            self.fetch_pairs(chunk_size)?
                .into_iter()
                .skip(1)
                .step_by(2)
                .collect()
        };
        raw.iter()
            .map(|value| self.decode_value(value).map_err(Into::into))
            .collect()
    }

    /// Decodes flattened pairs, handing each one to `insert`. Returns how
    /// many keys were seen more than once.
    fn decode_pairs(
        &self,
        raw: &[Bytes],
        mut insert: impl FnMut(Canonical<K>, Canonical<V>) -> bool,
    ) -> HashResult<usize> {
        let mut duplicates = 0;
        for pair in raw.chunks_exact(2) {
            let key = self.decode_key(&pair[0])?;
            let value = self.decode_value(&pair[1])?;
            if insert(key, value) {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(
                collection = self.name(),
                duplicates, "keys returned more than once during pagination; last value kept"
            );
        }
        Ok(duplicates)
    }
}

impl<K, V, C> RemoteHash<K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
    Canonical<K>: Ord,
{
    /// Snapshot of all entries as an ordered map, fetched as in
    /// [`keys`](Self::keys). A key returned twice across pages keeps the
    /// value seen last.
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn to_map(&self, chunk_size: usize) -> HashResult<BTreeMap<Canonical<K>, Canonical<V>>> {
        let raw = self.fetch_pairs(chunk_size)?;
        let mut map = BTreeMap::new();
        self.decode_pairs(&raw, |k, v| map.insert(k, v).is_some())?;
        Ok(map)
    }
}

impl<K, V, C> RemoteHash<K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
    Canonical<K>: Eq + Hash,
{
    /// Snapshot of all entries as an unordered map. Same fetching and
    /// duplicate handling as [`to_map`](Self::to_map).
    ///
    /// # Errors
    ///
    /// Returns a codec error or the backend's error.
    pub fn to_hash(&self, chunk_size: usize) -> HashResult<HashMap<Canonical<K>, Canonical<V>>> {
        let raw = self.fetch_pairs(chunk_size)?;
        let mut map = HashMap::with_capacity(raw.len() / 2);
        self.decode_pairs(&raw, |k, v| map.insert(k, v).is_some())?;
        Ok(map)
    }
}
