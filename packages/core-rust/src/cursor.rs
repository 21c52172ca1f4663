//! Lazy, cursor-driven traversal of a remote hash.
//!
//! [`Scanner`] drives the paginated scan primitive through the explicit
//! [`ScanCursor`] state machine. [`HashIter`] sits on top of it: it keeps a
//! local buffer of raw pairs, refills it only when empty, and decodes the
//! current key and value at most once per position.
//!
//! # Consistency
//!
//! Pairs already buffered stay valid for the rest of the traversal, even if
//! they are deleted remotely in the meantime. Entries not yet buffered are
//! subject to whatever the store's scan guarantees: every entry present for
//! the full duration of the scan is visited, nothing more. There is no
//! snapshot isolation.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use tracing::debug;

use crate::category::{Canonical, CanonicalRef, ValueCategory};
use crate::codec::Codec;
use crate::commands::{ensure_pairs, HashCommands};
use crate::config::HashConfig;
use crate::error::{CodecError, HashResult};

/// Position of a scan in the store's enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanCursor<T> {
    /// No scan call has been issued yet.
    NotStarted,
    /// The last scan call returned this non-terminal continuation token.
    Active(T),
    /// The store reported the end of the enumeration. Terminal.
    Exhausted,
}

impl<T> ScanCursor<T> {
    /// Whether the enumeration has ended.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ScanCursor::Exhausted)
    }
}

/// Pulls raw scan batches until the store reports the end token.
///
/// A batch may be empty while the cursor is still active; the store is
/// allowed to return nothing for a span of its enumeration.
pub struct Scanner<'a, C: HashCommands> {
    commands: &'a C,
    page_size: usize,
    cursor: ScanCursor<C::Token>,
}

impl<'a, C: HashCommands> Scanner<'a, C> {
    /// Creates a scanner that has not issued any call yet.
    #[must_use]
    pub fn new(commands: &'a C, page_size: usize) -> Self {
        Self {
            commands,
            page_size: page_size.max(1),
            cursor: ScanCursor::NotStarted,
        }
    }

    /// Current cursor state.
    #[must_use]
    pub fn cursor(&self) -> &ScanCursor<C::Token> {
        &self.cursor
    }

    /// Issues one scan call and returns its flattened pairs, or `None` once
    /// the cursor is exhausted. No call is made after exhaustion.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged, or an error if the backend
    /// returned an odd number of elements. The cursor is left untouched on
    /// error, so the call can be retried.
    pub fn next_batch(&mut self) -> HashResult<Option<Vec<Bytes>>> {
        let token = match &self.cursor {
            ScanCursor::Exhausted => return Ok(None),
            ScanCursor::NotStarted => self.commands.start_token(),
            ScanCursor::Active(token) => token.clone(),
        };

        let batch = self.commands.scan(self.page_size, &token)?;
        ensure_pairs(self.commands.name(), "scan", &batch.entries)?;

        let exhausted = batch.next == self.commands.end_token();
        debug!(
            collection = self.commands.name(),
            page_size = self.page_size,
            pairs = batch.pair_count(),
            exhausted,
            "scan batch received"
        );
        self.cursor = if exhausted {
            ScanCursor::Exhausted
        } else {
            ScanCursor::Active(batch.next)
        };
        Ok(Some(batch.entries))
    }

    /// Drains the whole enumeration into one flattened list.
    ///
    /// # Errors
    ///
    /// Fails on the first failing scan call.
    pub fn collect_all(mut self) -> HashResult<Vec<Bytes>> {
        let mut elements = Vec::new();
        while let Some(batch) = self.next_batch()? {
            elements.extend(batch);
        }
        Ok(elements)
    }
}

impl<C: HashCommands> Clone for Scanner<'_, C> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands,
            page_size: self.page_size,
            cursor: self.cursor.clone(),
        }
    }
}

/// Forward-only iterator over the entries of a remote hash.
///
/// Created by [`RemoteHash::begin`](crate::hash::RemoteHash::begin) (positioned
/// on the first entry) or [`RemoteHash::end`](crate::hash::RemoteHash::end)
/// (the terminal sentinel). Two iterators compare equal when their ordinals
/// are equal; in practice this is only meaningful against the end sentinel.
///
/// Besides the positional API it implements [`Iterator`], yielding decoded
/// pairs from the current position onwards.
pub struct HashIter<'a, K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
{
    scanner: Scanner<'a, C>,
    binarize_keys: bool,
    binarize_values: bool,
    buffer: VecDeque<Bytes>,
    ordinal: Option<u64>,
    current: Option<(Bytes, Bytes)>,
    key: Option<Canonical<K>>,
    value: Option<Canonical<V>>,
    failed: bool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<'a, K, V, C> HashIter<'a, K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
{
    fn detached(commands: &'a C, page_size: usize, config: &HashConfig) -> Self {
        Self {
            scanner: Scanner::new(commands, page_size),
            binarize_keys: config.binarize_keys,
            binarize_values: config.binarize_values,
            buffer: VecDeque::new(),
            ordinal: None,
            current: None,
            key: None,
            value: None,
            failed: false,
            _marker: PhantomData,
        }
    }

    /// Iterator positioned on the first entry, or equal to the end sentinel
    /// when the hash is empty.
    pub(crate) fn begin(commands: &'a C, page_size: usize, config: &HashConfig) -> HashResult<Self> {
        let mut iter = Self::detached(commands, page_size, config);
        iter.ordinal = Some(0);
        iter.load_next()?;
        Ok(iter)
    }

    /// The terminal sentinel.
    pub(crate) fn end(commands: &'a C, page_size: usize, config: &HashConfig) -> Self {
        let mut iter = Self::detached(commands, page_size, config);
        iter.scanner.cursor = ScanCursor::Exhausted;
        iter
    }

    /// Logical ordinal of the current entry, `None` at the end.
    #[must_use]
    pub fn ordinal(&self) -> Option<u64> {
        self.ordinal
    }

    /// Whether this iterator is the terminal sentinel.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.ordinal.is_none()
    }

    /// Scan cursor state backing this iterator.
    #[must_use]
    pub fn cursor(&self) -> &ScanCursor<C::Token> {
        self.scanner.cursor()
    }

    /// Number of raw pairs fetched but not yet visited.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len() / 2
    }

    /// Undecoded field of the current entry.
    #[must_use]
    pub fn raw_key(&self) -> Option<&Bytes> {
        self.current.as_ref().map(|(k, _)| k)
    }

    /// Undecoded value of the current entry.
    #[must_use]
    pub fn raw_value(&self) -> Option<&Bytes> {
        self.current.as_ref().map(|(_, v)| v)
    }

    /// Moves forward `n` entries, refilling the buffer as needed.
    ///
    /// Reaching the end of the hash turns this into the end sentinel; any
    /// later call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if a refill fails. The iterator keeps the
    /// position reached so far.
    pub fn advance(&mut self, n: usize) -> HashResult<()> {
        if n > 0 {
            self.key = None;
            self.value = None;
        }
        for _ in 0..n {
            if self.ordinal.is_none() || !self.load_next()? {
                return Ok(());
            }
            self.ordinal = self.ordinal.map(|o| o + 1);
        }
        Ok(())
    }

    /// Decoded key of the current entry; the default value at the end.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the stored field does not decode.
    pub fn key(&mut self) -> Result<CanonicalRef<'_, K>, CodecError> {
        if self.key.is_none() {
            let decoded = match &self.current {
                Some((raw, _)) => <Canonical<K> as Codec>::deserialize(raw, self.binarize_keys)?,
                None => <Canonical<K> as Default>::default(),
            };
            self.key = Some(decoded);
        }
        Ok(&*self.key.get_or_insert_with(Default::default))
    }

    /// Decoded value of the current entry; the default value at the end.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the stored value does not decode.
    pub fn value(&mut self) -> Result<CanonicalRef<'_, V>, CodecError> {
        if self.value.is_none() {
            let decoded = match &self.current {
                Some((_, raw)) => <Canonical<V> as Codec>::deserialize(raw, self.binarize_values)?,
                None => <Canonical<V> as Default>::default(),
            };
            self.value = Some(decoded);
        }
        Ok(&*self.value.get_or_insert_with(Default::default))
    }

    /// Deletes the current entry remotely and moves one step forward.
    ///
    /// At the end sentinel nothing is deleted and the iterator is returned
    /// unchanged. Entries already buffered are unaffected by the delete.
    ///
    /// # Errors
    ///
    /// Returns the backend's error from the delete or the refill. If the
    /// delete went through but the refill failed, the entry is gone and the
    /// iterator is dropped with its position; restart from
    /// [`RemoteHash::begin`](crate::hash::RemoteHash::begin), which will not
    /// see the deleted entry again.
    pub fn erase(mut self, wait_for_ack: bool) -> HashResult<Self> {
        let Some((field, _)) = &self.current else {
            return Ok(self);
        };
        self.scanner.commands.hash_delete(field, wait_for_ack)?;
        self.advance(1)?;
        Ok(self)
    }

    /// Pops the next pair into `current`, or turns into the end sentinel.
    fn load_next(&mut self) -> HashResult<bool> {
        if !self.refill()? {
            self.ordinal = None;
            self.current = None;
            return Ok(false);
        }
        match (self.buffer.pop_front(), self.buffer.pop_front()) {
            (Some(field), Some(value)) => {
                self.current = Some((field, value));
                Ok(true)
            }
            _ => {
                self.ordinal = None;
                self.current = None;
                Ok(false)
            }
        }
    }

    /// Ensures the buffer holds at least one pair. Returns `false` once the
    /// scan is exhausted with nothing left to visit.
    fn refill(&mut self) -> HashResult<bool> {
        while self.buffer.is_empty() {
            match self.scanner.next_batch()? {
                Some(batch) => self.buffer.extend(batch),
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn take_current(&mut self) -> Result<(Canonical<K>, Canonical<V>), CodecError> {
        self.key()?;
        self.value()?;
        Ok((
            self.key.take().unwrap_or_default(),
            self.value.take().unwrap_or_default(),
        ))
    }
}

impl<K, V, C> HashIter<'_, K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
    Canonical<K>: Clone,
    Canonical<V>: Clone,
{
    /// A copy of this iterator moved forward `n` entries.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if a refill fails.
    pub fn advanced(&self, n: usize) -> HashResult<Self> {
        let mut copy = self.clone();
        copy.advance(n)?;
        Ok(copy)
    }
}

impl<K, V, C> Clone for HashIter<'_, K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
    Canonical<K>: Clone,
    Canonical<V>: Clone,
{
    fn clone(&self) -> Self {
        Self {
            scanner: self.scanner.clone(),
            binarize_keys: self.binarize_keys,
            binarize_values: self.binarize_values,
            buffer: self.buffer.clone(),
            ordinal: self.ordinal,
            current: self.current.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            failed: self.failed,
            _marker: PhantomData,
        }
    }
}

impl<K, V, C> PartialEq for HashIter<'_, K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
{
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal
    }
}

impl<K, V, C> fmt::Debug for HashIter<'_, K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashIter")
            .field("collection", &self.scanner.commands.name())
            .field("ordinal", &self.ordinal)
            .field("cursor", &self.scanner.cursor)
            .field("buffered", &self.buffered())
            .finish_non_exhaustive()
    }
}

impl<K, V, C> Iterator for HashIter<'_, K, V, C>
where
    K: ValueCategory,
    V: ValueCategory,
    C: HashCommands,
{
    type Item = HashResult<(Canonical<K>, Canonical<V>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_end() {
            return None;
        }
        let pair = match self.take_current() {
            Ok(pair) => pair,
            Err(err) => {
                self.failed = true;
                return Some(Err(err.into()));
            }
        };
        if let Err(err) = self.advance(1) {
            self.failed = true;
            return Some(Err(err));
        }
        Some(Ok(pair))
    }
}
