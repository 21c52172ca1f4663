//! Scripted [`HashCommands`] backend for unit tests.
//!
//! Entries live in a key-ordered map. Scan tokens are `u64` with `0` as both
//! the start and the end token. A non-zero token indexes a recorded exclusive
//! lower bound, so deletions during a scan never cause skips.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ops::Bound;

use bytes::Bytes;

use crate::commands::{HashCommands, ScanBatch};

#[derive(Default)]
pub(crate) struct FakeHash {
    entries: RefCell<BTreeMap<Bytes, Bytes>>,
    bounds: RefCell<Vec<Option<Bytes>>>,
    /// Every n-th scan call returns an empty, non-terminal batch. 0 disables.
    empty_every: usize,
    /// Scan call number (1-based) that fails.
    fail_scan_on: Option<usize>,
    /// Unpaired field appended to every bulk `hash_get_all` reply.
    dangling_field: Option<Bytes>,
    scan_calls: Cell<usize>,
    deletes: Cell<usize>,
}

impl FakeHash {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_empty_every(mut self, n: usize) -> Self {
        self.empty_every = n;
        self
    }

    pub(crate) fn with_failing_scan(mut self, call: usize) -> Self {
        self.fail_scan_on = Some(call);
        self
    }

    pub(crate) fn with_dangling_field(mut self, field: impl Into<Bytes>) -> Self {
        self.dangling_field = Some(field.into());
        self
    }

    pub(crate) fn put(&self, field: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.entries.borrow_mut().insert(field.into(), value.into());
    }

    pub(crate) fn scan_calls(&self) -> usize {
        self.scan_calls.get()
    }

    pub(crate) fn deletes(&self) -> usize {
        self.deletes.get()
    }

    fn token_for(&self, bound: Option<Bytes>) -> u64 {
        let mut bounds = self.bounds.borrow_mut();
        bounds.push(bound);
        bounds.len() as u64
    }
}

impl HashCommands for FakeHash {
    type Token = u64;

    fn name(&self) -> &str {
        "fake"
    }

    fn start_token(&self) -> u64 {
        0
    }

    fn end_token(&self) -> u64 {
        0
    }

    fn hash_get(&self, field: &[u8]) -> anyhow::Result<Bytes> {
        Ok(self.entries.borrow().get(field).cloned().unwrap_or_default())
    }

    fn hash_set(&self, field: &[u8], value: &[u8], _wait_for_ack: bool) -> anyhow::Result<bool> {
        self.put(Bytes::copy_from_slice(field), Bytes::copy_from_slice(value));
        Ok(true)
    }

    fn hash_delete(&self, field: &[u8], _wait_for_ack: bool) -> anyhow::Result<bool> {
        self.deletes.set(self.deletes.get() + 1);
        Ok(self.entries.borrow_mut().remove(field).is_some())
    }

    fn hash_exists(&self, field: &[u8]) -> anyhow::Result<bool> {
        Ok(self.entries.borrow().contains_key(field))
    }

    fn hash_len(&self) -> anyhow::Result<usize> {
        Ok(self.entries.borrow().len())
    }

    fn hash_keys(&self) -> anyhow::Result<Vec<Bytes>> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }

    fn hash_values(&self) -> anyhow::Result<Vec<Bytes>> {
        Ok(self.entries.borrow().values().cloned().collect())
    }

    fn hash_get_all(&self) -> anyhow::Result<Vec<Bytes>> {
        let mut all: Vec<Bytes> = self
            .entries
            .borrow()
            .iter()
            .flat_map(|(k, v)| [k.clone(), v.clone()])
            .collect();
        all.extend(self.dangling_field.clone());
        Ok(all)
    }

    fn scan(&self, page_size: usize, cursor: &u64) -> anyhow::Result<ScanBatch<u64>> {
        let call = self.scan_calls.get() + 1;
        self.scan_calls.set(call);
        if self.fail_scan_on == Some(call) {
            anyhow::bail!("scan call {call} failed");
        }

        let lower = match *cursor {
            0 => None,
            n => {
                let index = usize::try_from(n - 1)?;
                self.bounds.borrow()[index].clone()
            }
        };

        if self.empty_every > 0 && call % self.empty_every == 0 {
            // A fresh token for the same position; never the end token.
            let next = self.token_for(lower);
            return Ok(ScanBatch {
                entries: Vec::new(),
                next,
            });
        }

        let entries = self.entries.borrow();
        let range = match &lower {
            Some(bound) => entries.range::<Bytes, _>((Bound::Excluded(bound), Bound::Unbounded)),
            None => entries.range::<Bytes, _>(..),
        };
        let page: Vec<(Bytes, Bytes)> = range
            .take(page_size.max(1))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let more = page.last().is_some_and(|(last, _)| {
            entries
                .range::<Bytes, _>((Bound::Excluded(last), Bound::Unbounded))
                .next()
                .is_some()
        });
        drop(entries);

        let next = match page.last() {
            Some((last, _)) if more => self.token_for(Some(last.clone())),
            _ => 0,
        };
        Ok(ScanBatch {
            entries: page.into_iter().flat_map(|(k, v)| [k, v]).collect(),
            next,
        })
    }

    fn collection_exists(&self) -> anyhow::Result<bool> {
        Ok(!self.entries.borrow().is_empty())
    }

    fn collection_delete(&self, _background: bool) -> anyhow::Result<()> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}
