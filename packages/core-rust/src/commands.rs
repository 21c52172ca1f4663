//! Command contract for the store holding a remote hash.
//!
//! [`HashCommands`] is the only surface through which this crate talks to a
//! store. An implementation is bound to a single hash collection and moves
//! raw byte strings; typed conversion happens in [`codec`](crate::codec).
//! Connection management, retries and timeouts belong to the implementation.

use std::fmt;

use bytes::Bytes;

/// One page returned by [`HashCommands::scan`].
#[derive(Debug, Clone)]
pub struct ScanBatch<T> {
    /// Flattened pairs: element `2i` is a field, `2i + 1` its value.
    pub entries: Vec<Bytes>,
    /// Continuation token for the next call.
    pub next: T,
}

impl<T> ScanBatch<T> {
    /// Number of field/value pairs in the batch.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.entries.len() / 2
    }
}

/// Rejects a flattened reply that does not hold whole field/value pairs.
///
/// # Errors
///
/// Returns an error naming the collection and command when `entries` has an
/// odd length.
pub(crate) fn ensure_pairs(collection: &str, command: &str, entries: &[Bytes]) -> anyhow::Result<()> {
    if entries.len() % 2 != 0 {
        anyhow::bail!(
            "{command} of {collection} returned {} elements, expected field/value pairs",
            entries.len()
        );
    }
    Ok(())
}

/// Raw commands against one remote hash collection.
///
/// All operations are synchronous from the caller's point of view. Whether
/// they block a thread or park a cooperative task is up to the implementation.
///
/// # Scan contract
///
/// Scanning starts from [`start_token`](HashCommands::start_token) and ends
/// once a call returns [`end_token`](HashCommands::end_token). The two may be
/// equal. A call may return an empty batch without ending the scan, but a
/// scan over a collection that is not growing must reach the end token after
/// a bounded number of calls; callers loop until it does.
pub trait HashCommands {
    /// Opaque scan continuation token.
    type Token: Clone + PartialEq + fmt::Debug;

    /// Name of the collection, for logging.
    fn name(&self) -> &str;

    /// Token that starts a scan from the beginning.
    fn start_token(&self) -> Self::Token;

    /// Token returned once the scan has visited everything.
    fn end_token(&self) -> Self::Token;

    /// Value stored for `field`, or an empty byte string when absent.
    fn hash_get(&self, field: &[u8]) -> anyhow::Result<Bytes>;

    /// Stores `value` under `field`.
    fn hash_set(&self, field: &[u8], value: &[u8], wait_for_ack: bool) -> anyhow::Result<bool>;

    /// Deletes `field`. Returns whether a field was removed.
    fn hash_delete(&self, field: &[u8], wait_for_ack: bool) -> anyhow::Result<bool>;

    /// Whether `field` is present.
    fn hash_exists(&self, field: &[u8]) -> anyhow::Result<bool>;

    /// Number of fields.
    fn hash_len(&self) -> anyhow::Result<usize>;

    /// All fields in one call.
    fn hash_keys(&self) -> anyhow::Result<Vec<Bytes>>;

    /// All values in one call.
    fn hash_values(&self) -> anyhow::Result<Vec<Bytes>>;

    /// All pairs in one call, flattened as in [`ScanBatch::entries`].
    fn hash_get_all(&self) -> anyhow::Result<Vec<Bytes>>;

    /// Fetches roughly `page_size` pairs starting at `cursor`.
    fn scan(&self, page_size: usize, cursor: &Self::Token) -> anyhow::Result<ScanBatch<Self::Token>>;

    /// Whether the collection itself exists.
    fn collection_exists(&self) -> anyhow::Result<bool>;

    /// Deletes the whole collection. `background` requests a non-blocking delete.
    fn collection_delete(&self, background: bool) -> anyhow::Result<()>;
}
