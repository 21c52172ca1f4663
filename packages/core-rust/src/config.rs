//! Configuration for a typed remote hash.

/// Default number of pairs requested per scan call.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Per-hash configuration for [`RemoteHash`](crate::hash::RemoteHash).
///
/// Encoding flags must match across every client of a collection: a hash
/// written with binary-safe keys cannot be read back with textual keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashConfig {
    /// Page size used by [`RemoteHash::iter`](crate::hash::RemoteHash::iter).
    pub page_size: usize,
    /// Encode integral keys as fixed-width big-endian bytes.
    pub binarize_keys: bool,
    /// Encode integral values as fixed-width big-endian bytes.
    pub binarize_values: bool,
    /// Whether `insert` waits for the store's acknowledgement.
    pub wait_for_ack_on_insert: bool,
    /// Whether `remove` and `take` wait for the store's acknowledgement.
    pub wait_for_ack_on_remove: bool,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            binarize_keys: false,
            binarize_values: false,
            wait_for_ack_on_insert: false,
            wait_for_ack_on_remove: true,
        }
    }
}

impl HashConfig {
    /// Sets the default scan page size. Zero is raised to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Enables or disables binary-safe encoding for both keys and values.
    #[must_use]
    pub fn with_binarize(mut self, binarize: bool) -> Self {
        self.binarize_keys = binarize;
        self.binarize_values = binarize;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_config_defaults() {
        let config = HashConfig::default();
        assert_eq!(config.page_size, 100);
        assert!(!config.binarize_keys);
        assert!(!config.binarize_values);
        assert!(!config.wait_for_ack_on_insert);
        assert!(config.wait_for_ack_on_remove);
    }

    #[test]
    fn zero_page_size_is_raised() {
        let config = HashConfig::default().with_page_size(0);
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn with_binarize_sets_both_flags() {
        let config = HashConfig::default().with_binarize(true);
        assert!(config.binarize_keys);
        assert!(config.binarize_values);
    }
}
