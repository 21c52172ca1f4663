//! Configuration for the in-memory store.

/// Behaviour knobs for a [`Keyspace`](crate::memory::Keyspace).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Every n-th scan call on a hash returns an empty, non-terminal page,
    /// the way a real server may return nothing for a span of its table.
    /// `None` (or a value below 2) disables it.
    pub empty_page_interval: Option<usize>,
}

impl StoreConfig {
    /// Interval actually applied to scans, if any.
    #[must_use]
    pub fn effective_empty_page_interval(&self) -> Option<usize> {
        self.empty_page_interval.filter(|n| *n >= 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_defaults() {
        let config = StoreConfig::default();
        assert!(config.empty_page_interval.is_none());
        assert!(config.effective_empty_page_interval().is_none());
    }

    #[test]
    fn interval_below_two_is_disabled() {
        // An interval of 1 would make every page empty and the scan endless.
        for n in [0, 1] {
            let config = StoreConfig {
                empty_page_interval: Some(n),
            };
            assert!(config.effective_empty_page_interval().is_none());
        }
        let config = StoreConfig {
            empty_page_interval: Some(3),
        };
        assert_eq!(config.effective_empty_page_interval(), Some(3));
    }
}
