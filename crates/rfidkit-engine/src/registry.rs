//! Per-session tag deduplication.

use rfidkit_core::TagRecord;
use std::collections::HashSet;

/// Tags seen during one scan session, deduplicated by EPC.
///
/// Keeps the first sighting of every EPC in first-seen order; later sightings
/// of the same EPC are ignored, including their RSSI.
///
/// # Examples
///
/// ```
/// use rfidkit_core::TagRecord;
/// use rfidkit_engine::registry::TagRegistry;
///
/// let mut registry = TagRegistry::new();
/// assert!(registry.insert(TagRecord::new("AAAA").unwrap()));
/// assert!(!registry.insert(TagRecord::new("AAAA").unwrap()));
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: Vec<TagRecord>,
    seen: HashSet<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting. Returns true if the EPC was not seen before.
    pub fn insert(&mut self, tag: TagRecord) -> bool {
        if !self.seen.insert(tag.epc.clone()) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn contains(&self, epc: &str) -> bool {
        self.seen.contains(epc)
    }

    pub fn clear(&mut self) {
        self.tags.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Most recently discovered tag.
    pub fn last(&self) -> Option<&TagRecord> {
        self.tags.last()
    }

    /// Tags in first-seen order.
    pub fn tags(&self) -> &[TagRecord] {
        &self.tags
    }

    pub fn snapshot(&self) -> Vec<TagRecord> {
        self.tags.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tag(epc: &str, rssi: f64) -> TagRecord {
        TagRecord::builder(epc).rssi(rssi).build().unwrap()
    }

    #[test]
    fn test_first_sighting_wins() {
        let mut registry = TagRegistry::new();
        registry.insert(tag("AAAA", -40.0));
        registry.insert(tag("AAAA", -70.0));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.tags()[0].rssi, -40.0);
    }

    #[test]
    fn test_clear_forgets_epcs() {
        let mut registry = TagRegistry::new();
        registry.insert(tag("AAAA", -40.0));
        registry.clear();

        assert!(registry.is_empty());
        assert!(!registry.contains("AAAA"));
        assert!(registry.insert(tag("AAAA", -40.0)));
    }

    #[test]
    fn test_last_is_most_recent_new_tag() {
        let mut registry = TagRegistry::new();
        registry.insert(tag("AAAA", -40.0));
        registry.insert(tag("BBBB", -40.0));
        registry.insert(tag("AAAA", -40.0));

        assert_eq!(registry.last().map(|t| t.epc.as_str()), Some("BBBB"));
    }

    proptest! {
        #[test]
        fn prop_one_entry_per_epc_in_first_seen_order(
            sightings in prop::collection::vec("[A-F0-9]{1,3}", 0..64)
        ) {
            let mut registry = TagRegistry::new();
            for epc in &sightings {
                registry.insert(tag(epc, -50.0));
            }

            let mut expected: Vec<&String> = Vec::new();
            for epc in &sightings {
                if !expected.contains(&epc) {
                    expected.push(epc);
                }
            }

            let actual: Vec<&String> = registry.tags().iter().map(|t| &t.epc).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
