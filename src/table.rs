//! Node name → external address table.

use std::collections::BTreeMap;

/// The current external address of every node that has one.
///
/// Entries are kept sorted by node name so snapshots come out in a stable
/// order.  An entry is never stored with an empty address.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddressTable {
    entries: BTreeMap<String, String>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the address for `name`.
    ///
    /// Returns `true` if the mapping changed.  An empty address is treated as
    /// a removal.
    pub fn upsert(&mut self, name: &str, address: &str) -> bool {
        if address.is_empty() {
            return self.remove(name);
        }
        match self.entries.get(name) {
            Some(current) if current == address => false,
            _ => {
                self.entries.insert(name.to_string(), address.to_string());
                true
            }
        }
    }

    /// Remove `name`.  Returns `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Replace the whole table with `entries`, dropping empty addresses.
    ///
    /// Returns `true` if the resulting table differs from the previous one.
    pub fn replace_all<I>(&mut self, entries: I) -> bool
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let next: BTreeMap<String, String> = entries
            .into_iter()
            .filter(|(_, address)| !address.is_empty())
            .collect();
        if next == self.entries {
            return false;
        }
        self.entries = next;
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned `(name, address)` pairs, sorted by name.
    pub fn snapshot_entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, address)| (name.clone(), address.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_changes_only() {
        let mut table = AddressTable::new();
        assert!(table.upsert("node1", "1.2.3.4"));
        assert!(!table.upsert("node1", "1.2.3.4"));
        assert!(table.upsert("node1", "1.2.3.5"));
        assert_eq!(table.get("node1"), Some("1.2.3.5"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn upsert_with_empty_address_removes() {
        let mut table = AddressTable::new();
        table.upsert("node1", "1.2.3.4");
        assert!(table.upsert("node1", ""));
        assert!(table.is_empty());
        assert!(!table.upsert("node2", ""));
        assert!(table.is_empty());
    }

    #[test]
    fn remove_reports_presence() {
        let mut table = AddressTable::new();
        assert!(!table.remove("node1"));
        table.upsert("node1", "1.2.3.4");
        assert!(table.remove("node1"));
        assert!(!table.remove("node1"));
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let mut table = AddressTable::new();
        table.upsert("node2", "5.6.7.8");
        table.upsert("node1", "1.2.3.4");

        let snapshot = table.snapshot_entries();
        table.remove("node1");

        assert_eq!(
            snapshot,
            vec![
                ("node1".to_string(), "1.2.3.4".to_string()),
                ("node2".to_string(), "5.6.7.8".to_string()),
            ]
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn replace_all_detects_identical_listing() {
        let mut table = AddressTable::new();
        table.upsert("node1", "1.2.3.4");

        assert!(!table.replace_all(vec![("node1".into(), "1.2.3.4".into())]));
        assert!(table.replace_all(vec![
            ("node2".into(), "5.6.7.8".into()),
            ("node3".into(), String::new()),
        ]));
        assert_eq!(table.get("node1"), None);
        assert_eq!(table.get("node3"), None);
        assert_eq!(table.len(), 1);
    }
}
