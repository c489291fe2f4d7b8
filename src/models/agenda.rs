use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One numbered item of business on a meeting's agenda
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    /// Ordinal used in spoken references ("item N")
    pub index: u32,
    /// Text following the number on the agenda line
    pub description: String,
    /// External bill number, when the line carries one
    pub reference_number: Option<String>,
}

impl AgendaItem {
    /// Render as an agenda line: "N. description"
    pub fn line(&self) -> String {
        format!("{}. {}", self.index, self.description)
    }
}

/// All agenda items referenced in one meeting, keyed by index.
///
/// Built once per meeting and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPool {
    items: BTreeMap<u32, AgendaItem>,
}

impl BillPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item unless its index is already present.
    ///
    /// Returns false when the index was taken; the first occurrence wins.
    pub fn insert_first(&mut self, item: AgendaItem) -> bool {
        if self.items.contains_key(&item.index) {
            return false;
        }
        self.items.insert(item.index, item);
        true
    }

    pub fn get(&self, index: u32) -> Option<&AgendaItem> {
        self.items.get(&index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = &AgendaItem> {
        self.items.values()
    }

    /// The pool as "index. description" lines, ascending
    pub fn lines(&self) -> Vec<String> {
        self.iter().map(AgendaItem::line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: u32, description: &str) -> AgendaItem {
        AgendaItem {
            index,
            description: description.to_string(),
            reference_number: None,
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut pool = BillPool::new();
        assert!(pool.insert_first(item(2, "first")));
        assert!(!pool.insert_first(item(2, "second")));
        assert_eq!(pool.get(2).unwrap().description, "first");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_lines_are_sorted() {
        let mut pool = BillPool::new();
        pool.insert_first(item(10, "ten"));
        pool.insert_first(item(1, "one"));
        pool.insert_first(item(3, "three"));
        assert_eq!(pool.lines(), vec!["1. one", "3. three", "10. ten"]);
    }
}
