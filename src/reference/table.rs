use std::collections::HashMap;

/// Attributes looked up for one key. Column values are stored by the
/// requested column name so callers can ask for `BBID`, `Vector`, ...
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub key: String,
    attributes: HashMap<String, String>,
}

impl ReferenceRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Empty string when the attribute was not loaded or the cell was blank.
    pub fn get(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Key to record mapping, loaded once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    records: HashMap<String, ReferenceRecord>,
    duplicates: usize,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first record for a key; later duplicates are counted and dropped.
    pub fn insert(&mut self, record: ReferenceRecord) -> bool {
        if record.key.is_empty() {
            return false;
        }
        if self.records.contains_key(&record.key) {
            self.duplicates += 1;
            return false;
        }
        self.records.insert(record.key.clone(), record);
        true
    }

    pub fn lookup(&self, key: &str) -> Option<&ReferenceRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

impl FromIterator<ReferenceRecord> for ReferenceTable {
    fn from_iter<I: IntoIterator<Item = ReferenceRecord>>(iter: I) -> Self {
        let mut table = ReferenceTable::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_record_wins() {
        let mut table = ReferenceTable::new();
        assert!(table.insert(ReferenceRecord::new("J1").with_attribute("BBID", "BB1")));
        assert!(!table.insert(ReferenceRecord::new("J1").with_attribute("BBID", "BB2")));

        assert_eq!(table.len(), 1);
        assert_eq!(table.duplicates(), 1);
        assert_eq!(table.lookup("J1").unwrap().get("BBID"), "BB1");
    }

    #[test]
    fn test_empty_keys_are_ignored() {
        let table: ReferenceTable = vec![ReferenceRecord::new(""), ReferenceRecord::new("J2")]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 1);
        assert!(table.contains("J2"));
        assert!(!table.contains(""));
    }

    #[test]
    fn test_missing_attribute_is_blank() {
        let record = ReferenceRecord::new("J3");
        assert_eq!(record.get("Vector"), "");
    }
}
