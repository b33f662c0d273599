//! The structured record carried by the `GOB` command.
//!
//! A record holds a handful of scalar fields plus at most one nested record.
//! The nested record is owned outright, so a chain of records is always a
//! finite tree with a single branch.

use std::collections::BTreeMap;

/// A structured record with an optional nested child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Integer field
    pub number: i64,
    /// Text field
    pub text: String,
    /// String to integer mapping (keys are unique)
    pub counts: BTreeMap<String, i64>,
    /// Raw byte field
    pub data: Vec<u8>,
    /// Optional nested record, exclusively owned by this one
    pub child: Option<Box<Record>>,
}

impl Record {
    /// Create a record with only the scalar fields set.
    pub fn new(number: i64, text: impl Into<String>) -> Self {
        Record {
            number,
            text: text.into(),
            ..Default::default()
        }
    }

    /// Add a mapping entry, replacing any previous value for `key`.
    pub fn with_count(mut self, key: impl Into<String>, value: i64) -> Self {
        self.counts.insert(key.into(), value);
        self
    }

    /// Set the byte field.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Attach a nested record.
    pub fn with_child(mut self, child: Record) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    /// Number of records in this chain, counting `self`.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.child.as_deref();
        while let Some(record) = current {
            depth += 1;
            current = record.child.as_deref();
        }
        depth
    }

    /// The fixed record sent by the client driver.
    pub fn demo() -> Self {
        Record::new(23, "String Data")
            .with_count("One", 1)
            .with_count("Two", 2)
            .with_count("Three", 3)
            .with_data(b"abc".to_vec())
            .with_child(
                Record::new(245, "Recursive Structs No Problem")
                    .with_count("01", 1)
                    .with_count("02", 2)
                    .with_count("03", 3),
            )
    }
}
