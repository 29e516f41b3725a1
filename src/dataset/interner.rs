use crate::error::{CfError, Result};
use std::collections::HashMap;

/// Append-only mapping between string identifiers and dense indices.
///
/// Indices are handed out in first-seen order and never reused, so the
/// position of a key in [`Interner::keys`] is its index.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    index: HashMap<String, usize>,
    keys: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `key`, assigning the next one if it is new.
    pub fn index_of(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.keys.len();
        self.keys.push(key.to_string());
        self.index.insert(key.to_string(), idx);
        idx
    }

    /// Looks up `key` without assigning.
    pub fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn key_of(&self, idx: usize) -> Result<&str> {
        self.keys
            .get(idx)
            .map(String::as_str)
            .ok_or(CfError::OutOfRange {
                index: idx,
                len: self.keys.len(),
            })
    }

    /// Replaces the table with `keys`, index = position in the list.
    pub fn import(&mut self, keys: Vec<String>) -> Result<()> {
        let mut index = HashMap::with_capacity(keys.len());
        for (idx, key) in keys.iter().enumerate() {
            if index.insert(key.clone(), idx).is_some() {
                return Err(CfError::MalformedSnapshot(format!(
                    "duplicate identifier `{}` in interner table",
                    key
                )));
            }
        }
        self.index = index;
        self.keys = keys;
        Ok(())
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
