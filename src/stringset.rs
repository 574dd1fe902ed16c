//! A sorted set of unique strings with a separator join.
//!
//! Collects phrase-match results: insertion keeps the entries ordered and
//! rejects duplicates, `join` produces the final newline-separated output.
//!
//! The membership comparison is deliberately asymmetric: an incoming
//! string is compared against stored entries only over its own length, so
//! a new string that is a strict prefix of a stored one counts as already
//! present. Phrase reconstructions that differ only by a longer stored
//! match collapse into one entry.

use std::cmp::Ordering;

#[derive(Debug, Default)]
pub struct StringSet {
    entries: Vec<String>,
    total_len: usize,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compare `incoming` against a stored entry over the incoming length,
    /// with a stored entry shorter than the sample ordered by its
    /// (implicit) terminator.
    fn probe(incoming: &[u8], stored: &str) -> Ordering {
        let stored = stored.as_bytes();
        let shared = incoming.len().min(stored.len());
        match incoming[..shared].cmp(&stored[..shared]) {
            Ordering::Equal => {
                if stored.len() >= incoming.len() {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            other => other,
        }
    }

    /// Insert a string, keeping the set sorted. Returns `false` when the
    /// set already holds an equal entry (or one the probe treats as equal).
    pub fn insert(&mut self, string: String) -> bool {
        let position = {
            let sample = string.as_bytes();
            match self
                .entries
                .binary_search_by(|stored| Self::probe(sample, stored).reverse())
            {
                Ok(_) => return false,
                Err(position) => position,
            }
        };
        self.total_len += string.len();
        self.entries.insert(position, string);
        true
    }

    /// Concatenate all entries with `separator`; when `trailing` is set the
    /// separator also closes the result. An empty set joins to an empty
    /// string either way.
    pub fn join(&self, separator: &str, trailing: bool) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let separators = if trailing {
            self.entries.len()
        } else {
            self.entries.len() - 1
        };
        let mut result = String::with_capacity(self.total_len + separators * separator.len());
        for (index, entry) in self.entries.iter().enumerate() {
            result.push_str(entry);
            if trailing || index + 1 < self.entries.len() {
                result.push_str(separator);
            }
        }
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_entries_sorted_and_unique() {
        let mut set = StringSet::new();
        assert!(set.insert("банан".to_string()));
        assert!(set.insert("арбуз".to_string()));
        assert!(set.insert("вишня".to_string()));
        assert!(!set.insert("банан".to_string()));
        let collected: Vec<&str> = set.iter().collect();
        assert_eq!(collected, ["арбуз", "банан", "вишня"]);
    }

    #[test]
    fn prefix_counts_as_duplicate() {
        // The probe compares only over the incoming length: "прод" is
        // treated as already present once "продажа" is stored.
        let mut set = StringSet::new();
        assert!(set.insert("продажа".to_string()));
        assert!(!set.insert("прод".to_string()));
        // The longer string is still distinct from the shorter one.
        let mut set = StringSet::new();
        assert!(set.insert("прод".to_string()));
        assert!(set.insert("продажа".to_string()));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn join_with_trailing_separator() {
        let mut set = StringSet::new();
        set.insert("b".to_string());
        set.insert("a".to_string());
        assert_eq!(set.join("\n", true), "a\nb\n");
        assert_eq!(set.join("\n", false), "a\nb");
        assert_eq!(StringSet::new().join("\n", true), "");
    }
}
