// history.rs

use std::io::{self, Write};
use crate::error::{Result, ShellError};
use crate::util::writeln_ignore_broken_pipe;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub sequence_number: u64,
    pub text: String,
}

/// Fixed-capacity ring of past command lines.
///
/// The k-th line ever added carries sequence number k. Once the ring is
/// full every `add` evicts the oldest entry, so the retained numbers are
/// always the contiguous range `oldest_sequence_number..=last_sequence_number()`.
pub struct HistoryStore {
    slots: Vec<Option<HistoryEntry>>,
    oldest: usize,
    len: usize,
    oldest_sequence_number: u64,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ShellError::Config("history capacity must be greater than zero".into()));
        }
        Ok(Self {
            slots: vec![None; capacity],
            oldest: 0,
            len: 0,
            oldest_sequence_number: 1,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn oldest_sequence_number(&self) -> u64 {
        self.oldest_sequence_number
    }

    pub fn last_sequence_number(&self) -> u64 {
        self.oldest_sequence_number + self.len as u64 - 1
    }

    pub fn add(&mut self, text: impl Into<String>) {
        if self.len == self.capacity() {
            self.slots[self.oldest] = None;
            self.oldest = self.advance(self.oldest, 1);
            self.oldest_sequence_number += 1;
            self.len -= 1;
        }
        let next = self.advance(self.oldest, self.len);
        let sequence_number = self.oldest_sequence_number + self.len as u64;
        self.slots[next] = Some(HistoryEntry { sequence_number, text: text.into() });
        self.len += 1;
    }

    pub fn lookup_by_number(&self, n: u64) -> Option<&str> {
        if n < self.oldest_sequence_number || n > self.last_sequence_number() {
            return None;
        }
        let offset = (n - self.oldest_sequence_number) as usize;
        self.slot(offset).map(|entry| entry.text.as_str())
    }

    /// Newest match wins.
    pub fn lookup_by_prefix(&self, prefix: &str) -> Option<&str> {
        self.iter()
            .rev()
            .find(|entry| entry.text.as_bytes().starts_with(prefix.as_bytes()))
            .map(|entry| entry.text.as_str())
    }

    /// Retained entries, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + '_ {
        (0..self.len).filter_map(move |offset| self.slot(offset))
    }

    pub fn print_all<W: Write>(&self, out: W) -> io::Result<()> {
        self.print_recent(out, self.len)
    }

    pub fn print_recent<W: Write>(&self, mut out: W, n: usize) -> io::Result<()> {
        let skip = self.len.saturating_sub(n);
        for entry in self.iter().skip(skip) {
            writeln_ignore_broken_pipe(&mut out, format!("{:>5}  {}", entry.sequence_number, entry.text))?;
        }
        out.flush()
    }

    /// Drops every retained entry. Numbering continues where it left off.
    pub fn teardown(&mut self) {
        let released = self.len;
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.oldest_sequence_number += self.len as u64;
        self.oldest = 0;
        self.len = 0;
        log::debug!("history teardown released {} entries", released);
    }

    fn slot(&self, offset: usize) -> Option<&HistoryEntry> {
        self.slots[self.advance(self.oldest, offset)].as_ref()
    }

    fn advance(&self, index: usize, by: usize) -> usize {
        (index + by) % self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(capacity: usize, lines: &[&str]) -> HistoryStore {
        let mut store = HistoryStore::new(capacity).unwrap();
        for line in lines {
            store.add(*line);
        }
        store
    }

    #[test]
    fn zero_capacity_is_a_config_error() {
        assert!(matches!(HistoryStore::new(0), Err(ShellError::Config(_))));
    }

    #[test]
    fn empty_store_numbers_from_one() {
        let store = HistoryStore::new(3).unwrap();
        assert_eq!(store.last_sequence_number(), 0);
        assert_eq!(store.last_sequence_number() + 1, 1);
        assert_eq!(store.lookup_by_number(0), None);
        assert_eq!(store.lookup_by_number(1), None);
    }

    #[test]
    fn never_exceeds_capacity_and_evicts_oldest() {
        let mut store = HistoryStore::new(3).unwrap();
        for i in 1..=10u64 {
            store.add(format!("cmd {}", i));
            assert!(store.len() <= 3);
            assert_eq!(store.last_sequence_number(), i);
            let expected_oldest = if i > 3 { i - 2 } else { 1 };
            assert_eq!(store.oldest_sequence_number(), expected_oldest);
        }
        let numbers: Vec<u64> = store.iter().map(|e| e.sequence_number).collect();
        assert_eq!(numbers, vec![8, 9, 10]);
    }

    #[test]
    fn lookup_by_number_covers_exactly_the_retained_range() {
        let store = store_with(2, &["a", "b", "c", "d"]);
        assert_eq!(store.lookup_by_number(2), None);
        assert_eq!(store.lookup_by_number(3), Some("c"));
        assert_eq!(store.lookup_by_number(4), Some("d"));
        assert_eq!(store.lookup_by_number(5), None);
    }

    #[test]
    fn prefix_search_prefers_most_recent() {
        let store = store_with(10, &["cat a", "cat b", "dog"]);
        assert_eq!(store.lookup_by_prefix("cat"), Some("cat b"));
        assert_eq!(store.lookup_by_prefix("dog"), Some("dog"));
        assert_eq!(store.lookup_by_prefix("Cat"), None);
        assert_eq!(store.lookup_by_prefix("cat a b"), None);
    }

    #[test]
    fn prefix_search_wraps_around_the_ring() {
        let store = store_with(3, &["ls one", "ls two", "pwd", "echo", "ls three"]);
        assert_eq!(store.lookup_by_prefix("ls"), Some("ls three"));
        assert_eq!(store.lookup_by_prefix("ls t"), Some("ls three"));
        assert_eq!(store.lookup_by_prefix("ls o"), None);
    }

    #[test]
    fn print_all_lists_oldest_first_with_numbers() {
        let store = store_with(2, &["one", "two", "three"]);
        let mut out = Vec::new();
        store.print_all(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "    2  two\n    3  three\n");
    }

    #[test]
    fn print_recent_limits_output() {
        let store = store_with(5, &["one", "two", "three"]);
        let mut out = Vec::new();
        store.print_recent(&mut out, 1).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "    3  three\n");
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut empty = HistoryStore::new(4).unwrap();
        empty.teardown();
        empty.teardown();
        assert!(empty.is_empty());

        let mut store = store_with(2, &["a", "b", "c"]);
        store.teardown();
        store.teardown();
        assert!(store.is_empty());
        assert_eq!(store.lookup_by_number(3), None);
        store.add("d");
        assert_eq!(store.last_sequence_number(), 4);
    }
}
