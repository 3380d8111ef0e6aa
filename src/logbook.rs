/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use connector::LogEntry;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Log lines of one project, newest first, unique by id.
#[derive(Debug, Default, Clone)]
pub struct LogBook {
    entries: Vec<LogEntry>,
    last_id: Option<i64>,
}

fn newest_first(a: &LogEntry, b: &LogEntry) -> Ordering {
    b.log_time.cmp(&a.log_time).then_with(|| b.id.cmp(&a.id))
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, entries: Vec<LogEntry>) {
        self.clear();
        self.merge_new(entries);
    }

    /// Accepts only entries newer than the highest id seen so far and returns
    /// them in book order.
    pub fn merge_new(&mut self, entries: Vec<LogEntry>) -> Vec<LogEntry> {
        let mut seen: HashSet<i64> = self.entries.iter().map(|e| e.id).collect();
        let mut accepted: Vec<LogEntry> = entries
            .into_iter()
            .filter(|e| self.last_id.is_none_or(|last| e.id > last))
            .filter(|e| seen.insert(e.id))
            .collect();

        if accepted.is_empty() {
            return accepted;
        }

        accepted.sort_by(newest_first);
        self.last_id = self
            .last_id
            .into_iter()
            .chain(accepted.iter().map(|e| e.id))
            .max();
        self.entries.extend(accepted.iter().cloned());
        self.entries.sort_by(newest_first);

        accepted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_id = None;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last_id(&self) -> Option<i64> {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn entry(id: i64, time: &str) -> LogEntry {
        LogEntry {
            id,
            log_time: NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S").unwrap(),
            project_id: 1,
            log: format!("line {}", id),
        }
    }

    fn assert_ordered(book: &LogBook) {
        let entries = book.entries();
        let ids: HashSet<i64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), entries.len(), "duplicate ids in {:?}", entries);

        for pair in entries.windows(2) {
            assert_ne!(newest_first(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn test_replace_sorts_by_time_then_id() {
        let mut book = LogBook::new();
        book.replace(vec![
            entry(1, "2025-05-17T14:30:00"),
            entry(3, "2025-05-17T14:30:05"),
            entry(2, "2025-05-17T14:30:05"),
            entry(4, "2025-05-17T14:29:00"),
        ]);

        let ids: Vec<i64> = book.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
        assert_eq!(book.last_id(), Some(4));
        assert_ordered(&book);
    }

    #[test]
    fn test_replace_drops_duplicates() {
        let mut book = LogBook::new();
        book.replace(vec![
            entry(1, "2025-05-17T14:30:00"),
            entry(1, "2025-05-17T14:30:00"),
        ]);

        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_merge_new_only_accepts_higher_ids() {
        let mut book = LogBook::new();
        book.replace(vec![entry(5, "2025-05-17T14:30:00"), entry(6, "2025-05-17T14:30:01")]);

        let accepted = book.merge_new(vec![
            entry(6, "2025-05-17T14:30:01"),
            entry(4, "2025-05-17T14:31:00"),
            entry(8, "2025-05-17T14:30:03"),
            entry(7, "2025-05-17T14:30:03"),
            entry(8, "2025-05-17T14:30:03"),
        ]);

        let accepted_ids: Vec<i64> = accepted.iter().map(|e| e.id).collect();
        assert_eq!(accepted_ids, vec![8, 7]);

        let ids: Vec<i64> = book.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![8, 7, 6, 5]);
        assert_eq!(book.last_id(), Some(8));
        assert_ordered(&book);
    }

    #[test]
    fn test_merge_into_empty_book_accepts_everything() {
        let mut book = LogBook::new();
        let accepted = book.merge_new(vec![entry(2, "2025-05-17T14:30:00"), entry(1, "2025-05-17T14:30:00")]);

        assert_eq!(accepted.len(), 2);
        assert_eq!(book.last_id(), Some(2));
        assert_ordered(&book);
    }

    #[test]
    fn test_repeated_merges_keep_invariants() {
        let mut book = LogBook::new();
        for round in 0..5i64 {
            let batch = (0..4)
                .map(|i| {
                    let id = round * 3 + i;
                    entry(id, &format!("2025-05-17T14:3{}:0{}", (id % 7), (id % 3)))
                })
                .collect();
            book.merge_new(batch);
            assert_ordered(&book);
        }
    }

    #[test]
    fn test_clear_resets_last_id() {
        let mut book = LogBook::new();
        book.replace(vec![entry(9, "2025-05-17T14:30:00")]);
        book.clear();

        assert!(book.is_empty());
        assert_eq!(book.last_id(), None);
        assert_eq!(book.merge_new(vec![entry(1, "2025-05-17T14:30:00")]).len(), 1);
    }
}
