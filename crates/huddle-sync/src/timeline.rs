use chrono::{DateTime, Utc};
use huddle_types::{AiMessage, Message};

/// Anything shown in a creation-ordered list
pub trait TimelineEntry: Clone {
    fn entry_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl TimelineEntry for Message {
    fn entry_id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl TimelineEntry for AiMessage {
    fn entry_id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Entries ordered by creation time, unique by id.
///
/// Change feeds are at-least-once and may race a fetch, so every insert
/// checks for the id first. Entries with equal timestamps keep arrival order.
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    entries: Vec<T>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: TimelineEntry> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = T>) -> Self {
        let mut timeline = Self::new();
        timeline.extend(entries);
        timeline
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.entry_id() == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Merge a fetched page; entries already present are kept as they are
    pub fn extend(&mut self, entries: impl IntoIterator<Item = T>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Insert in creation order; `false` when the id is already present
    pub fn insert(&mut self, entry: T) -> bool {
        if self.contains(entry.entry_id()) {
            return false;
        }
        let created_at = entry.created_at();
        let position = self.entries.partition_point(|e| e.created_at() <= created_at);
        self.entries.insert(position, entry);
        true
    }

    /// Replace the entry with the same id, or insert it
    pub fn upsert(&mut self, entry: T) {
        match self.entries.iter().position(|e| e.entry_id() == entry.entry_id()) {
            Some(index) if self.entries[index].created_at() == entry.created_at() => {
                self.entries[index] = entry;
            }
            Some(index) => {
                self.entries.remove(index);
                self.insert(entry);
            }
            None => {
                self.insert(entry);
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.entries.iter().position(|e| e.entry_id() == id)?;
        Some(self.entries.remove(index))
    }
}
