//! In-memory list of recent analyses, newest first.

use std::collections::VecDeque;

use crate::{AnalysisResult, HistoryItem, SolutionType};

/// Maximum number of analyses kept.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct History {
    items: VecDeque<HistoryItem>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished analysis stamped with the current time.
    pub fn record(
        &mut self,
        solution_type: SolutionType,
        input: &str,
        result: AnalysisResult,
    ) -> HistoryItem {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let item = HistoryItem {
            id: self.unique_id(timestamp),
            timestamp,
            solution_type,
            input: input.to_string(),
            result,
        };
        self.push(item.clone());
        item
    }

    /// Prepend an item, dropping the oldest entries past [`HISTORY_LIMIT`].
    pub fn push(&mut self, item: HistoryItem) {
        self.items.push_front(item);
        self.items.truncate(HISTORY_LIMIT);
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn items(&self) -> impl Iterator<Item = &HistoryItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn unique_id(&self, timestamp: i64) -> String {
        let base = timestamp.to_string();
        if self.get(&base).is_none() {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.get(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}
