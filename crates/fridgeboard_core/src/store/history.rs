//! Bounded change history kept for debugging.
//!
//! Not used for recovery or undo.

use crate::model::state::{StateKey, StateValue};
use std::collections::VecDeque;

/// One recorded field replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub key: StateKey,
    pub old_value: StateValue,
    pub new_value: StateValue,
    /// Unix epoch milliseconds.
    pub at_ms: i64,
}

/// Ring buffer of recent changes; oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct ChangeHistory {
    entries: VecDeque<ChangeRecord>,
    max_entries: usize,
}

impl ChangeHistory {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    pub fn push(&mut self, record: ChangeRecord) {
        while self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn records(&self) -> Vec<ChangeRecord> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeHistory, ChangeRecord};
    use crate::model::state::{StateKey, StateValue};

    fn water_change(from: u32, to: u32) -> ChangeRecord {
        ChangeRecord {
            key: StateKey::WaterCount,
            old_value: StateValue::WaterCount(from),
            new_value: StateValue::WaterCount(to),
            at_ms: i64::from(to),
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = ChangeHistory::new(2);
        history.push(water_change(0, 1));
        history.push(water_change(1, 2));
        history.push(water_change(2, 3));

        let records = history.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].new_value, StateValue::WaterCount(2));
        assert_eq!(records[1].new_value, StateValue::WaterCount(3));
    }
}
