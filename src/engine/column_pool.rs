use std::collections::VecDeque;
use std::slice::Iter;

use crate::engine::pattern::Pattern;
use crate::misc::{HashMap, HashSet, IdSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnId(pub u32);

impl std::hash::Hash for ColumnId {
    fn hash<H: std::hash::Hasher>(&self, hasher: &mut H) {
        hasher.write_u32(self.0)
    }
}

impl nohash_hasher::IsEnabled for ColumnId {}

/// Rolling record of the last `window` relaxed-solve observations for one
/// column; a `true` entry means the column was inactive in that round.
#[derive(Clone, Debug)]
pub struct ActivationHistory {
    window: usize,
    inactive: VecDeque<bool>,
}

impl ActivationHistory {
    fn new(window: usize) -> Self {
        ActivationHistory {
            window,
            inactive: VecDeque::with_capacity(window),
        }
    }

    fn push(&mut self, was_inactive: bool) {
        if self.window == 0 {
            return;
        }
        if self.inactive.len() == self.window {
            self.inactive.pop_front();
        }
        self.inactive.push_back(was_inactive);
    }

    /// True once the column has been observed inactive for a full window.
    pub fn stale(&self) -> bool {
        self.window > 0
            && self.inactive.len() == self.window
            && self.inactive.iter().all(|inactive| *inactive)
    }

    pub fn observations(&self) -> usize {
        self.inactive.len()
    }
}

#[derive(Clone, Debug)]
pub struct Column {
    pub id: ColumnId,
    pub pattern: Pattern,
    history: ActivationHistory,
}

impl Column {
    pub fn history(&self) -> &ActivationHistory {
        &self.history
    }
}

/// Holds all columns generated so far for one aisle-count.
///
/// Append-only apart from staleness eviction; the seen-key set is never
/// trimmed, so a pattern that was generated once (even if later evicted)
/// can never re-enter and the pool size is idempotent under resubmission.
pub struct ColumnPool {
    local_column_counter: u32,
    columns: Vec<Column>,
    seen: HashSet<Pattern>,
    history_window: usize,
}

impl ColumnPool {
    pub fn new(history_window: usize) -> Self {
        ColumnPool {
            local_column_counter: 0,
            columns: Vec::new(),
            seen: HashSet::default(),
            history_window,
        }
    }

    /// Total number of columns in pool
    pub fn count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Column> {
        self.columns.iter()
    }

    /// Returns a specific column from the pool.
    /// Ids stay sorted in the backing vec even after eviction.
    pub fn get(&self, id: ColumnId) -> Option<&Column> {
        self.columns
            .binary_search_by_key(&id.0, |c| c.id.0)
            .ok()
            .map(|idx| &self.columns[idx])
    }

    pub fn contains(&self, pattern: &Pattern) -> bool {
        self.seen.contains(pattern)
    }

    /// Adds a column to the pool unless its `(aisle_set, order_mask)` key
    /// was seen before; duplicates are rejected silently.
    pub fn add(&mut self, pattern: Pattern) -> Option<ColumnId> {
        if !self.seen.insert(pattern.clone()) {
            return None;
        }

        let id = ColumnId(self.local_column_counter);
        self.local_column_counter += 1;
        self.columns.push(Column {
            id,
            pattern,
            history: ActivationHistory::new(self.history_window),
        });
        Some(id)
    }

    /// Record one relaxed solve: a column with activation below `tolerance`
    /// (or absent from the solved model) counts as inactive this round.
    pub fn record_activation(&mut self, activations: &HashMap<ColumnId, f64>, tolerance: f64) {
        for column in &mut self.columns {
            let active = activations
                .get(&column.id)
                .is_some_and(|x| *x >= tolerance);
            column.history.push(!active);
        }
    }

    /// Remove up to `cap` stale columns, never touching `protected` ones
    /// (the incumbent's support). Returns the number removed.
    pub fn evict_stale(&mut self, cap: usize, protected: &IdSet<ColumnId>) -> usize {
        if cap == 0 {
            return 0;
        }
        let mut removed = 0;
        self.columns.retain(|column| {
            if removed < cap && column.history.stale() && !protected.contains(&column.id) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}
