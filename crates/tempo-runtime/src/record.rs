use crate::checkpoint::{Checkpoint, Timestamp};

/// One history entry: the value a field (or one array slot of it) held
/// before a write that happened at `timestamp`.
#[derive(Clone, Debug)]
struct Entry<T> {
    /// Index tuple for array-element writes; `None` for whole-field writes.
    indices: Option<Vec<i64>>,
    value: T,
    timestamp: Timestamp,
}

/// Versioned history for one field.
///
/// Entries are kept per checkpoint generation: changing an object's
/// checkpoint pushes a fresh state, and restoring past that change pops back
/// to the previous one, so histories recorded under different checkpoints
/// never interleave.
#[derive(Clone, Debug)]
pub struct FieldRecord<T> {
    states: Vec<Vec<Entry<T>>>,
}

impl<T: Clone> Default for FieldRecord<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FieldRecord<T> {
    #[must_use]
    pub fn new() -> Self {
        FieldRecord {
            states: vec![Vec::new()],
        }
    }

    /// Record the value about to be overwritten.
    pub fn add(&mut self, indices: Option<&[i64]>, old_value: T, timestamp: Timestamp) {
        self.top().push(Entry {
            indices: indices.map(<[i64]>::to_vec),
            value: old_value,
            timestamp,
        });
    }

    /// Record the current value without a store following: used where a
    /// reference is about to escape to code outside the rewrite.
    pub fn backup(&mut self, indices: Option<&[i64]>, value: T, timestamp: Timestamp) {
        self.add(indices, value, timestamp);
    }

    /// Replay entries recorded at or after `timestamp`, newest first, into
    /// `apply`. With `trim` the replayed entries are discarded; without it
    /// they stay available for a later restore to an even earlier instant.
    pub fn restore_with(
        &mut self,
        timestamp: Timestamp,
        trim: bool,
        mut apply: impl FnMut(Option<&[i64]>, T),
    ) {
        // Stack discipline: timestamps are not globally sorted once a
        // rollback has wound the counter back, so pop from the top while the
        // top is new enough.
        let top = self.top();
        let mut split = top.len();
        while split > 0 && top[split - 1].timestamp >= timestamp {
            split -= 1;
        }
        if trim {
            for entry in top.drain(split..).rev() {
                apply(entry.indices.as_deref(), entry.value);
            }
        } else {
            for entry in top[split..].iter().rev() {
                apply(entry.indices.as_deref(), entry.value.clone());
            }
        }
    }

    /// Restore a scalar field: the value it held at `timestamp`, or
    /// `current` when nothing newer was recorded.
    #[must_use]
    pub fn restore(&mut self, current: T, timestamp: Timestamp, trim: bool) -> T {
        let mut result = current;
        self.restore_with(timestamp, trim, |indices, value| {
            if indices.is_none() {
                result = value;
            }
        });
        result
    }

    /// Discard entries recorded at or below `timestamp` in every state.
    pub fn commit(&mut self, timestamp: Timestamp) {
        for state in &mut self.states {
            state.retain(|entry| entry.timestamp > timestamp);
        }
    }

    /// Open a fresh history generation; called when the owner moves under a
    /// new checkpoint.
    pub fn push_state(&mut self) {
        self.states.push(Vec::new());
    }

    /// Drop the current generation; called when a restore reinstates the
    /// previous checkpoint.
    pub fn pop_state(&mut self) {
        if self.states.len() > 1 {
            self.states.pop();
        } else {
            self.states[0].clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.last().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn top(&mut self) -> &mut Vec<Entry<T>> {
        if self.states.is_empty() {
            // new() guarantees one state; this only guards manual misuse.
            self.states.push(Vec::new());
        }
        self.states.last_mut().expect("at least one state")
    }
}

/// The stack of checkpoints an object held before its current one, with the
/// timestamp at which each was superseded.
#[derive(Clone, Debug, Default)]
pub struct CheckpointRecord {
    entries: Vec<(Option<Checkpoint>, Timestamp)>,
}

impl CheckpointRecord {
    #[must_use]
    pub fn new() -> Self {
        CheckpointRecord::default()
    }

    /// Record `old` as superseded at `timestamp` (the new checkpoint's
    /// current timestamp).
    pub fn add(&mut self, old: Option<Checkpoint>, timestamp: Timestamp) {
        self.entries.push((old, timestamp));
    }

    /// Timestamp at which the most recent supersession happened.
    #[must_use]
    pub fn top_timestamp(&self) -> Option<Timestamp> {
        self.entries.last().map(|(_, ts)| *ts)
    }

    /// Whether restoring to `timestamp` must also reinstate a superseded
    /// checkpoint.
    #[must_use]
    pub fn reaches(&self, timestamp: Timestamp) -> bool {
        self.top_timestamp().is_some_and(|top| timestamp <= top)
    }

    /// Pop and return the checkpoint that was current at `timestamp`.
    /// Returns `current` unchanged when no supersession reaches back that
    /// far.
    #[must_use]
    pub fn restore(
        &mut self,
        current: Option<Checkpoint>,
        timestamp: Timestamp,
    ) -> Option<Checkpoint> {
        let mut active = current;
        while self
            .entries
            .last()
            .is_some_and(|(_, superseded_at)| timestamp <= *superseded_at)
        {
            let (previous, _) = self.entries.pop().expect("entry just observed");
            active = previous;
        }
        active
    }

    /// Forget supersessions at or below `timestamp`.
    pub fn commit(&mut self, timestamp: Timestamp) {
        self.entries.retain(|(_, ts)| *ts > timestamp);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_restore_walks_back_to_the_oldest_entry() {
        let mut record = FieldRecord::new();
        // value = 0, checkpoint at 1, then three increments.
        record.add(None, 0, 1);
        record.add(None, 1, 1);
        record.add(None, 2, 1);

        assert_eq!(record.restore(3, 1, false), 0);
        // Without trim the history survives, so the same restore works again.
        assert_eq!(record.restore(3, 1, false), 0);
        // A timestamp after the writes is a no-op.
        assert_eq!(record.restore(3, 2, false), 3);
    }

    #[test]
    fn trim_discards_replayed_entries() {
        let mut record = FieldRecord::new();
        record.add(None, 10, 1);
        record.add(None, 20, 2);

        assert_eq!(record.restore(30, 2, true), 20);
        assert_eq!(record.len(), 1);
        // The older entry is still there for a deeper restore.
        assert_eq!(record.restore(20, 1, true), 10);
        assert!(record.is_empty());
    }

    #[test]
    fn indexed_entries_replay_through_apply() {
        let mut record = FieldRecord::new();
        record.add(Some(&[0]), 0, 1);
        record.add(Some(&[0]), 5, 1);

        let mut array = vec![7, 9];
        record.restore_with(1, false, |indices, value| {
            let idx = indices.expect("indexed entry")[0] as usize;
            array[idx] = value;
        });
        assert_eq!(array, vec![0, 9]);
    }

    #[test]
    fn commit_drops_unreachable_history() {
        let mut record = FieldRecord::new();
        record.add(None, 1, 1);
        record.add(None, 2, 2);
        record.add(None, 3, 3);
        record.commit(2);
        assert_eq!(record.len(), 1);
        assert_eq!(record.restore(9, 3, false), 3);
    }

    #[test]
    fn state_stack_isolates_checkpoint_generations() {
        let mut record = FieldRecord::new();
        record.add(None, 1, 1);
        record.push_state();
        record.add(None, 2, 5);
        assert_eq!(record.len(), 1);
        record.pop_state();
        assert_eq!(record.restore(9, 1, false), 1);
    }

    #[test]
    fn checkpoint_record_reinstates_the_superseded_checkpoint() {
        let first = Checkpoint::new();
        first.create_checkpoint();
        let second = Checkpoint::new();

        let mut record = CheckpointRecord::new();
        record.add(Some(first.clone()), 3);

        assert!(record.reaches(3));
        assert!(!record.reaches(4));

        let active = record.restore(Some(second), 2);
        assert!(active.expect("checkpoint").same_as(&first));
        assert!(record.is_empty());
    }
}
