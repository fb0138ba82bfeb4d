//! Bookkeeping accumulated while a declaration's body is walked: which
//! fields were touched at which index arities, and the deferred edits keyed
//! by types not yet known to be cross-analyzed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-declaration record of observed field accesses. One distinct accessor
/// overload is synthesized per (field, arity) pair in each map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldAccessTable {
    reads: BTreeMap<String, BTreeSet<usize>>,
    writes: BTreeMap<String, BTreeSet<usize>>,
    compound_writes: BTreeMap<String, BTreeSet<usize>>,
}

impl FieldAccessTable {
    pub fn record_read(&mut self, field: &str, arity: usize) {
        self.reads.entry(field.to_string()).or_default().insert(arity);
    }

    pub fn record_write(&mut self, field: &str, arity: usize) {
        self.writes.entry(field.to_string()).or_default().insert(arity);
    }

    pub fn record_compound_write(&mut self, field: &str, arity: usize) {
        self.compound_writes
            .entry(field.to_string())
            .or_default()
            .insert(arity);
    }

    #[must_use]
    pub fn read_arities(&self, field: &str) -> Vec<usize> {
        self.reads
            .get(field)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn write_arities(&self, field: &str) -> Vec<usize> {
        self.writes
            .get(field)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn compound_write_arities(&self, field: &str) -> Vec<usize> {
        self.compound_writes
            .get(field)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty() && self.compound_writes.is_empty()
    }
}

/// Deferred edits, keyed by the class that must enter the cross-analysis
/// set before they apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fixup {
    /// Append a trailing checkpoint argument to the construction site with
    /// this walk-order index.
    AppendCheckpointArg { site: usize },
    /// End `$RESTORE` of `class` with a call to the superclass restore.
    AddRestoreSuperCall { class: String },
    /// Propagate the checkpoint into the accessor of `field` on `class`.
    AddAccessorPropagation { class: String, field: String },
}

#[derive(Debug, Default)]
pub struct PendingFixups {
    pending: HashMap<String, Vec<Fixup>>,
    due: Vec<Fixup>,
}

impl PendingFixups {
    #[must_use]
    pub fn new() -> Self {
        PendingFixups::default()
    }

    pub fn defer(&mut self, key: &str, fixup: Fixup) {
        self.pending.entry(key.to_string()).or_default().push(fixup);
    }

    /// Move every fixup keyed by `key` to the due list; each is consumed
    /// exactly once.
    pub fn promote(&mut self, key: &str) {
        if let Some(fixups) = self.pending.remove(key) {
            self.due.extend(fixups);
        }
    }

    #[must_use]
    pub fn pending_for(&self, key: &str) -> usize {
        self.pending.get(key).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.values().any(|v| !v.is_empty())
    }

    pub fn take_due(&mut self) -> Vec<Fixup> {
        std::mem::take(&mut self.due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arities_are_deduplicated_and_sorted() {
        let mut table = FieldAccessTable::default();
        table.record_write("a", 2);
        table.record_write("a", 1);
        table.record_write("a", 1);
        assert_eq!(table.write_arities("a"), vec![1, 2]);
        assert!(table.read_arities("a").is_empty());
    }

    #[test]
    fn promotion_consumes_fixups_exactly_once() {
        let mut fixups = PendingFixups::new();
        fixups.defer("demo.B", Fixup::AppendCheckpointArg { site: 3 });
        assert_eq!(fixups.pending_for("demo.B"), 1);

        fixups.promote("demo.B");
        assert_eq!(fixups.pending_for("demo.B"), 0);
        assert_eq!(fixups.take_due(), vec![Fixup::AppendCheckpointArg { site: 3 }]);

        fixups.promote("demo.B");
        assert!(fixups.take_due().is_empty());
    }
}
