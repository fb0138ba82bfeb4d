use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

/// Monotonically increasing save-point counter. A write is only recorded
/// while the owner's checkpoint has a strictly positive timestamp, so a
/// freshly created checkpoint (timestamp 0) keeps rollback disabled until
/// the first save point is taken.
pub type Timestamp = i64;

/// The capability every rewritten object exposes.
///
/// Objects are shared (`Rc`) and internally mutable; the checkpoint keeps
/// weak handles to the objects it tracks, so dropping an object simply
/// removes it from future broadcasts.
pub trait Rollbackable {
    /// The object's current checkpoint, if rollback is enabled.
    fn checkpoint(&self) -> Option<Checkpoint>;

    /// Move the object (and, transitively, everything sharing its old
    /// checkpoint) under `checkpoint`.
    fn set_checkpoint(self: Rc<Self>, checkpoint: Checkpoint);

    /// Roll the object's managed fields back to `timestamp`. `trim`
    /// discards the replayed history instead of keeping it for a later
    /// restore to an even earlier instant.
    fn restore(&self, timestamp: Timestamp, trim: bool);

    /// Discard history at or below `timestamp`; those instants can no
    /// longer be restored.
    fn commit(&self, timestamp: Timestamp);
}

struct CheckpointState {
    timestamp: Timestamp,
    objects: Vec<Weak<dyn Rollbackable>>,
}

/// One saved point in time, shared by every object tracking it.
#[derive(Clone)]
pub struct Checkpoint {
    inner: Rc<RefCell<CheckpointState>>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Checkpoint {
    #[must_use]
    pub fn new() -> Self {
        Checkpoint {
            inner: Rc::new(RefCell::new(CheckpointState {
                timestamp: 0,
                objects: Vec::new(),
            })),
        }
    }

    /// Identity comparison: two handles to the same checkpoint.
    #[must_use]
    pub fn same_as(&self, other: &Checkpoint) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.inner.borrow().timestamp
    }

    /// Take a new save point; returns the timestamp that a later
    /// [`Checkpoint::rollback`] can target.
    pub fn create_checkpoint(&self) -> Timestamp {
        let mut state = self.inner.borrow_mut();
        state.timestamp += 1;
        trace!(timestamp = state.timestamp, "created checkpoint");
        state.timestamp
    }

    pub fn add_object(&self, object: &Rc<dyn Rollbackable>) {
        let mut state = self.inner.borrow_mut();
        let already = state
            .objects
            .iter()
            .any(|o| o.upgrade().is_some_and(|o| Rc::ptr_eq(&o, object)));
        if !already {
            state.objects.push(Rc::downgrade(object));
        }
    }

    pub fn remove_object(&self, object: &Rc<dyn Rollbackable>) {
        self.inner
            .borrow_mut()
            .objects
            .retain(|o| o.upgrade().is_some_and(|o| !Rc::ptr_eq(&o, object)));
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.inner
            .borrow()
            .objects
            .iter()
            .filter(|o| o.upgrade().is_some())
            .count()
    }

    /// Restore every tracked object to `timestamp` and wind the counter
    /// back to it.
    pub fn rollback(&self, timestamp: Timestamp, trim: bool) -> Timestamp {
        let objects = self.live_objects();
        trace!(timestamp, count = objects.len(), "rolling back");
        for object in objects {
            object.restore(timestamp, trim);
        }
        self.inner.borrow_mut().timestamp = timestamp;
        timestamp
    }

    /// Discard history at or below `timestamp` on every tracked object.
    pub fn commit(&self, timestamp: Timestamp) {
        for object in self.live_objects() {
            object.commit(timestamp);
        }
    }

    /// Retarget every tracked object to `new`. The per-object guard in
    /// `set_checkpoint` stops the mutual notification from cycling; the
    /// object list is drained up front so re-entrant calls see it empty.
    pub fn set_checkpoint(&self, new: &Checkpoint) {
        if self.same_as(new) {
            return;
        }
        let drained = std::mem::take(&mut self.inner.borrow_mut().objects);
        for object in drained.into_iter().filter_map(|o| o.upgrade()) {
            object.set_checkpoint(new.clone());
        }
    }

    fn live_objects(&self) -> Vec<Rc<dyn Rollbackable>> {
        self.inner
            .borrow()
            .objects
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl std::fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Checkpoint")
            .field("timestamp", &state.timestamp)
            .field("objects", &state.objects.len())
            .finish()
    }
}
