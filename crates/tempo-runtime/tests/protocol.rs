//! Exercises the protocol the way rewritten classes use it: each test type
//! mirrors the members the rewriter synthesizes (per-field records, a
//! checkpoint slot, a supersession record) and drives them through the same
//! guard conditions the generated accessors emit.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tempo_runtime::{Checkpoint, CheckpointRecord, FieldRecord, Rollbackable, Timestamp};

struct Counter {
    value: Cell<i32>,
    record_value: RefCell<FieldRecord<i32>>,
    checkpoint: RefCell<Option<Checkpoint>>,
    checkpoint_record: RefCell<CheckpointRecord>,
}

impl Counter {
    fn new() -> Rc<Self> {
        Rc::new(Counter {
            value: Cell::new(0),
            record_value: RefCell::new(FieldRecord::new()),
            checkpoint: RefCell::new(None),
            checkpoint_record: RefCell::new(CheckpointRecord::new()),
        })
    }

    /// Mirrors the synthesized assign accessor: record the old value while a
    /// checkpoint with a positive timestamp is active, then store.
    fn assign_value(&self, new_value: i32) -> i32 {
        if let Some(cp) = &*self.checkpoint.borrow() {
            if cp.timestamp() > 0 {
                self.record_value
                    .borrow_mut()
                    .add(None, self.value.get(), cp.timestamp());
            }
        }
        self.value.set(new_value);
        new_value
    }

    fn increment(&self) {
        self.assign_value(self.value.get() + 1);
    }
}

impl Rollbackable for Counter {
    fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint.borrow().clone()
    }

    fn set_checkpoint(self: Rc<Self>, checkpoint: Checkpoint) {
        let same = self
            .checkpoint
            .borrow()
            .as_ref()
            .is_some_and(|c| c.same_as(&checkpoint));
        if same {
            return;
        }

        let old = self.checkpoint.borrow_mut().take();
        self.checkpoint_record
            .borrow_mut()
            .add(old.clone(), checkpoint.timestamp());
        self.record_value.borrow_mut().push_state();
        *self.checkpoint.borrow_mut() = Some(checkpoint.clone());

        if let Some(old) = old {
            old.set_checkpoint(&checkpoint);
        }
        checkpoint.add_object(&(self.clone() as Rc<dyn Rollbackable>));
    }

    fn restore(&self, timestamp: Timestamp, trim: bool) {
        let restored = self
            .record_value
            .borrow_mut()
            .restore(self.value.get(), timestamp, trim);
        self.value.set(restored);

        let reaches = self.checkpoint_record.borrow().reaches(timestamp);
        if reaches {
            let current = self.checkpoint.borrow_mut().take();
            let previous = self
                .checkpoint_record
                .borrow_mut()
                .restore(current, timestamp);
            self.record_value.borrow_mut().pop_state();
            *self.checkpoint.borrow_mut() = previous;
            self.restore(timestamp, trim);
        }
    }

    fn commit(&self, timestamp: Timestamp) {
        self.record_value.borrow_mut().commit(timestamp);
        self.checkpoint_record.borrow_mut().commit(timestamp);
    }
}

fn enable(counter: &Rc<Counter>, checkpoint: &Checkpoint) {
    counter.clone().set_checkpoint(checkpoint.clone());
}

#[test]
fn rollback_restores_the_value_at_the_save_point() {
    let counter = Counter::new();
    let checkpoint = Checkpoint::new();
    enable(&counter, &checkpoint);

    let ts = checkpoint.create_checkpoint();
    counter.increment();
    counter.increment();
    counter.increment();
    assert_eq!(counter.value.get(), 3);

    checkpoint.rollback(ts, false);
    assert_eq!(counter.value.get(), 0);

    // Restoring to an instant after the increments is a no-op.
    counter.restore(ts + 1, false);
    assert_eq!(counter.value.get(), 0);
}

#[test]
fn writes_without_a_save_point_are_not_recorded() {
    let counter = Counter::new();
    let checkpoint = Checkpoint::new();
    enable(&counter, &checkpoint);

    // Timestamp is still 0: rollback is effectively disabled.
    counter.increment();
    assert!(counter.record_value.borrow().is_empty());
}

#[test]
fn commit_makes_old_instants_unreachable() {
    let counter = Counter::new();
    let checkpoint = Checkpoint::new();
    enable(&counter, &checkpoint);

    let t1 = checkpoint.create_checkpoint();
    counter.increment();
    let t2 = checkpoint.create_checkpoint();
    counter.increment();

    checkpoint.commit(t1);
    checkpoint.rollback(t1, false);
    // The pre-t1 history is gone; only the t2 write was replayed.
    assert_eq!(counter.value.get(), 1);
    let _ = t2;
}

struct Grid {
    slots: RefCell<Vec<i32>>,
    record_slots: RefCell<FieldRecord<i32>>,
    checkpoint: RefCell<Option<Checkpoint>>,
}

impl Grid {
    fn new(slots: Vec<i32>) -> Rc<Self> {
        Rc::new(Grid {
            slots: RefCell::new(slots),
            record_slots: RefCell::new(FieldRecord::new()),
            checkpoint: RefCell::new(None),
        })
    }

    /// Mirrors the arity-1 assign accessor for an array field.
    fn assign_slot(&self, index: usize, new_value: i32) -> i32 {
        if let Some(cp) = &*self.checkpoint.borrow() {
            if cp.timestamp() > 0 {
                self.record_slots.borrow_mut().add(
                    Some(&[index as i64]),
                    self.slots.borrow()[index],
                    cp.timestamp(),
                );
            }
        }
        self.slots.borrow_mut()[index] = new_value;
        new_value
    }
}

impl Rollbackable for Grid {
    fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint.borrow().clone()
    }

    fn set_checkpoint(self: Rc<Self>, checkpoint: Checkpoint) {
        *self.checkpoint.borrow_mut() = Some(checkpoint.clone());
        checkpoint.add_object(&(self.clone() as Rc<dyn Rollbackable>));
    }

    fn restore(&self, timestamp: Timestamp, trim: bool) {
        let mut slots = self.slots.borrow_mut();
        self.record_slots
            .borrow_mut()
            .restore_with(timestamp, trim, |indices, value| {
                let index = indices.expect("array entries carry indices")[0] as usize;
                slots[index] = value;
            });
    }

    fn commit(&self, timestamp: Timestamp) {
        self.record_slots.borrow_mut().commit(timestamp);
    }
}

#[test]
fn array_rollback_is_index_granular() {
    let grid = Grid::new(vec![0, 0]);
    let checkpoint = Checkpoint::new();
    grid.clone().set_checkpoint(checkpoint.clone());

    let ts = checkpoint.create_checkpoint();
    grid.assign_slot(0, 5);
    // Index 1 is mutated by a path outside the rewrite: no record.
    grid.slots.borrow_mut()[1] = 9;

    checkpoint.rollback(ts, false);
    assert_eq!(*grid.slots.borrow(), vec![0, 9]);
}

#[test]
fn assigning_across_checkpoints_migrates_the_whole_group() {
    let holder = Counter::new();
    let second = Counter::new();
    let third = Counter::new();

    let cp1 = Checkpoint::new();
    let cp2 = Checkpoint::new();
    enable(&holder, &cp1);
    enable(&second, &cp2);
    enable(&third, &cp2);
    assert_eq!(cp2.tracked_count(), 2);

    // Mirrors the object-assign accessor: the incoming value is under a
    // different checkpoint, so it is retargeted to the holder's.
    let holders_cp = holder.checkpoint().expect("holder has a checkpoint");
    let incoming = second.checkpoint().expect("incoming has a checkpoint");
    if !incoming.same_as(&holders_cp) {
        second.clone().set_checkpoint(holders_cp.clone());
    }

    // The second object moved, and it dragged the third with it.
    assert!(second.checkpoint().expect("cp").same_as(&cp1));
    assert!(third.checkpoint().expect("cp").same_as(&cp1));
    assert_eq!(cp2.tracked_count(), 0);
    assert_eq!(cp1.tracked_count(), 3);
}

#[test]
fn restore_past_a_supersession_reinstates_the_old_checkpoint() {
    let counter = Counter::new();
    let cp1 = Checkpoint::new();
    enable(&counter, &cp1);

    let ts = cp1.create_checkpoint();
    counter.increment();

    // Move under a fresh checkpoint, then mutate some more. The
    // supersession is stamped with the new checkpoint's clock (0).
    let cp2 = Checkpoint::new();
    counter.clone().set_checkpoint(cp2.clone());
    cp2.create_checkpoint();
    counter.increment();
    assert_eq!(counter.value.get(), 2);

    // Restoring to an instant at or before the supersession pops back to
    // cp1 and replays both history generations.
    counter.restore(0, true);
    assert_eq!(counter.value.get(), 0);
    assert!(counter.checkpoint().expect("cp").same_as(&cp1));
    let _ = ts;
}
