//! The deterministic names of synthesized members. Downstream tooling keys
//! on these, so they are constants rather than configuration.

/// Package the generated code imports its protocol types from.
pub const RUNTIME_PACKAGE: &str = "tempo.rollback";

pub const CHECKPOINT_FIELD: &str = "$CHECKPOINT";
pub const CHECKPOINT_RECORD_FIELD: &str = "$RECORD$$CHECKPOINT";
pub const RECORDS_FIELD: &str = "$RECORDS";
pub const GET_CHECKPOINT: &str = "$GET$CHECKPOINT";
pub const SET_CHECKPOINT: &str = "$SET$CHECKPOINT";
pub const RESTORE: &str = "$RESTORE";
pub const COMMIT: &str = "$COMMIT";

pub const CHECKPOINT_TYPE: &str = "Checkpoint";
pub const FIELD_RECORD_TYPE: &str = "FieldRecord";
pub const CHECKPOINT_RECORD_TYPE: &str = "CheckpointRecord";
pub const ROLLBACKABLE_TYPE: &str = "Rollbackable";

#[must_use]
pub fn assign_accessor(field: &str) -> String {
    format!("$ASSIGN${field}")
}

#[must_use]
pub fn special_accessor(field: &str) -> String {
    format!("$ASSIGN$SPECIAL${field}")
}

#[must_use]
pub fn backup_accessor(field: &str) -> String {
    format!("$BACKUP${field}")
}

#[must_use]
pub fn record_field(field: &str) -> String {
    format!("$RECORD${field}")
}

/// The operator selector the compound accessor switches on.
#[must_use]
pub fn operator_selector(op: tempo_syntax::AssignOp) -> i64 {
    use tempo_syntax::AssignOp::*;
    match op {
        Add => 0,
        Sub => 1,
        Mul => 2,
        Div => 3,
        BitAnd => 4,
        BitOr => 5,
        BitXor => 6,
        Rem => 7,
        Shl => 8,
        Shr => 9,
        UShr => 10,
        Assign => unreachable!("plain assignment has no selector"),
    }
}

#[must_use]
pub fn inc_dec_selector(op: tempo_syntax::IncDecOp) -> i64 {
    use tempo_syntax::IncDecOp::*;
    match op {
        PostInc => 11,
        PostDec => 12,
        PreInc => 13,
        PreDec => 14,
    }
}
