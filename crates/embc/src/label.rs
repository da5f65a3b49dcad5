//! Forward-reference resolver for jump targets (§4.6).
//!
//! A flat array indexed by label id. Pre-EMIT passes fill it in as labels are
//! assigned; EMIT reads it back when encoding jump operands. Both reads and
//! writes go through the same `unresolved` sentinel so that a label referenced
//! before it is ever assigned (a compiler bug, §7) is caught instead of
//! silently encoding a bogus offset.

use crate::error::EmitterBugKind;

/// Sentinel recorded for a label id that has not yet been assigned.
const UNRESOLVED: u32 = u32::MAX;

/// Opaque label id, issued by the compiler driver and threaded through jump
/// and `label_assign` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(u32);

impl Label {
    /// Wraps a raw label id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Flat label-id → bytecode-offset table (§4.6).
#[derive(Debug)]
pub struct LabelTable {
    offsets: Vec<u32>,
}

impl LabelTable {
    /// Creates a table sized for `max_num_labels` labels, all unresolved.
    #[must_use]
    pub fn new(max_num_labels: u32) -> Self {
        Self {
            offsets: vec![UNRESOLVED; max_num_labels as usize],
        }
    }

    /// Clears every entry back to unresolved.
    ///
    /// Called by `start_pass` in pre-EMIT passes (§4.1): each pass re-derives
    /// label offsets from scratch by re-running the operation sequence.
    pub fn clear(&mut self) {
        self.offsets.fill(UNRESOLVED);
    }

    /// Records `label`'s bytecode offset, or cross-checks it against a value
    /// recorded in an earlier pass.
    ///
    /// # Panics
    ///
    /// Panics (an [`EmitterBugKind`](crate::error::EmitterBugKind), §7) if the
    /// label was already assigned in this pass, or if a value recorded in
    /// CODE_SIZE does not match the offset seen again in EMIT — offset
    /// stability across passes is the two-pass algorithm's central invariant.
    pub fn assign(&mut self, label: Label, offset: u32, is_emit_pass: bool) {
        let slot = &mut self.offsets[label.index()];
        if is_emit_pass {
            assert!(
                *slot == offset,
                "{}",
                EmitterBugKind::LabelOffsetDrift {
                    label: label.0,
                    code_size_pass: *slot,
                    emit_pass: offset,
                }
            );
        } else {
            assert!(
                *slot == UNRESOLVED,
                "{}",
                EmitterBugKind::DuplicateLabelAssignment { label: label.0 }
            );
            *slot = offset;
        }
    }

    /// Looks up a label's offset.
    ///
    /// Returns `None` both for an out-of-range id and for one not yet
    /// assigned (the pre-EMIT sentinel); callers encode `0` for the latter
    /// case, matching §4.2's "0 during pre-EMIT" rule.
    #[must_use]
    pub fn offset(&self, label: Label) -> Option<u32> {
        self.offsets.get(label.index()).copied().filter(|&o| o != UNRESOLVED)
    }
}
