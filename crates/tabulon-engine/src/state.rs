//! Element state flags.

use bitflags::bitflags;

bitflags! {
    /// Packed per-element state shared by every element in the model.
    ///
    /// Invariant: once `IS_INVALID` is set it is never cleared; deleted
    /// elements stay deleted.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ElementState: u32 {
        const ENFORCE_DATATYPE          = 0x01;
        const READ_ONLY                 = 0x02;
        const SUPPORTS_NULL             = 0x04;
        const AUTO_RECALCULATE          = 0x08;

        const AUTO_RECALCULATE_DISABLED = 0x10;
        const IN_USE                    = 0x40;
        const IS_PENDING                = 0x80;

        const ROW_LABELS_INDEXED        = 0x100;
        const COLUMN_LABELS_INDEXED     = 0x200;
        const CELL_LABELS_INDEXED       = 0x400;
        const TABLE_LABELS_INDEXED      = 0x800;

        const GROUP_LABELS_INDEXED      = 0x1000;
        const HAS_CELL_VALIDATOR        = 0x2000;
        const IS_DERIVED                = 0x4000;
        const IS_PERSISTENT             = 0x8000;

        const IS_DEFAULT                = 0x1000000;
        const IS_DIRTY                  = 0x2000000;
        const HAS_CELL_ERROR            = 0x4000000;

        const IS_INVALID                = 0x10000000;
        const IS_PROCESSED              = 0x20000000;
        const IS_INITIALIZING           = 0x40000000;
    }
}

impl ElementState {
    /// Set or clear `flag` according to `on`.
    pub fn assign(&mut self, flag: ElementState, on: bool) {
        if on {
            self.insert(flag);
        } else {
            self.remove(flag);
        }
    }

    pub fn is_set(&self, flag: ElementState) -> bool {
        self.intersects(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_sets_and_clears() {
        let mut state = ElementState::default();
        assert!(!state.is_set(ElementState::READ_ONLY));

        state.assign(ElementState::READ_ONLY, true);
        assert!(state.is_set(ElementState::READ_ONLY));

        state.assign(ElementState::READ_ONLY, false);
        assert!(!state.is_set(ElementState::READ_ONLY));
    }

    #[test]
    fn test_flags_do_not_overlap() {
        let mut seen = 0u32;
        for flag in ElementState::all().iter() {
            assert_eq!(seen & flag.bits(), 0);
            seen |= flag.bits();
        }
    }
}
