//! The cron field bitset: a 64-bit mask with two sentinel values standing
//! in for "any value" and "every value in range".

use crate::field::FieldDescriptor;

/// Bit 61: the field is unconstrained ("*"). Any current value is
/// acceptable; the field never forces a carry on its own.
const ASTERISK_BIT: u64 = 1 << 61;

/// Bit 62: the field accepts every value in its legal range. Distinct from
/// the asterisk sentinel only in how carry propagates: advancing a step
/// field always moves to the next integer, while an asterisk field never
/// moves.
const STEP_BIT: u64 = 1 << 62;

/// A cron field: either a bitset of permitted integers (bits `0..=max`),
/// or one of the two sentinels above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronField(u64);

impl CronField {
    pub const ASTERISK: CronField = CronField(ASTERISK_BIT);
    pub const STEP: CronField = CronField(STEP_BIT);

    /// Builds a field from an iterator of permitted values. Panics if any
    /// value is `>= 61` — callers must range-check against the field's
    /// [`FieldDescriptor`] first.
    pub fn from_values(values: impl IntoIterator<Item = u32>) -> Self {
        let mut bits = 0u64;
        for v in values {
            assert!(v < 61, "cron field value {v} collides with sentinel bits");
            bits |= 1 << v;
        }
        CronField(bits)
    }

    pub fn is_asterisk(self) -> bool {
        self == CronField::ASTERISK
    }

    pub fn is_step(self) -> bool {
        self == CronField::STEP
    }

    /// Whether this field is explicitly constrained — neither the asterisk
    /// nor the step sentinel. Used to decide the day/weekday disjunction
    /// and the post-parse asterisk-to-step rewrite.
    pub fn is_constrained(self) -> bool {
        !self.is_asterisk() && !self.is_step()
    }

    /// Smallest permitted value in the bitset. Only meaningful when the
    /// field is constrained.
    pub fn smallest(self) -> u32 {
        self.0.trailing_zeros()
    }

    /// Computes the nearest permitted value relative to `curr`.
    ///
    /// - Asterisk: the current value is always acceptable; the carry flag
    ///   passes through untouched.
    /// - Step: advances by one when `greater`, wrapping to `descriptor.min`
    ///   with a carry if that exceeds `descriptor.max`.
    /// - Otherwise: scans set bits from `curr` upward within the
    ///   descriptor's range, accepting the first strictly-greater bit (or
    ///   the bit equal to `curr` when `greater` is false). Wraps to the
    ///   smallest set bit with a carry if none is found.
    pub fn next(self, curr: u32, descriptor: FieldDescriptor, greater: bool) -> (u32, bool) {
        if self.is_asterisk() {
            return (curr, greater);
        }
        if self.is_step() {
            let curr = if greater { curr + 1 } else { curr };
            return if curr > descriptor.max {
                (descriptor.min, true)
            } else {
                (curr, false)
            };
        }

        for i in curr..=descriptor.max {
            if self.0 & (1 << i) == 0 {
                continue;
            }
            if i > curr || (i == curr && !greater) {
                return (i, false);
            }
        }

        (self.smallest(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Position;

    #[test]
    fn asterisk_never_advances() {
        let d = Position::Second.descriptor();
        assert_eq!(CronField::ASTERISK.next(30, d, false), (30, false));
        assert_eq!(CronField::ASTERISK.next(30, d, true), (30, true));
    }

    #[test]
    fn step_wraps_with_carry() {
        let d = Position::Second.descriptor();
        assert_eq!(CronField::STEP.next(59, d, true), (0, true));
        assert_eq!(CronField::STEP.next(5, d, true), (6, false));
        assert_eq!(CronField::STEP.next(5, d, false), (5, false));
    }

    #[test]
    fn bitset_accepts_equal_when_not_greater() {
        let d = Position::Minute.descriptor();
        let f = CronField::from_values([0, 15, 30, 45]);
        assert_eq!(f.next(30, d, false), (30, false));
        assert_eq!(f.next(30, d, true), (45, false));
    }

    #[test]
    fn bitset_wraps_past_max_member() {
        let d = Position::Minute.descriptor();
        let f = CronField::from_values([0, 15, 30, 45]);
        assert_eq!(f.next(46, d, true), (0, true));
        assert_eq!(f.next(45, d, true), (0, true));
    }

    #[test]
    fn smallest_is_trailing_zero_count() {
        let f = CronField::from_values([3, 7, 40]);
        assert_eq!(f.smallest(), 3);
    }

    #[test]
    fn constrained_excludes_sentinels() {
        assert!(!CronField::ASTERISK.is_constrained());
        assert!(!CronField::STEP.is_constrained());
        assert!(CronField::from_values([1]).is_constrained());
    }
}
