//! The evaluation stack's element type: a wrapping signed 16-bit integer.

use std::fmt;

/// A value in `[MIN, MAX]`. Arithmetic wraps by one step past either bound,
/// matching `i16::wrapping_*` exactly since every operation CCL performs
/// (increment/decrement by one, combining two in-range cells) can overflow
/// the range by at most its own width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell(i16);

impl Cell {
    pub const MIN: i16 = i16::MIN;
    pub const MAX: i16 = i16::MAX;
    pub const ZERO: Cell = Cell(0);

    pub fn new(value: i16) -> Self {
        Cell(value)
    }

    pub fn value(self) -> i16 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    pub fn decrement(&mut self) {
        self.0 = self.0.wrapping_sub(1);
    }

    pub fn add(&mut self, other: Cell) {
        self.0 = self.0.wrapping_add(other.0);
    }

    pub fn sub(&mut self, other: Cell) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl From<i16> for Cell {
    fn from(value: i16) -> Self {
        Cell(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn increment_then_decrement_is_identity(v: i16) {
            let mut c = Cell::new(v);
            c.increment();
            c.decrement();
            prop_assert_eq!(c.value(), v);
        }

        #[test]
        fn add_then_sub_is_identity(a: i16, b: i16) {
            let mut c = Cell::new(a);
            c.add(Cell::new(b));
            c.sub(Cell::new(b));
            prop_assert_eq!(c.value(), a);
        }

        #[test]
        fn value_is_always_in_range(v: i16, steps in 0u32..4) {
            let mut c = Cell::new(v);
            for _ in 0..steps {
                c.increment();
            }
            prop_assert!(c.value() >= Cell::MIN && c.value() <= Cell::MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_wraps_at_max() {
        let mut c = Cell::new(Cell::MAX);
        c.increment();
        assert_eq!(c.value(), Cell::MIN);
    }

    #[test]
    fn decrement_wraps_at_min() {
        let mut c = Cell::new(Cell::MIN);
        c.decrement();
        assert_eq!(c.value(), Cell::MAX);
    }

    #[test]
    fn repeated_increment_wraps_exactly_once_per_cycle() {
        let mut c = Cell::new(0);
        for _ in 0..32768 {
            c.increment();
        }
        assert_eq!(c.value(), Cell::MIN);
    }

    #[test]
    fn repeated_decrement() {
        let mut c = Cell::new(0);
        c.decrement();
        assert_eq!(c.value(), -1);
        for _ in 0..32768 {
            c.decrement();
        }
        assert_eq!(c.value(), Cell::MAX);
    }

    #[test]
    fn add_sub_in_range() {
        let mut c = Cell::new(5);
        c.add(Cell::new(3));
        assert_eq!(c.value(), 8);
        c.sub(Cell::new(10));
        assert_eq!(c.value(), -2);
    }
}
