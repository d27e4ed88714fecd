//! Tick counter type for relative delays

use core::fmt;

/// Relative delay counter, measured in timer ticks
///
/// 16 bits because the target is an 8-bit AVR; a 1 ms tick gives a
/// maximum single delay of just over a minute, and longer waits are
/// expressed by re-scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticks(u16);

impl Ticks {
    /// Zero ticks
    pub const ZERO: Self = Self(0);

    /// Maximum tick count
    pub const MAX: Self = Self(u16::MAX);

    /// Create a new tick count
    pub const fn new(ticks: u16) -> Self {
        Self(ticks)
    }

    /// Get the raw tick count
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Check if the counter is zero
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Decrement the counter by one tick
    ///
    /// Returns true when this decrement made the counter reach zero.
    /// A counter that is already zero stays zero and returns false.
    pub fn decrement(&mut self) -> bool {
        if self.0 > 0 {
            self.0 -= 1;
            self.0 == 0
        } else {
            false
        }
    }

    /// Subtract, saturating at zero
    pub const fn saturating_sub(self, other: Ticks) -> Ticks {
        Ticks(self.0.saturating_sub(other.0))
    }
}

impl From<u16> for Ticks {
    fn from(ticks: u16) -> Self {
        Self(ticks)
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ticks", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Ticks {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ticks", self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_reports_expiry_once() {
        let mut t = Ticks::new(2);
        assert!(!t.decrement());
        assert!(t.decrement());
        assert!(!t.decrement());
        assert!(t.is_zero());
    }

    #[test]
    fn saturating_sub_stops_at_zero() {
        assert_eq!(Ticks::new(5).saturating_sub(Ticks::new(3)), Ticks::new(2));
        assert_eq!(Ticks::new(3).saturating_sub(Ticks::new(5)), Ticks::ZERO);
    }
}
