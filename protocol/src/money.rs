use serde::{Deserialize, Serialize};
use std::fmt;

/// A credit balance or charge, stored as an integer to keep the ledger exact
/// across repeated debits. One credit is 1000 millicredits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Millicredits(pub i64);

impl Millicredits {
    pub const PER_CREDIT: i64 = 1000;

    pub fn from_credits(credits: f64) -> Self {
        Millicredits((credits * Self::PER_CREDIT as f64).round() as i64)
    }

    pub fn as_credits(self) -> f64 {
        self.0 as f64 / Self::PER_CREDIT as f64
    }

    pub fn checked_sub(self, other: Millicredits) -> Option<Millicredits> {
        self.0.checked_sub(other.0).map(Millicredits)
    }

    pub fn checked_add(self, other: Millicredits) -> Option<Millicredits> {
        self.0.checked_add(other.0).map(Millicredits)
    }
}

impl fmt::Display for Millicredits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.as_credits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_credits() {
        let m = Millicredits::from_credits(0.5);
        assert_eq!(m, Millicredits(500));
        assert_eq!(m.as_credits(), 0.5);
    }

    #[test]
    fn checked_sub_detects_arithmetic_overflow() {
        let balance = Millicredits(i64::MIN);
        assert_eq!(balance.checked_sub(Millicredits(1)), None);
    }

    #[test]
    fn checked_sub_allows_going_negative() {
        // checked_sub only reports i64 overflow, not a negative-balance
        // guard; that check lives in the control plane's debit path.
        let balance = Millicredits(400);
        let charge = Millicredits(500);
        assert_eq!(balance.checked_sub(charge), Some(Millicredits(-100)));
    }
}
