//! Greedy decomposition of a quantity into fixed denominations.
//!
//! Repeatedly take the largest unit that fits, as many times as it fits, then
//! move to the next smaller unit. Unit sizes strictly decrease, so the loop
//! runs once per unit and the remainder is always smaller than the last unit.

use serde::{Deserialize, Serialize};

use super::TierError;

/// A `(unit size, unit value)` pair, e.g. "10999 beans buys a 3045-diamond pack".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denomination {
    pub size: u64,
    pub value: u64,
}

impl Denomination {
    pub const fn new(size: u64, value: u64) -> Self {
        Self { size, value }
    }
}

/// A validated unit list, largest size first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Denomination>", into = "Vec<Denomination>")]
pub struct Denominations(pub(super) Vec<Denomination>);

impl Denominations {
    /// Sort units largest-first and reject empty lists, zero sizes and duplicate sizes.
    pub fn new(units: impl IntoIterator<Item = Denomination>) -> Result<Self, TierError> {
        let mut units: Vec<Denomination> = units.into_iter().collect();
        if units.is_empty() {
            return Err(TierError::InvalidDenominations("no units given".to_string()));
        }
        if units.iter().any(|u| u.size == 0) {
            return Err(TierError::InvalidDenominations(
                "unit sizes must be greater than zero".to_string(),
            ));
        }

        units.sort_by(|a, b| b.size.cmp(&a.size));

        if let Some(pair) = units.windows(2).find(|w| w[0].size == w[1].size) {
            return Err(TierError::InvalidDenominations(format!(
                "duplicate unit size {}",
                pair[0].size
            )));
        }

        Ok(Self(units))
    }

    pub fn as_slice(&self) -> &[Denomination] {
        &self.0
    }
}

impl TryFrom<Vec<Denomination>> for Denominations {
    type Error = TierError;

    fn try_from(units: Vec<Denomination>) -> Result<Self, Self::Error> {
        Denominations::new(units)
    }
}

impl From<Denominations> for Vec<Denomination> {
    fn from(units: Denominations) -> Self {
        units.0
    }
}

/// How many of one unit the breakdown used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitCount {
    pub unit: Denomination,
    pub count: u64,
}

impl UnitCount {
    pub fn value(&self) -> u64 {
        self.unit.value.saturating_mul(self.count)
    }
}

/// Output of `decompose`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown {
    pub total: u64,
    /// Units actually used (count > 0), largest first.
    pub counts: Vec<UnitCount>,
    pub total_value: u64,
    pub remainder: u64,
}

impl Breakdown {
    /// Count used for a given unit size (0 when unused).
    pub fn count_for(&self, size: u64) -> u64 {
        self.counts
            .iter()
            .find(|c| c.unit.size == size)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

/// Greedy change-making over `units`.
pub fn decompose(total: u64, units: &Denominations) -> Breakdown {
    let mut remainder = total;
    let mut counts = Vec::new();
    let mut total_value = 0u64;

    for &unit in units.as_slice() {
        let count = remainder / unit.size;
        if count == 0 {
            continue;
        }
        remainder %= unit.size;
        let used = UnitCount { unit, count };
        total_value = total_value.saturating_add(used.value());
        counts.push(used);
    }

    Breakdown {
        total,
        counts,
        total_value,
        remainder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::diamond_units;

    #[test]
    fn decomposes_mixed_total_exactly() {
        let b = decompose(11108, &diamond_units());
        assert_eq!(b.count_for(10999), 1);
        assert_eq!(b.count_for(3999), 0);
        assert_eq!(b.count_for(999), 0);
        assert_eq!(b.count_for(109), 1);
        assert_eq!(b.total_value, 3045 + 29);
        assert_eq!(b.remainder, 0);
        assert_eq!(b.counts.len(), 2);
    }

    #[test]
    fn leftover_below_smallest_unit_is_remainder() {
        let b = decompose(7, &diamond_units());
        assert!(b.counts.is_empty());
        assert_eq!(b.total_value, 0);
        assert_eq!(b.remainder, 7);
    }

    #[test]
    fn repeats_a_unit_as_often_as_it_fits() {
        let b = decompose(3 * 10999 + 8 * 2 + 1, &diamond_units());
        assert_eq!(b.count_for(10999), 3);
        assert_eq!(b.count_for(8), 2);
        assert_eq!(b.remainder, 1);
        assert_eq!(b.total_value, 3 * 3045 + 2 * 2);
    }

    #[test]
    fn zero_total_is_empty() {
        let b = decompose(0, &diamond_units());
        assert!(b.counts.is_empty());
        assert_eq!(b.remainder, 0);
    }

    #[test]
    fn units_are_sorted_and_validated() {
        let units = Denominations::new([Denomination::new(5, 1), Denomination::new(20, 5)]).unwrap();
        assert_eq!(units.as_slice()[0].size, 20);

        assert!(Denominations::new([]).is_err());
        assert!(Denominations::new([Denomination::new(0, 1)]).is_err());
        assert!(Denominations::new([Denomination::new(5, 1), Denomination::new(5, 2)]).is_err());
    }

    #[test]
    fn remainder_always_below_smallest_unit() {
        let units = diamond_units();
        for total in [0u64, 1, 8, 9, 108, 110, 1000, 4000, 11_000, 123_456] {
            let b = decompose(total, &units);
            assert!(b.remainder < 8, "total={total} remainder={}", b.remainder);
            let rebuilt: u64 = b.counts.iter().map(|c| c.unit.size * c.count).sum::<u64>() + b.remainder;
            assert_eq!(rebuilt, total);
        }
    }
}
