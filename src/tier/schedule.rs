//! Built-in bean/diamond schedules.
//!
//! These are the defaults used when no `--table` / `--units` file is given.

use super::{Convention, Denomination, Denominations, PayoutKind, Tier, TierTable};

/// Bean → diamond conversion rates (ascending, inclusive upper bounds).
pub fn beans_to_diamonds() -> TierTable {
    TierTable {
        name: "beans-to-diamonds".to_string(),
        convention: Convention::UpperBound,
        kind: PayoutKind::Rate,
        tiers: vec![
            Tier::new(8.0, 0.25),
            Tier::new(109.0, 0.2661),
            Tier::new(999.0, 0.2753),
            Tier::new(3999.0, 0.2763),
            Tier::new(10999.0, 0.2768),
        ],
    }
}

/// Diamond packs purchasable with beans, largest first.
pub fn diamond_units() -> Denominations {
    Denominations(vec![
        Denomination::new(10999, 3045),
        Denomination::new(3999, 1105),
        Denomination::new(999, 275),
        Denomination::new(109, 29),
        Denomination::new(8, 2),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_pass_validation() {
        let table = beans_to_diamonds();
        let rebuilt = TierTable::new(
            table.name(),
            table.convention(),
            table.kind(),
            table.tiers().iter().copied(),
        )
        .unwrap();
        assert_eq!(rebuilt, table);

        let units = diamond_units();
        assert_eq!(Denominations::new(units.as_slice().iter().copied()).unwrap(), units);
    }

    #[test]
    fn bean_rates_at_documented_boundaries() {
        let t = beans_to_diamonds();
        assert_eq!(t.resolve(8.0).unwrap().value, 0.25);
        assert_eq!(t.resolve(9.0).unwrap().value, 0.2661);
        assert_eq!(t.resolve(10999.0).unwrap().value, 0.2768);
        assert_eq!(t.resolve(20000.0).unwrap().value, 0.2768);
    }
}
