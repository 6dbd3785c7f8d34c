//! Breakpoint tables and the tier resolver.
//!
//! Two table conventions exist in the wild:
//!
//! - `UpperBound`: thresholds ascending, a query matches the first tier whose
//!   threshold is `>= q`. The tiers partition `[0, t1], (t1, t2], ...`.
//! - `Minimum`: thresholds descending, a query matches the first tier whose
//!   threshold is `<= q` ("earned at least this much").
//!
//! Out-of-range queries clamp to the nearest tier instead of failing, which
//! models an uncapped top tier. Negative or non-finite queries are rejected.

use serde::{Deserialize, Serialize};

use super::TierError;

/// How a table's thresholds bound its tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Convention {
    /// Ascending thresholds; each threshold is the inclusive upper bound of its tier.
    UpperBound,
    /// Descending thresholds; each threshold is the inclusive minimum of its tier.
    Minimum,
}

/// What a table's tier values mean. One kind per table, never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutKind {
    /// Tier value is a multiplier: payout = quantity × rate.
    Rate,
    /// Tier value is the payout itself.
    Fixed,
}

impl PayoutKind {
    pub fn label(self) -> &'static str {
        match self {
            PayoutKind::Rate => "rate",
            PayoutKind::Fixed => "fixed",
        }
    }
}

/// One breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: f64,
    pub value: f64,
}

impl Tier {
    pub const fn new(threshold: f64, value: f64) -> Self {
        Self { threshold, value }
    }
}

/// Serialized form of a table, validated into a `TierTable` on load.
#[derive(Debug, Clone, Deserialize)]
pub struct TierTableSpec {
    pub name: String,
    pub convention: Convention,
    pub kind: PayoutKind,
    pub tiers: Vec<Tier>,
}

/// An immutable, validated tier table.
///
/// Tiers are stored in the order the convention scans them: ascending for
/// `UpperBound`, descending for `Minimum`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TierTableSpec")]
pub struct TierTable {
    pub(super) name: String,
    pub(super) convention: Convention,
    pub(super) kind: PayoutKind,
    pub(super) tiers: Vec<Tier>,
}

impl TryFrom<TierTableSpec> for TierTable {
    type Error = TierError;

    fn try_from(spec: TierTableSpec) -> Result<Self, Self::Error> {
        TierTable::new(spec.name, spec.convention, spec.kind, spec.tiers)
    }
}

/// Result of converting a quantity through a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub quantity: f64,
    /// Threshold of the matched tier.
    pub threshold: f64,
    /// Raw tier value (a rate or a fixed payout, depending on `kind`).
    pub value: f64,
    pub kind: PayoutKind,
    pub payout: f64,
}

impl TierTable {
    /// Build a table from breakpoints in any order.
    ///
    /// Thresholds are sorted according to `convention`; duplicates, negative or
    /// non-finite thresholds and values, and empty tables are rejected.
    pub fn new(
        name: impl Into<String>,
        convention: Convention,
        kind: PayoutKind,
        tiers: impl IntoIterator<Item = Tier>,
    ) -> Result<Self, TierError> {
        let name = name.into();
        let mut tiers: Vec<Tier> = tiers.into_iter().collect();

        if tiers.is_empty() {
            return Err(TierError::EmptyTable(name));
        }

        for t in &tiers {
            if !t.threshold.is_finite() || t.threshold < 0.0 {
                return Err(TierError::InvalidThreshold {
                    table: name,
                    threshold: t.threshold,
                });
            }
            if !t.value.is_finite() || t.value < 0.0 {
                return Err(TierError::InvalidValue { table: name, value: t.value });
            }
        }

        tiers.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));

        if let Some(pair) = tiers.windows(2).find(|w| w[0].threshold == w[1].threshold) {
            return Err(TierError::DuplicateThreshold {
                table: name,
                threshold: pair[0].threshold,
            });
        }

        if convention == Convention::Minimum {
            tiers.reverse();
        }

        Ok(Self {
            name,
            convention,
            kind,
            tiers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub fn kind(&self) -> PayoutKind {
        self.kind
    }

    /// Tiers in scan order (see type docs).
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Find the tier a quantity falls into.
    pub fn resolve(&self, quantity: f64) -> Result<&Tier, TierError> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(TierError::InvalidInput(quantity));
        }

        let hit = match self.convention {
            Convention::UpperBound => self.tiers.iter().find(|t| quantity <= t.threshold),
            Convention::Minimum => self.tiers.iter().find(|t| quantity >= t.threshold),
        };

        // Both conventions clamp to the last tier in scan order: the top tier for
        // `UpperBound`, the lowest minimum for `Minimum`.
        hit.or_else(|| self.tiers.last())
            .ok_or_else(|| TierError::EmptyTable(self.name.clone()))
    }

    /// Resolve a quantity and compute its derived payout.
    pub fn convert(&self, quantity: f64) -> Result<Conversion, TierError> {
        let tier = self.resolve(quantity)?;
        let payout = match self.kind {
            PayoutKind::Rate => quantity * tier.value,
            PayoutKind::Fixed => tier.value,
        };
        Ok(Conversion {
            quantity,
            threshold: tier.threshold,
            value: tier.value,
            kind: self.kind,
            payout,
        })
    }
}
