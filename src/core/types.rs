//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resource a player can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Metal,
    Crystal,
    Deuterium,
}

impl ResourceKind {
    /// Every resource kind, in ledger order
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Metal,
        ResourceKind::Crystal,
        ResourceKind::Deuterium,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Metal => "metal",
            ResourceKind::Crystal => "crystal",
            ResourceKind::Deuterium => "deuterium",
        }
    }
}

/// One quantity per resource kind.
///
/// Used for ledgers, costs and hourly rates alike. Kinds missing from a
/// serialized map default to zero; unknown kinds are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Resources {
    pub metal: f64,
    pub crystal: f64,
    pub deuterium: f64,
}

impl Resources {
    pub const ZERO: Resources = Resources {
        metal: 0.0,
        crystal: 0.0,
        deuterium: 0.0,
    };

    pub fn new(metal: f64, crystal: f64, deuterium: f64) -> Self {
        Self {
            metal,
            crystal,
            deuterium,
        }
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Metal => self.metal,
            ResourceKind::Crystal => self.crystal,
            ResourceKind::Deuterium => self.deuterium,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Metal => &mut self.metal,
            ResourceKind::Crystal => &mut self.crystal,
            ResourceKind::Deuterium => &mut self.deuterium,
        }
    }

    /// Iterate `(kind, amount)` pairs in ledger order
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        ResourceKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }

    /// Build a value by evaluating `f` for every kind
    pub fn from_fn(mut f: impl FnMut(ResourceKind) -> f64) -> Self {
        let mut out = Self::ZERO;
        for kind in ResourceKind::ALL {
            *out.get_mut(kind) = f(kind);
        }
        out
    }

    /// Multiply every component by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_fn(|kind| self.get(kind) * factor)
    }

    /// True iff every component of `cost` is covered by `self`
    pub fn covers(&self, cost: &Resources) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|&kind| cost.get(kind) <= self.get(kind))
    }

    /// How much of `cost` is missing, zero where `self` already covers it
    pub fn shortfall(&self, cost: &Resources) -> Resources {
        Self::from_fn(|kind| (cost.get(kind) - self.get(kind)).max(0.0))
    }

    /// Sum of the metal and crystal components
    pub fn structural(&self) -> f64 {
        self.metal + self.crystal
    }

    pub fn is_finite(&self) -> bool {
        self.iter().all(|(_, v)| v.is_finite())
    }

    pub fn is_non_negative(&self) -> bool {
        self.iter().all(|(_, v)| v >= 0.0)
    }
}

impl std::ops::AddAssign for Resources {
    fn add_assign(&mut self, rhs: Self) {
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) += rhs.get(kind);
        }
    }
}

impl std::ops::SubAssign for Resources {
    fn sub_assign(&mut self, rhs: Self) {
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) -= rhs.get(kind);
        }
    }
}

impl std::ops::Add for Resources {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, amount) in self.iter().filter(|(_, v)| *v != 0.0) {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{} {:.1}", kind.name(), amount)?;
            first = false;
        }
        if first {
            write!(f, "nothing")?;
        }
        Ok(())
    }
}

/// Milliseconds on the simulation clock
pub type Millis = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_ignores_zero_components() {
        let stock = Resources::new(100.0, 0.0, 0.0);
        assert!(stock.covers(&Resources::new(60.0, 0.0, 0.0)));
        assert!(!stock.covers(&Resources::new(60.0, 1.0, 0.0)));
    }

    #[test]
    fn test_covers_exact_amount() {
        let stock = Resources::new(60.0, 15.0, 0.0);
        assert!(stock.covers(&Resources::new(60.0, 15.0, 0.0)));
    }

    #[test]
    fn test_shortfall() {
        let stock = Resources::new(10.0, 50.0, 0.0);
        let short = stock.shortfall(&Resources::new(60.0, 15.0, 5.0));
        assert_eq!(short, Resources::new(50.0, 0.0, 5.0));
    }

    #[test]
    fn test_missing_kinds_default_to_zero() {
        let parsed: Resources = serde_json::from_str(r#"{"metal": 60}"#).unwrap();
        assert_eq!(parsed, Resources::new(60.0, 0.0, 0.0));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let parsed = serde_json::from_str::<Resources>(r#"{"metl": 60}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_display_skips_zero() {
        let r = Resources::new(12.0, 0.0, 3.5);
        assert_eq!(r.to_string(), "metal 12.0, deuterium 3.5");
        assert_eq!(Resources::ZERO.to_string(), "nothing");
    }

    #[test]
    fn test_scaled_and_add() {
        let r = Resources::new(10.0, 20.0, 0.0).scaled(0.5) + Resources::new(1.0, 1.0, 1.0);
        assert_eq!(r, Resources::new(6.0, 11.0, 1.0));
    }
}
