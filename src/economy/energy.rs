//! Player-wide energy grid
//!
//! Producers add to both `output` and `balance`; consumers only pull
//! `balance` down. When the balance goes negative, the available output is
//! rationed across all consumers in proportion to their nominal draw, which
//! reduces to a single availability factor applied to every income.

use serde::{Deserialize, Serialize};

/// Aggregate energy figures for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyGrid {
    /// Total energy produced by producer buildings (>= 0)
    pub output: f64,
    /// Output minus total consumer draw (may be negative)
    pub balance: f64,
}

impl EnergyGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a building's contribution from the aggregate
    pub fn withdraw(&mut self, energy: f64, producer: bool) {
        if producer {
            self.output -= energy;
        }
        self.balance -= energy;
    }

    /// Add a building's contribution to the aggregate
    pub fn deposit(&mut self, energy: f64, producer: bool) {
        if producer {
            self.output += energy;
        }
        self.balance += energy;
    }

    /// Fraction of nominal production that is powered.
    ///
    /// - no output at all: 0.0
    /// - balance >= 0: 1.0
    /// - deficit: `output / (output + |balance|)`, i.e. output divided by
    ///   total consumer draw
    pub fn availability_factor(&self) -> f64 {
        if self.output == 0.0 {
            0.0
        } else if self.balance >= 0.0 {
            1.0
        } else {
            self.output / (self.output + (-self.balance))
        }
    }

    /// Total draw of all consumers
    pub fn consumption(&self) -> f64 {
        self.output - self.balance
    }

    /// Rebuild the aggregate from individual contributions
    pub fn recompute<I>(contributions: I) -> Self
    where
        I: IntoIterator<Item = (f64, bool)>,
    {
        let mut grid = Self::new();
        for (energy, producer) in contributions {
            grid.deposit(energy, producer);
        }
        grid
    }

    /// Approximate equality, for comparing incremental and recomputed grids
    pub fn approx_eq(&self, other: &EnergyGrid, epsilon: f64) -> bool {
        (self.output - other.output).abs() <= epsilon
            && (self.balance - other.balance).abs() <= epsilon
    }
}
