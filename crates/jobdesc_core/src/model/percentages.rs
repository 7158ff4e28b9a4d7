//! Responsibility time allocation across the six fixed categories.
//!
//! # Invariants
//! - Every category always has a value (missing keys read as `0`).
//! - `set_clamped` never lets the total exceed `100`.
//! - A total of exactly `100` is required before create/update; that check
//!   lives in the validator, not here.

use crate::model::job_description::ResponsibilityCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FULL_ALLOCATION: u32 = 100;

/// Map of category -> integer percentage (0..=100).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponsibilityPercentages(BTreeMap<ResponsibilityCategory, u8>);

impl ResponsibilityPercentages {
    /// Builds an allocation with every category at `0`.
    pub fn new() -> Self {
        Self(
            ResponsibilityCategory::ALL
                .iter()
                .map(|category| (*category, 0))
                .collect(),
        )
    }

    /// Builds an allocation from raw pairs without clamping.
    ///
    /// Used for persisted values and tests; input screens should go through
    /// `set_clamped` instead.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ResponsibilityCategory, u8)>) -> Self {
        let mut value = Self::new();
        for (category, percent) in pairs {
            value.0.insert(category, percent);
        }
        value
    }

    pub fn get(&self, category: ResponsibilityCategory) -> u8 {
        self.0.get(&category).copied().unwrap_or(0)
    }

    /// Sum of all six categories.
    pub fn total(&self) -> u32 {
        self.0.values().map(|value| u32::from(*value)).sum()
    }

    /// Sum of every category except `category`.
    pub fn total_excluding(&self, category: ResponsibilityCategory) -> u32 {
        self.0
            .iter()
            .filter(|(key, _)| **key != category)
            .map(|(_, value)| u32::from(*value))
            .sum()
    }

    /// Sets one category, capping it so the running total stays <= 100.
    ///
    /// Returns the value actually stored.
    pub fn set_clamped(&mut self, category: ResponsibilityCategory, requested: u32) -> u8 {
        let headroom = FULL_ALLOCATION.saturating_sub(self.total_excluding(category));
        let stored = requested.min(headroom);
        // headroom <= 100, so the narrowing below cannot truncate.
        let stored = u8::try_from(stored).unwrap_or(u8::MAX);
        self.0.insert(category, stored);
        stored
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.total() == FULL_ALLOCATION
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResponsibilityCategory, u8)> + '_ {
        ResponsibilityCategory::ALL
            .iter()
            .map(move |category| (*category, self.get(*category)))
    }
}

impl Default for ResponsibilityPercentages {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ResponsibilityPercentages;
    use crate::model::job_description::ResponsibilityCategory;

    #[test]
    fn new_allocation_has_all_categories_at_zero() {
        let value = ResponsibilityPercentages::new();
        assert_eq!(value.total(), 0);
        assert_eq!(value.iter().count(), 6);
    }

    #[test]
    fn set_clamped_caps_to_remaining_headroom() {
        let mut value = ResponsibilityPercentages::new();
        assert_eq!(value.set_clamped(ResponsibilityCategory::Strategic, 70), 70);
        assert_eq!(value.set_clamped(ResponsibilityCategory::General, 50), 30);
        assert_eq!(value.total(), 100);
        assert_eq!(value.set_clamped(ResponsibilityCategory::Others, 10), 0);
    }

    #[test]
    fn lowering_a_value_frees_headroom_for_others() {
        let mut value = ResponsibilityPercentages::new();
        value.set_clamped(ResponsibilityCategory::Strategic, 100);
        value.set_clamped(ResponsibilityCategory::Strategic, 40);
        assert_eq!(value.set_clamped(ResponsibilityCategory::Culture, 80), 60);
        assert!(value.is_fully_allocated());
    }

    #[test]
    fn any_edit_sequence_keeps_total_within_bounds() {
        let categories = ResponsibilityCategory::ALL;
        let mut value = ResponsibilityPercentages::new();
        let mut seed: u32 = 17;
        for step in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let category = categories[(seed as usize >> 4) % categories.len()];
            let requested = (seed >> 8) % 130;
            value.set_clamped(category, requested);
            assert!(value.total() <= 100, "step {step} overflowed: {value:?}");
        }
    }

    #[test]
    fn serializes_as_flat_map() {
        let value = ResponsibilityPercentages::from_pairs([
            (ResponsibilityCategory::Strategic, 40),
            (ResponsibilityCategory::General, 60),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["strategic"], 40);
        assert_eq!(json["general"], 60);
        assert_eq!(json["others"], 0);
    }
}
