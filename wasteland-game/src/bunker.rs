//! The finite starting stash kept inside the bunker.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{BUNKER_CANNED_FOOD, BUNKER_MED_KITS, BUNKER_WATER_BOTTLES};
use crate::error::{ActionError, SnapshotError};
use crate::inventory::{Inventory, ItemKind};

/// What the player asked for when inspecting the bunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BunkerRequest {
    Withdraw(ItemKind),
    Decline,
}

impl BunkerRequest {
    /// Parse a withdrawal token: an item key/label or `none`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidChoice`] for tokens naming neither.
    pub fn parse(token: &str) -> Result<Self, ActionError> {
        let trimmed = token.trim();
        if trimmed.eq_ignore_ascii_case("none") || trimmed.is_empty() {
            return Ok(Self::Decline);
        }
        trimmed
            .parse::<ItemKind>()
            .map(Self::Withdraw)
            .map_err(|()| ActionError::invalid(token))
    }
}

/// Remaining counts for the restricted subset of items the bunker stocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BunkerStock {
    counts: BTreeMap<ItemKind, u32>,
}

impl Default for BunkerStock {
    fn default() -> Self {
        Self {
            counts: BTreeMap::from([
                (ItemKind::CannedFood, BUNKER_CANNED_FOOD),
                (ItemKind::WaterBottles, BUNKER_WATER_BOTTLES),
                (ItemKind::MedKit, BUNKER_MED_KITS),
            ]),
        }
    }
}

impl BunkerStock {
    pub const STOCKED: [ItemKind; 3] = [ItemKind::CannedFood, ItemKind::WaterBottles, ItemKind::MedKit];

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A bunker with every shelf cleared.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            counts: Self::STOCKED.into_iter().map(|kind| (kind, 0)).collect(),
        }
    }

    /// Rebuild stock from raw counts, refusing kinds the bunker never holds.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidBunkerItem`] for kinds outside the
    /// stocked subset.
    pub fn from_counts(counts: &BTreeMap<ItemKind, u32>) -> Result<Self, SnapshotError> {
        if let Some(kind) = counts.keys().find(|kind| !Self::is_stocked(**kind)) {
            return Err(SnapshotError::InvalidBunkerItem(*kind));
        }
        let mut stock = Self::empty();
        stock.counts.extend(counts.iter().map(|(kind, count)| (*kind, *count)));
        Ok(stock)
    }

    #[must_use]
    pub fn is_stocked(kind: ItemKind) -> bool {
        Self::STOCKED.contains(&kind)
    }

    #[must_use]
    pub fn count(&self, kind: ItemKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.counts.values().all(|count| *count == 0)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = (ItemKind, u32)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }

    #[must_use]
    pub fn counts(&self) -> &BTreeMap<ItemKind, u32> {
        &self.counts
    }

    /// Move one unit of `kind` into the inventory, returning what is left.
    ///
    /// # Errors
    ///
    /// [`ActionError::InvalidChoice`] when the bunker never stocks `kind`,
    /// [`ActionError::InsufficientStock`] when its shelf is empty. Neither
    /// mutates the stock or the inventory.
    pub fn withdraw(&mut self, kind: ItemKind, inventory: &mut Inventory) -> Result<u32, ActionError> {
        self.check_withdrawal(kind)?;
        let Some(count) = self.counts.get_mut(&kind) else {
            return Err(ActionError::invalid(kind.key()));
        };
        *count -= 1;
        inventory.add(kind);
        Ok(*count)
    }

    /// Whether one unit of `kind` could be withdrawn right now.
    ///
    /// # Errors
    ///
    /// Same as [`BunkerStock::withdraw`].
    pub fn check_withdrawal(&self, kind: ItemKind) -> Result<(), ActionError> {
        match self.counts.get(&kind) {
            None => Err(ActionError::invalid(kind.key())),
            Some(0) => Err(ActionError::InsufficientStock { kind }),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_five_three_two() {
        let stock = BunkerStock::new();
        assert_eq!(stock.count(ItemKind::CannedFood), 5);
        assert_eq!(stock.count(ItemKind::WaterBottles), 3);
        assert_eq!(stock.count(ItemKind::MedKit), 2);
        assert_eq!(stock.count(ItemKind::GasMask), 0);
        assert_eq!(stock.total(), 10);
        assert!(!stock.is_depleted());
    }

    #[test]
    fn withdraw_moves_one_unit_into_inventory() {
        let mut stock = BunkerStock::new();
        let mut inventory = Inventory::new();
        assert_eq!(stock.withdraw(ItemKind::MedKit, &mut inventory), Ok(1));
        assert_eq!(stock.withdraw(ItemKind::MedKit, &mut inventory), Ok(0));
        assert_eq!(
            stock.withdraw(ItemKind::MedKit, &mut inventory),
            Err(ActionError::InsufficientStock {
                kind: ItemKind::MedKit
            })
        );
        assert_eq!(inventory.count_of(ItemKind::MedKit), 2);
        assert_eq!(stock.count(ItemKind::MedKit), 0);
    }

    #[test]
    fn withdraw_rejects_unstocked_kinds_without_mutation() {
        let mut stock = BunkerStock::new();
        let mut inventory = Inventory::new();
        let err = stock.withdraw(ItemKind::GasMask, &mut inventory).unwrap_err();
        assert!(matches!(err, ActionError::InvalidChoice { .. }));
        assert!(inventory.is_empty());
        assert_eq!(stock, BunkerStock::new());
    }

    #[test]
    fn from_counts_refuses_foreign_items() {
        let counts = BTreeMap::from([(ItemKind::RadPills, 1)]);
        assert_eq!(
            BunkerStock::from_counts(&counts),
            Err(SnapshotError::InvalidBunkerItem(ItemKind::RadPills))
        );
        let counts = BTreeMap::from([(ItemKind::CannedFood, 1)]);
        let stock = BunkerStock::from_counts(&counts).unwrap();
        assert_eq!(stock.count(ItemKind::CannedFood), 1);
        assert_eq!(stock.count(ItemKind::WaterBottles), 0);
    }

    #[test]
    fn parses_withdrawal_tokens() {
        assert_eq!(BunkerRequest::parse("none"), Ok(BunkerRequest::Decline));
        assert_eq!(BunkerRequest::parse("NONE"), Ok(BunkerRequest::Decline));
        assert_eq!(
            BunkerRequest::parse("water_bottles"),
            Ok(BunkerRequest::Withdraw(ItemKind::WaterBottles))
        );
        assert!(BunkerRequest::parse("plutonium").is_err());
    }
}
