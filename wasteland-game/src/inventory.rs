//! Supply item kinds and the player's carried inventory.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supply tokens the simulation knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    CannedFood,
    WaterBottles,
    MedKit,
    RadPills,
    GasMask,
    MeatRation,
}

impl ItemKind {
    pub const ALL: [Self; 6] = [
        Self::CannedFood,
        Self::WaterBottles,
        Self::MedKit,
        Self::RadPills,
        Self::GasMask,
        Self::MeatRation,
    ];

    /// Stable token used in snapshots and choice input.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::CannedFood => "canned_food",
            Self::WaterBottles => "water_bottles",
            Self::MedKit => "med_kit",
            Self::RadPills => "rad_pills",
            Self::GasMask => "gas_mask",
            Self::MeatRation => "meat_ration",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CannedFood => "canned food",
            Self::WaterBottles => "water bottles",
            Self::MedKit => "med kit",
            Self::RadPills => "rad pills",
            Self::GasMask => "gas mask",
            Self::MeatRation => "meat ration",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ItemKind {
    type Err = ();

    /// Accepts the snake_case key or the spaced label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == normalized)
            .ok_or(())
    }
}

/// Ordered multiset of carried supplies.
///
/// Order of acquisition carries no gameplay meaning but is preserved so that
/// snapshots round-trip exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Inventory {
    items: Vec<ItemKind>,
}

impl Inventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_items(items: Vec<ItemKind>) -> Self {
        Self { items }
    }

    pub fn add(&mut self, kind: ItemKind) {
        self.items.push(kind);
    }

    pub fn add_many<I>(&mut self, kinds: I)
    where
        I: IntoIterator<Item = ItemKind>,
    {
        self.items.extend(kinds);
    }

    /// Remove the first occurrence of `kind`; returns false and leaves the
    /// inventory untouched when none is held.
    pub fn remove_one(&mut self, kind: ItemKind) -> bool {
        if let Some(idx) = self.items.iter().position(|held| *held == kind) {
            self.items.remove(idx);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, kind: ItemKind) -> bool {
        self.items.contains(&kind)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn count_of(&self, kind: ItemKind) -> usize {
        self.items.iter().filter(|held| **held == kind).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[ItemKind] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemKind> + '_ {
        self.items.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_and_labels() {
        assert_eq!("canned_food".parse(), Ok(ItemKind::CannedFood));
        assert_eq!("Water Bottles".parse(), Ok(ItemKind::WaterBottles));
        assert_eq!(" MED_KIT ".parse(), Ok(ItemKind::MedKit));
        assert_eq!("smg".parse::<ItemKind>(), Err(()));
        for kind in ItemKind::ALL {
            assert_eq!(kind.key().parse(), Ok(kind));
        }
    }

    #[test]
    fn remove_one_on_absent_kind_is_a_no_op() {
        let mut inventory = Inventory::from_items(vec![ItemKind::GasMask]);
        let before = inventory.clone();
        assert!(!inventory.remove_one(ItemKind::MedKit));
        assert_eq!(inventory, before);

        let mut empty = Inventory::new();
        assert!(!empty.remove_one(ItemKind::CannedFood));
        assert!(empty.is_empty());
    }

    #[test]
    fn remove_one_takes_a_single_copy_and_keeps_order() {
        let mut inventory = Inventory::new();
        inventory.add_many([
            ItemKind::CannedFood,
            ItemKind::RadPills,
            ItemKind::CannedFood,
            ItemKind::GasMask,
        ]);
        assert!(inventory.remove_one(ItemKind::CannedFood));
        assert_eq!(
            inventory.items(),
            &[ItemKind::RadPills, ItemKind::CannedFood, ItemKind::GasMask]
        );
        assert_eq!(inventory.count_of(ItemKind::CannedFood), 1);
        assert_eq!(inventory.count(), 3);
    }

    #[test]
    fn serializes_as_a_plain_token_list() {
        let inventory = Inventory::from_items(vec![ItemKind::MeatRation, ItemKind::WaterBottles]);
        let json = serde_json::to_string(&inventory).unwrap();
        assert_eq!(json, r#"["meat_ration","water_bottles"]"#);
        let back: Inventory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inventory);
        assert!(serde_json::from_str::<Inventory>(r#"["smg"]"#).is_err());
    }
}
