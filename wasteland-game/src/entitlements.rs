//! Premium bundle ownership and the grants each bundle carries.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::PersistError;
use crate::inventory::ItemKind;
use crate::persistence::{KeyedLocks, validate_key, write_atomically};
use crate::session::PlayerId;

pub const STARTER_PACK: &str = "starter_pack";
pub const PREMIUM_BUNDLE: &str = "premium_bundle";
pub const MEGA_PACK: &str = "mega_pack";

/// Storage seam for purchased bundles, keyed by player id.
pub trait EntitlementGateway {
    /// Record that `player` owns `bundle`.
    ///
    /// Returns `true` if the bundle was newly granted and `false` if the
    /// player already owned it, in which case nothing changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the entitlement cannot be read or written.
    fn grant_entitlement(&self, player: &PlayerId, bundle: &str) -> Result<bool, PersistError>;

    /// Every bundle `player` owns. Unknown players own nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the entitlement store cannot be read.
    fn entitlements(&self, player: &PlayerId) -> Result<BTreeSet<String>, PersistError>;
}

/// Maps bundle ids to the items they put into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleCatalog {
    grants: BTreeMap<String, Vec<ItemKind>>,
}

impl Default for BundleCatalog {
    fn default() -> Self {
        let mut starter = Vec::new();
        starter.extend([ItemKind::MedKit; 2]);
        starter.extend([ItemKind::CannedFood; 17]);
        starter.extend([ItemKind::WaterBottles; 20]);
        starter.extend([ItemKind::GasMask; 5]);
        starter.extend([ItemKind::RadPills; 5]);
        Self {
            grants: BTreeMap::from([(STARTER_PACK.to_string(), starter)]),
        }
    }
}

impl BundleCatalog {
    /// # Errors
    ///
    /// Returns an error if the JSON is not a map of bundle ids to item lists.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Items granted by `bundle`; empty for bundles the catalog does not know.
    #[must_use]
    pub fn grant(&self, bundle: &str) -> &[ItemKind] {
        self.grants.get(bundle).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, bundle: &str) -> bool {
        self.grants.contains_key(bundle)
    }

    pub fn bundles(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }
}

/// Entitlements held in process memory.
#[derive(Debug, Default)]
pub struct MemoryEntitlements {
    owned: Mutex<HashMap<PlayerId, BTreeSet<String>>>,
}

impl MemoryEntitlements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntitlementGateway for MemoryEntitlements {
    fn grant_entitlement(&self, player: &PlayerId, bundle: &str) -> Result<bool, PersistError> {
        let mut owned = self.owned.lock().map_err(|_| PersistError::Poisoned)?;
        Ok(owned
            .entry(player.clone())
            .or_default()
            .insert(bundle.to_string()))
    }

    fn entitlements(&self, player: &PlayerId) -> Result<BTreeSet<String>, PersistError> {
        let owned = self.owned.lock().map_err(|_| PersistError::Poisoned)?;
        Ok(owned.get(player).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PurchaseDocument {
    #[serde(default)]
    purchases: BTreeSet<String>,
}

/// One `premium_<player>.json` document per player inside `root`.
#[derive(Debug)]
pub struct JsonFileEntitlements {
    root: PathBuf,
    locks: KeyedLocks,
}

impl JsonFileEntitlements {
    /// Open (and create if needed) an entitlement directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            locks: KeyedLocks::default(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, player: &PlayerId) -> Result<PathBuf, PersistError> {
        validate_key(player.as_str())?;
        Ok(self.root.join(format!("premium_{player}.json")))
    }

    fn read_document(path: &Path) -> Result<PurchaseDocument, PersistError> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(PurchaseDocument::default()),
            Err(err) => Err(err.into()),
        }
    }
}

impl EntitlementGateway for JsonFileEntitlements {
    fn grant_entitlement(&self, player: &PlayerId, bundle: &str) -> Result<bool, PersistError> {
        let path = self.path_for(player)?;
        let granted = self.locks.with_key(player.as_str(), || {
            let mut document = Self::read_document(&path)?;
            if !document.purchases.insert(bundle.to_string()) {
                return Ok(false);
            }
            write_atomically(&path, &serde_json::to_string_pretty(&document)?)?;
            Ok(true)
        })?;
        if granted {
            log::info!("granted '{bundle}' to {player}");
        }
        Ok(granted)
    }

    fn entitlements(&self, player: &PlayerId) -> Result<BTreeSet<String>, PersistError> {
        let path = self.path_for(player)?;
        self.locks
            .with_key(player.as_str(), || Self::read_document(&path))
            .map(|document| document.purchases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "wasteland-entitlements-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn starter_pack_matches_the_classic_grant() {
        let catalog = BundleCatalog::default();
        let grant = catalog.grant(STARTER_PACK);
        let count = |kind: ItemKind| grant.iter().filter(|held| **held == kind).count();
        assert_eq!(count(ItemKind::MedKit), 2);
        assert_eq!(count(ItemKind::CannedFood), 17);
        assert_eq!(count(ItemKind::WaterBottles), 20);
        assert_eq!(count(ItemKind::GasMask), 5);
        assert_eq!(count(ItemKind::RadPills), 5);
        assert!(catalog.grant(PREMIUM_BUNDLE).is_empty());
        assert!(!catalog.contains(MEGA_PACK));
    }

    #[test]
    fn catalog_loads_from_json() {
        let catalog =
            BundleCatalog::from_json(r#"{"mega_pack": ["gas_mask", "med_kit"]}"#).unwrap();
        assert_eq!(catalog.grant(MEGA_PACK), &[ItemKind::GasMask, ItemKind::MedKit]);
        assert_eq!(catalog.bundles().collect::<Vec<_>>(), vec![MEGA_PACK]);
        assert!(BundleCatalog::from_json(r#"{"x": ["smg"]}"#).is_err());
    }

    #[test]
    fn memory_grants_are_idempotent() {
        let gateway = MemoryEntitlements::new();
        let player = PlayerId::derive("Ada", 1);
        assert!(gateway.entitlements(&player).unwrap().is_empty());
        assert!(gateway.grant_entitlement(&player, PREMIUM_BUNDLE).unwrap());
        let first = gateway.entitlements(&player).unwrap();
        assert!(!gateway.grant_entitlement(&player, PREMIUM_BUNDLE).unwrap());
        assert_eq!(gateway.entitlements(&player).unwrap(), first);
    }

    #[test]
    fn file_grants_persist_as_purchase_documents() {
        let root = temp_dir("file");
        let gateway = JsonFileEntitlements::open(&root).unwrap();
        let player = PlayerId::derive("Ada", 1);
        assert!(gateway.grant_entitlement(&player, STARTER_PACK).unwrap());
        assert!(!gateway.grant_entitlement(&player, STARTER_PACK).unwrap());
        assert!(gateway.grant_entitlement(&player, PREMIUM_BUNDLE).unwrap());

        let raw = fs::read_to_string(root.join(format!("premium_{player}.json"))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value["purchases"],
            serde_json::json!([PREMIUM_BUNDLE, STARTER_PACK])
        );

        let reopened = JsonFileEntitlements::open(&root).unwrap();
        assert_eq!(reopened.entitlements(&player).unwrap().len(), 2);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_gateway_validates_player_ids() {
        let root = temp_dir("ids");
        let gateway = JsonFileEntitlements::open(&root).unwrap();
        let bad = PlayerId::from_raw("../../root");
        assert!(matches!(
            gateway.grant_entitlement(&bad, STARTER_PACK),
            Err(PersistError::InvalidKey(_))
        ));
        let _ = fs::remove_dir_all(root);
    }
}
