//! PosStore: the server's record store.
//!
//! Holds users, items, sales, and kiosk records in memory and can snapshot
//! them to a JSON file so a restart does not lose data.
//!
//! # Credentials
//!
//! The store never sees plaintext passwords.  Callers hash with
//! `pos_core::credential` first (the HTTP layer does this off the async
//! executor) and pass the resulting hash
//! strings in.
//!
//! # Ids
//!
//! Each collection hands out ids starting at 1 and never reuses one.  Id 0 is
//! reserved: sales use `item_id` 0 for manual charges.

use std::path::{Path, PathBuf};

use chrono::Utc;
use pos_core::{
    Item, KioskRecord, KioskStatus, KioskUpdate, NewItem, NewSale, Privilege, Sale, User,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another user already carries this RFID token.
    #[error("RFID already assigned")]
    DuplicateRfid(String),
    /// No kiosk with this id exists.
    #[error("Kiosk not found")]
    KioskNotFound(u32),
    /// The snapshot file could not be read or written.
    #[error("I/O error accessing snapshot at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file is not valid JSON for this schema.
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// A user as stored on the server, including the credential hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: u32,
    pub username: String,
    pub password_hash: String,
    pub privilege: Privilege,
    pub rfid: Option<String>,
}

impl StoredUser {
    /// The client-facing view without the credential hash.
    pub fn to_public(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            privilege: self.privilege,
            rfid: self.rfid.clone(),
        }
    }
}

/// Hashed per-role passwords for a new kiosk.
#[derive(Debug, Clone, PartialEq)]
pub struct KioskPasswordHashes {
    pub kiosk: String,
    pub teacher: String,
    pub admin: String,
}

/// In-memory record store.
///
/// Stored behind a `Mutex` in the HTTP layer's shared state; all methods are
/// synchronous and cheap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosStore {
    #[serde(default)]
    users: Vec<StoredUser>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    sales: Vec<Sale>,
    #[serde(default)]
    kiosks: Vec<KioskRecord>,
    #[serde(default)]
    next_ids: NextIds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NextIds {
    user: u32,
    item: u32,
    sale: u32,
    kiosk: u32,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            user: 1,
            item: 1,
            sale: 1,
            kiosk: 1,
        }
    }
}

fn take_id(counter: &mut u32) -> u32 {
    let id = *counter;
    *counter += 1;
    id
}

impl PosStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Users ─────────────────────────────────────────────────────────────────

    /// Returns the public view of every user.
    pub fn list_users(&self) -> Vec<User> {
        self.users.iter().map(StoredUser::to_public).collect()
    }

    /// Adds a user.
    ///
    /// An empty RFID string is stored as "no token".
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateRfid`] if another user already has the
    /// same token.
    pub fn create_user(
        &mut self,
        username: String,
        password_hash: String,
        privilege: Privilege,
        rfid: Option<String>,
    ) -> Result<User, StoreError> {
        let rfid = rfid.filter(|r| !r.is_empty());
        if let Some(token) = &rfid {
            if self.users.iter().any(|u| u.rfid.as_ref() == Some(token)) {
                return Err(StoreError::DuplicateRfid(token.clone()));
            }
        }
        let user = StoredUser {
            id: take_id(&mut self.next_ids.user),
            username,
            password_hash,
            privilege,
            rfid,
        };
        debug!("created user {} ({})", user.id, user.privilege);
        let public = user.to_public();
        self.users.push(user);
        Ok(public)
    }

    // ── Items ─────────────────────────────────────────────────────────────────

    pub fn list_items(&self) -> Vec<Item> {
        self.items.clone()
    }

    pub fn add_item(&mut self, item: NewItem) -> Item {
        let item = Item {
            id: take_id(&mut self.next_ids.item),
            name: item.name,
            price: item.price,
        };
        self.items.push(item.clone());
        item
    }

    // ── Sales ─────────────────────────────────────────────────────────────────

    pub fn list_sales(&self) -> Vec<Sale> {
        self.sales.clone()
    }

    /// Records a sale stamped with the current UTC time.
    ///
    /// User and item ids are not checked against existing records; manual
    /// charges legitimately reference item 0.
    pub fn record_sale(&mut self, sale: NewSale) -> Sale {
        let sale = Sale {
            id: take_id(&mut self.next_ids.sale),
            user_id: sale.user_id,
            item_id: sale.item_id,
            quantity: sale.quantity,
            total_price: sale.total_price,
            timestamp: Utc::now(),
        };
        self.sales.push(sale.clone());
        sale
    }

    // ── Kiosks ────────────────────────────────────────────────────────────────

    pub fn list_kiosks(&self) -> Vec<KioskRecord> {
        self.kiosks.clone()
    }

    pub fn add_kiosk(&mut self, name: String, passwords: KioskPasswordHashes) -> KioskRecord {
        let kiosk = KioskRecord {
            id: take_id(&mut self.next_ids.kiosk),
            name,
            password_kiosk: passwords.kiosk,
            password_teacher: passwords.teacher,
            password_admin: passwords.admin,
            status: KioskStatus::Normal,
            ip_address: None,
        };
        self.kiosks.push(kiosk.clone());
        kiosk
    }

    /// Applies a partial update to kiosk `id`.
    ///
    /// Password fields in `update` must already be hashed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KioskNotFound`] for an unknown id.
    pub fn update_kiosk(&mut self, id: u32, update: KioskUpdate) -> Result<KioskRecord, StoreError> {
        let kiosk = self
            .kiosks
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or(StoreError::KioskNotFound(id))?;

        if let Some(status) = update.status {
            kiosk.status = status;
        }
        if let Some(hash) = update.password_kiosk {
            kiosk.password_kiosk = hash;
        }
        if let Some(hash) = update.password_teacher {
            kiosk.password_teacher = hash;
        }
        if let Some(hash) = update.password_admin {
            kiosk.password_admin = hash;
        }
        if let Some(ip) = update.ip_address {
            kiosk.ip_address = Some(ip);
        }
        Ok(kiosk.clone())
    }

    // ── Snapshot ──────────────────────────────────────────────────────────────

    /// Loads a snapshot from `path`, returning an empty store if the file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for other file-system errors and
    /// [`StoreError::Snapshot`] for malformed content.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut store: PosStore = serde_json::from_str(&content)?;
                store.reconcile_ids();
                info!(
                    "loaded snapshot from {}: {} users, {} items, {} sales, {} kiosks",
                    path.display(),
                    store.users.len(),
                    store.items.len(),
                    store.sales.len(),
                    store.kiosks.len()
                );
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Moves every id counter past the highest id already stored, so a
    /// snapshot with missing or stale counters never hands out an id twice.
    fn reconcile_ids(&mut self) {
        fn past(counter: &mut u32, ids: impl Iterator<Item = u32>) {
            if let Some(max) = ids.max() {
                *counter = (*counter).max(max.saturating_add(1));
            }
        }
        past(&mut self.next_ids.user, self.users.iter().map(|u| u.id));
        past(&mut self.next_ids.item, self.items.iter().map(|i| i.id));
        past(&mut self.next_ids.sale, self.sales.iter().map(|s| s.id));
        past(&mut self.next_ids.kiosk, self.kiosks.iter().map(|k| k.id));
        debug!(next_ids = ?self.next_ids, "id counters after load");
    }

    /// Writes a snapshot to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for file-system failures.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes() -> KioskPasswordHashes {
        KioskPasswordHashes {
            kiosk: "hk".to_string(),
            teacher: "ht".to_string(),
            admin: "ha".to_string(),
        }
    }

    #[test]
    fn test_store_starts_empty() {
        let store = PosStore::new();
        assert!(store.list_users().is_empty());
        assert!(store.list_items().is_empty());
        assert!(store.list_sales().is_empty());
        assert!(store.list_kiosks().is_empty());
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        // Arrange
        let mut store = PosStore::new();

        // Act
        let a = store.add_item(NewItem { name: "apple".into(), price: 0.5 });
        let b = store.add_item(NewItem { name: "bagel".into(), price: 1.25 });

        // Assert
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.list_items(), vec![a, b]);
    }

    #[test]
    fn test_create_user_hides_password_hash() {
        let mut store = PosStore::new();
        let user = store
            .create_user("sam".into(), "secret-hash".into(), Privilege::Student, Some("AB12".into()))
            .unwrap();

        let json = serde_json::to_string(&store.list_users()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert_eq!(user.rfid.as_deref(), Some("AB12"));
    }

    #[test]
    fn test_create_user_rejects_duplicate_rfid() {
        // Arrange
        let mut store = PosStore::new();
        store
            .create_user("a".into(), "h".into(), Privilege::Student, Some("TAG".into()))
            .unwrap();

        // Act
        let result = store.create_user("b".into(), "h".into(), Privilege::Teacher, Some("TAG".into()));

        // Assert
        assert!(matches!(result, Err(StoreError::DuplicateRfid(t)) if t == "TAG"));
        assert_eq!(store.list_users().len(), 1);
    }

    #[test]
    fn test_users_without_rfid_do_not_conflict() {
        let mut store = PosStore::new();
        store.create_user("a".into(), "h".into(), Privilege::Student, None).unwrap();
        store.create_user("b".into(), "h".into(), Privilege::Student, Some(String::new())).unwrap();
        assert!(store.list_users().iter().all(|u| u.rfid.is_none()));
    }

    #[test]
    fn test_record_sale_keeps_fields() {
        let mut store = PosStore::new();
        let sale = store.record_sale(NewSale {
            user_id: 4,
            item_id: NewSale::NO_ITEM,
            quantity: 1,
            total_price: 3.0,
        });
        assert_eq!(sale.id, 1);
        assert_eq!(sale.user_id, 4);
        assert_eq!(sale.item_id, 0);
        assert_eq!(store.list_sales().len(), 1);
    }

    #[test]
    fn test_add_kiosk_starts_in_normal_status() {
        let mut store = PosStore::new();
        let kiosk = store.add_kiosk("lobby".into(), hashes());
        assert_eq!(kiosk.status, KioskStatus::Normal);
        assert_eq!(kiosk.password_teacher, "ht");
        assert_eq!(kiosk.ip_address, None);
    }

    #[test]
    fn test_update_kiosk_applies_only_present_fields() {
        // Arrange
        let mut store = PosStore::new();
        let kiosk = store.add_kiosk("lobby".into(), hashes());

        // Act
        let updated = store
            .update_kiosk(
                kiosk.id,
                KioskUpdate {
                    status: Some(KioskStatus::Maintenance),
                    password_admin: Some("new-ha".into()),
                    ip_address: Some("10.0.0.7".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        // Assert
        assert_eq!(updated.status, KioskStatus::Maintenance);
        assert_eq!(updated.password_admin, "new-ha");
        assert_eq!(updated.password_kiosk, "hk");
        assert_eq!(updated.ip_address.as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_update_unknown_kiosk_is_not_found() {
        let mut store = PosStore::new();
        let result = store.update_kiosk(42, KioskUpdate::default());
        assert!(matches!(result, Err(StoreError::KioskNotFound(42))));
    }

    #[test]
    fn test_snapshot_round_trip_preserves_id_counters() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("pos_store_{}", std::process::id()));
        let path = dir.join("nested").join("pos.json");
        let mut store = PosStore::new();
        store.add_item(NewItem { name: "tea".into(), price: 1.0 });
        store.add_kiosk("lobby".into(), hashes());

        // Act
        store.save(&path).unwrap();
        let mut restored = PosStore::load(&path).unwrap();
        let next = restored.add_item(NewItem { name: "milk".into(), price: 0.8 });

        // Assert
        assert_eq!(restored.list_kiosks(), store.list_kiosks());
        assert_eq!(next.id, 2, "ids must continue after a reload");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_without_counters_continues_after_highest_id() {
        // Arrange: records present, `next_ids` absent or behind.
        let path = std::env::temp_dir().join(format!("pos_ids_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "items": [
                    {"id": 1, "name": "tea", "price": 1.0},
                    {"id": 4, "name": "milk", "price": 0.8}
                ],
                "users": [
                    {"id": 2, "username": "sam", "password_hash": "h",
                     "privilege": "student", "rfid": null}
                ]
            }"#,
        )
        .unwrap();

        // Act
        let mut store = PosStore::load(&path).unwrap();
        let item = store.add_item(NewItem { name: "juice".into(), price: 2.0 });
        let user = store
            .create_user("kim".into(), "h".into(), Privilege::Teacher, None)
            .unwrap();
        let sale = store.record_sale(NewSale {
            user_id: 2,
            item_id: 1,
            quantity: 1,
            total_price: 1.0,
        });

        // Assert
        assert_eq!(item.id, 5);
        assert_eq!(user.id, 3);
        assert_eq!(sale.id, 1, "empty collections still start at 1");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_returns_empty_store() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/pos.json");
        let store = PosStore::load(&path).unwrap();
        assert_eq!(store, PosStore::new());
    }

    #[test]
    fn test_load_malformed_snapshot_is_error() {
        let path = std::env::temp_dir().join(format!("pos_bad_{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let result = PosStore::load(&path);
        assert!(matches!(result, Err(StoreError::Snapshot(_))));
        std::fs::remove_file(&path).ok();
    }
}
