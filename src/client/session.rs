//! Locally persisted session and cart state.
//!
//! Both stores sit on a [`KeyValueStorage`] so the same code runs against
//! [`MemoryStorage`] in tests and [`FileStorage`] on a device.
//!
//! Layout:
//! - `user` holds the signed-in [`AuthSession`] (profile plus access token).
//! - `cart_{user_id}` holds that user's [`Cart`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartLine, CheckoutSummary};
use crate::domain::value_objects::HairLength;
use crate::services::auth::AuthSession;

pub const SESSION_KEY: &str = "user";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid storage key `{0}`")]
    InvalidKey(String),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// String key-value storage, shaped like browser local storage.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().map_err(|_| StorageError::Poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)?.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self { dir: dir.as_ref().to_path_buf() })
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(std::fs::write(self.path(key)?, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)?) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn current(&self) -> Result<Option<AuthSession>, StorageError> {
        match self.storage.get(SESSION_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Access token of the stored session. Unreadable state counts as signed out.
    pub fn token(&self) -> Option<String> {
        match self.current() {
            Ok(session) => session.map(|s| s.access_token),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session");
                None
            }
        }
    }

    pub fn save(&self, session: &AuthSession) -> Result<(), StorageError> {
        self.storage.set(SESSION_KEY, &serde_json::to_string(session)?)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(SESSION_KEY)
    }
}

/// Per-user cart persisted under `cart_{user_id}`. Every operation is load, change, save.
#[derive(Clone)]
pub struct CartStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl CartStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    fn key(user_id: Uuid) -> String {
        format!("cart_{user_id}")
    }

    pub fn load(&self, user_id: Uuid) -> Result<Cart, StorageError> {
        match self.storage.get(&Self::key(user_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Cart::new()),
        }
    }

    fn save(&self, user_id: Uuid, cart: &Cart) -> Result<(), StorageError> {
        self.storage.set(&Self::key(user_id), &serde_json::to_string(cart)?)
    }

    fn modify(&self, user_id: Uuid, change: impl FnOnce(&mut Cart)) -> Result<Cart, StorageError> {
        let mut cart = self.load(user_id)?;
        change(&mut cart);
        self.save(user_id, &cart)?;
        Ok(cart)
    }

    pub fn add(&self, user_id: Uuid, line: CartLine) -> Result<Cart, StorageError> {
        self.modify(user_id, |cart| cart.add(line))
    }

    pub fn update_quantity(&self, user_id: Uuid, product_id: Uuid, length: &HairLength, color: &str, quantity: u32) -> Result<Cart, StorageError> {
        self.modify(user_id, |cart| cart.update_quantity(product_id, length, color, quantity))
    }

    pub fn remove(&self, user_id: Uuid, product_id: Uuid, length: &HairLength, color: &str) -> Result<Cart, StorageError> {
        self.modify(user_id, |cart| cart.remove(product_id, length, color))
    }

    pub fn clear(&self, user_id: Uuid) -> Result<(), StorageError> {
        self.storage.remove(&Self::key(user_id))
    }

    pub fn item_count(&self, user_id: Uuid) -> Result<u32, StorageError> {
        Ok(self.load(user_id)?.item_count())
    }

    pub fn summary(&self, user_id: Uuid) -> Result<CheckoutSummary, StorageError> {
        Ok(self.load(user_id)?.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{AccountStatus, Role, UserProfile};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn line(product_id: Uuid, length: &str, quantity: u32) -> CartLine {
        CartLine {
            product_id, name: "Kinky Straight".into(), image: None, seller_id: None,
            unit_price: Decimal::new(2000, 0), selected_length: length.into(), selected_color: "1B".into(), quantity,
        }
    }

    fn session() -> AuthSession {
        AuthSession {
            user: UserProfile {
                id: Uuid::new_v4(), first_name: "Sara".into(), last_name: "Mulugeta".into(), email: "sara@example.com".into(),
                roles: vec![Role::Buyer], status: AccountStatus::Active, store_name: None, phone: None, created_at: Utc::now(),
            },
            access_token: "token-123".into(),
        }
    }

    #[test]
    fn test_session_roundtrip_and_clear() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.token(), None);
        let s = session();
        store.save(&s).unwrap();
        assert_eq!(store.current().unwrap(), Some(s));
        assert_eq!(store.token().as_deref(), Some("token-123"));
        store.clear().unwrap();
        assert!(store.current().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_session_is_signed_out() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(SESSION_KEY, "{not json").unwrap();
        let store = SessionStore::new(storage);
        assert!(store.current().is_err());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_carts_are_keyed_by_user() {
        let carts = CartStore::new(Arc::new(MemoryStorage::new()));
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let product = Uuid::new_v4();
        carts.add(alice, line(product, "18", 1)).unwrap();
        carts.add(alice, line(product, "18", 2)).unwrap();
        carts.add(alice, line(product, "24", 1)).unwrap();
        assert_eq!(carts.load(alice).unwrap().lines().len(), 2);
        assert_eq!(carts.item_count(alice).unwrap(), 4);
        assert!(carts.load(bob).unwrap().is_empty());

        carts.update_quantity(alice, product, &"24".into(), "1B", 0).unwrap();
        assert_eq!(carts.item_count(alice).unwrap(), 4);
        carts.update_quantity(alice, product, &"24".into(), "1B", 2).unwrap();
        assert_eq!(carts.item_count(alice).unwrap(), 5);
        carts.update_quantity(alice, product, &"24".into(), "1B", 1).unwrap();
        assert_eq!(carts.item_count(alice).unwrap(), 4);
        carts.remove(alice, product, &"24".into(), "1B").unwrap();
        assert_eq!(carts.item_count(alice).unwrap(), 3);
        carts.clear(alice).unwrap();
        assert!(carts.load(alice).unwrap().is_empty());
    }

    #[test]
    fn test_file_storage_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();
        CartStore::new(Arc::new(FileStorage::open(dir.path()).unwrap())).add(user, line(Uuid::new_v4(), "22", 1)).unwrap();

        let reopened = CartStore::new(Arc::new(FileStorage::open(dir.path()).unwrap()));
        // 2000 + (22 - 20) * 500
        assert_eq!(reopened.summary(user).unwrap().subtotal.amount(), Decimal::new(3000, 0));

        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(matches!(storage.set("../escape", "x"), Err(StorageError::InvalidKey(_))));
        storage.remove("never-written").unwrap();
    }
}
