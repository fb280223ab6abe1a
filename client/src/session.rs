//! Durable client-side storage: the handful of keys that must survive a
//! restart (or, in the original deployment, a full-page redirect) — auth
//! token, identity, the pending-checkout blob, and the dark-mode flag.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use devlink_common::identity::{Role, UserId};
use devlink_common::payment::PendingCheckout;

pub const KEY_TOKEN: &str = "devlink_token";
pub const KEY_USER_ID: &str = "devlink_user_id";
pub const KEY_USERNAME: &str = "devlink_username";
pub const KEY_ROLE: &str = "devlink_role";
pub const KEY_PENDING_CHECKOUT: &str = "devlink_pending_checkout";
pub const KEY_DARK_MODE: &str = "devlink_dark_mode";

/// String key/value storage that outlives the process.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// The signed-in identity restored from storage on startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

pub fn load_auth(store: &impl SessionStore) -> Option<AuthSession> {
    Some(AuthSession {
        token: store.get(KEY_TOKEN)?,
        user_id: UserId(store.get(KEY_USER_ID)?),
        username: store.get(KEY_USERNAME)?,
        role: Role::parse(&store.get(KEY_ROLE)?)?,
    })
}

pub fn save_auth(store: &mut impl SessionStore, auth: &AuthSession) -> io::Result<()> {
    store.set(KEY_TOKEN, &auth.token)?;
    store.set(KEY_USER_ID, auth.user_id.as_str())?;
    store.set(KEY_USERNAME, &auth.username)?;
    store.set(KEY_ROLE, auth.role.as_str())
}

pub fn clear_auth(store: &mut impl SessionStore) -> io::Result<()> {
    store.remove(KEY_TOKEN)?;
    store.remove(KEY_USER_ID)?;
    store.remove(KEY_USERNAME)?;
    store.remove(KEY_ROLE)
}

/// Pending-checkout blob, or None if absent or unreadable (a corrupt blob
/// is logged and treated as absent, never thrown).
pub fn load_pending_checkout(store: &impl SessionStore) -> Option<PendingCheckout> {
    let raw = store.get(KEY_PENDING_CHECKOUT)?;
    match serde_json::from_str(&raw) {
        Ok(pending) => Some(pending),
        Err(e) => {
            tracing::warn!("discarding unreadable pending-checkout blob: {e}");
            None
        }
    }
}

pub fn save_pending_checkout(
    store: &mut impl SessionStore,
    pending: &PendingCheckout,
) -> io::Result<()> {
    let raw = serde_json::to_string(pending).expect("pending checkout serializes");
    store.set(KEY_PENDING_CHECKOUT, &raw)
}

pub fn clear_pending_checkout(store: &mut impl SessionStore) -> io::Result<()> {
    store.remove(KEY_PENDING_CHECKOUT)
}

pub fn dark_mode(store: &impl SessionStore) -> bool {
    store.get(KEY_DARK_MODE).as_deref() == Some("true")
}

pub fn set_dark_mode(store: &mut impl SessionStore, on: bool) -> io::Result<()> {
    store.set(KEY_DARK_MODE, if on { "true" } else { "false" })
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: BTreeMap<String, String>,
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON-file-backed storage under the platform data directory.
///
/// The whole map is rewritten on every change; the file is small (a few
/// short keys) and the write goes through a temp file + rename so a crash
/// never leaves a half-written session.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSession {
    /// Open the default session file, creating its directory if needed.
    pub fn open() -> io::Result<FileSession> {
        let dir = dirs::data_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no platform data dir"))?
            .join("devlink");
        fs::create_dir_all(&dir)?;
        Self::open_at(dir.join("session.json"))
    }

    /// Open a session file at an explicit path.
    pub fn open_at(path: PathBuf) -> io::Result<FileSession> {
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("session file unreadable, starting fresh: {e}");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        Ok(FileSession { path, values })
    }

    fn persist(&self) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(&self.values).expect("string map serializes");
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)
    }
}

impl SessionStore for FileSession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
