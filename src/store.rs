use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::OtpError;

/// Single-slot persistence for the shared secret.
///
/// The scheduler reads the slot once at startup and writes it on every
/// successful derivation; implementations never see partial updates.
pub trait SecretStore: Send {
    /// The previously saved secret, if any
    fn load(&self) -> Option<String>;

    /// Replaces the saved secret
    fn save(&mut self, secret: &str) -> Result<(), OtpError>;
}

/// Stores the secret as a plain file.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretStore for FileSecretStore {
    fn load(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let secret = contents.trim();

        if secret.is_empty() {
            None
        } else {
            Some(secret.to_string())
        }
    }

    fn save(&mut self, secret: &str) -> Result<(), OtpError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(OtpError::SecretStore)?;
        }

        fs::write(&self.path, secret).map_err(OtpError::SecretStore)?;
        debug!(path = %self.path.display(), "secret persisted");

        Ok(())
    }
}

/// In-memory slot for tests and demos. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemorySecretStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl SecretStore for MemorySecretStore {
    fn load(&self) -> Option<String> {
        self.slot.lock().expect("store lock poisoned").clone()
    }

    fn save(&mut self, secret: &str) -> Result<(), OtpError> {
        *self.slot.lock().expect("store lock poisoned") = Some(secret.to_string());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{FileSecretStore, MemorySecretStore, SecretStore};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("otpwatch-store-{}-{name}", std::process::id()))
    }

    #[rstest]
    fn file_store_roundtrip() {
        let path = temp_path("roundtrip");
        let mut store = FileSecretStore::new(&path);

        store.save("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(Some("JBSWY3DPEHPK3PXP".to_string()), store.load());

        let _ = std::fs::remove_file(path);
    }

    #[rstest]
    fn file_store_missing_file_is_empty() {
        let store = FileSecretStore::new(temp_path("missing"));

        assert_eq!(None, store.load());
    }

    #[rstest]
    fn file_store_trims_whitespace() {
        let path = temp_path("trim");
        std::fs::write(&path, "  JBSWY3DPEHPK3PXP\n").unwrap();
        let store = FileSecretStore::new(&path);

        assert_eq!(Some("JBSWY3DPEHPK3PXP".to_string()), store.load());

        let _ = std::fs::remove_file(path);
    }

    #[rstest]
    fn file_store_blank_file_is_empty() {
        let path = temp_path("blank");
        std::fs::write(&path, "\n").unwrap();
        let store = FileSecretStore::new(&path);

        assert_eq!(None, store.load());

        let _ = std::fs::remove_file(path);
    }

    #[rstest]
    fn file_store_creates_parent_directories() {
        let dir = temp_path("nested-dir");
        let path = dir.join("slot");
        let mut store = FileSecretStore::new(&path);

        store.save("SECRET2").unwrap();
        assert_eq!(Some("SECRET2".to_string()), store.load());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[rstest]
    fn memory_store_clones_share_the_slot() {
        let mut store = MemorySecretStore::default();
        let observer = store.clone();

        assert_eq!(None, observer.load());
        store.save("SECRET2").unwrap();
        assert_eq!(Some("SECRET2".to_string()), observer.load());
    }
}
