use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A logged-in user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub user_name: String,
    pub token: String,
}

/// On-disk copy of the current session, so a restart stays logged in.
#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/schedule-tui/session.toml`
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|d| Self::new(d.join("schedule-tui").join("session.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An unreadable or malformed file counts as "no session".
    pub fn load(&self) -> Option<Session> {
        let content = fs::read_to_string(&self.path).ok()?;
        match toml::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed session cache");
                None
            }
        }
    }

    pub fn store(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(session)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "session cached");
        Ok(())
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(name: &str) -> SessionCache {
        let dir = std::env::temp_dir()
            .join(format!("schedule-tui-{}-{}", name, std::process::id()));
        SessionCache::new(dir.join("session.toml"))
    }

    #[test]
    fn store_load_clear() {
        let cache = temp_cache("roundtrip");
        let session = Session {
            user_id: "u1".into(),
            user_name: "alice".into(),
            token: "tok".into(),
        };

        assert_eq!(cache.load(), None);
        cache.store(&session).unwrap();
        assert_eq!(cache.load(), Some(session));
        cache.clear().unwrap();
        assert_eq!(cache.load(), None);
        cache.clear().unwrap();
    }

    #[test]
    fn malformed_file_is_ignored() {
        let cache = temp_cache("malformed");
        fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        fs::write(cache.path(), "not = [valid").unwrap();
        assert_eq!(cache.load(), None);
        cache.clear().unwrap();
    }
}
