//! services/client/src/adapters/storage.rs
//!
//! File-backed `SessionStore`: the bearer token lives in a single file inside the session
//! directory. A missing or unreadable file means "logged out".

use researchmate_core::domain::Credential;
use researchmate_core::ports::SessionStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Name of the file holding the token.
pub const TOKEN_FILE: &str = "access_token";

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(session_dir: impl AsRef<Path>) -> Self {
        Self {
            path: session_dir.as_ref().join(TOKEN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Credential> {
        let token = fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Credential::new(token))
    }

    fn set(&self, credential: Credential) {
        if let Some(dir) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!(path = %dir.display(), "Could not create session directory: {}", e);
                return;
            }
        }
        if let Err(e) = fs::write(&self.path, credential.as_str()) {
            warn!(path = %self.path.display(), "Could not persist credential: {}", e);
            return;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)) {
                warn!(path = %self.path.display(), "Could not restrict credential file: {}", e);
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Could not remove credential: {}", e),
        }
    }
}
