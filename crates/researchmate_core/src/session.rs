//! crates/researchmate_core/src/session.rs
//!
//! In-memory `SessionStore`. Used by tests and by front ends that do not persist the
//! credential between runs.

use crate::domain::Credential;
use crate::ports::SessionStore;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credential: RwLock<Option<Credential>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Credential> {
        match self.credential.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, credential: Credential) {
        let mut guard = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(credential);
    }

    fn clear(&self) {
        let mut guard = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    fn clear_if(&self, credential: &Credential) -> bool {
        let mut guard = self.credential.write().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref() == Some(credential) {
            *guard = None;
            true
        } else {
            false
        }
    }
}
