//! JSON ledger file: known users with their access status, and reservations.

use std::path::Path;

use anyhow::{Context, Result};
use laundry_engine::{AccessRegistry, AccessStatus, InMemoryStore, Reservation, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: UserId,
    #[serde(default)]
    pub access: AccessStatus,
}

impl Ledger {
    /// Read the ledger at `path`. A missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no ledger yet, starting empty");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ledger: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse ledger: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write ledger: {}", path.display()))
    }

    pub fn into_parts(self) -> Result<(InMemoryStore, AccessRegistry)> {
        let registry = AccessRegistry::new();
        for user in self.users {
            registry.set_status(user.id, user.access);
        }
        let store = InMemoryStore::restore(self.reservations)
            .context("Ledger contains overlapping reservations")?;
        Ok((store, registry))
    }

    pub fn from_parts(store: &InMemoryStore, registry: &AccessRegistry) -> Self {
        Self {
            users: registry
                .snapshot()
                .into_iter()
                .map(|(id, access)| UserEntry { id, access })
                .collect(),
            reservations: store.snapshot(),
        }
    }
}
