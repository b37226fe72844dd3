//! Persistent storage using RocksDB.
//!
//! Keys:
//! - `entrant:{id}` - JSON-encoded [`Entrant`]
//! - `email:{normalized email}` - owning entrant id (uniqueness index)
//!
//! Multi-key writes go through a single `WriteBatch`, so a batch either
//! lands completely or not at all.

use crate::error::{Error, Result};
use plotline_core::{normalize_email, ordered, Entrant, EntrantId, PositionUpdate, Profile};
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const ENTRANT_PREFIX: &str = "entrant:";
const EMAIL_PREFIX: &str = "email:";

/// Storage backend for waitlist data.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    /// All entrants in waitlist order.
    pub fn list_entrants(&self) -> Result<Vec<Entrant>> {
        let prefix = ENTRANT_PREFIX.as_bytes();
        let mut entrants = Vec::new();

        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(prefix) {
                let entrant: Entrant = serde_json::from_slice(&value)?;
                entrants.push(entrant);
            } else {
                break;
            }
        }

        Ok(ordered(&entrants).into_iter().cloned().collect())
    }

    /// Number of entrants.
    pub fn count_entrants(&self) -> Result<usize> {
        let prefix = ENTRANT_PREFIX.as_bytes();
        let mut count = 0;
        for item in self.db.prefix_iterator(prefix) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Get an entrant by ID.
    pub fn get_entrant(&self, id: &EntrantId) -> Result<Option<Entrant>> {
        match self.db.get(entrant_key(id))? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Insert a new entrant at `line_position`.
    ///
    /// Fails with [`Error::Conflict`] if the email is already on the list.
    pub fn insert_entrant(&self, profile: Profile, line_position: u32) -> Result<Entrant> {
        let email_key = email_key(&profile.email);
        if self.db.get(&email_key)?.is_some() {
            return Err(Error::Conflict(format!(
                "email already signed up: {}",
                profile.email.trim()
            )));
        }

        let now = now_millis();
        let id = EntrantId::generate(&profile.email, now);
        let entrant = Entrant::new(id, profile, line_position, now);

        let mut batch = WriteBatch::default();
        batch.put(entrant_key(&entrant.id), serde_json::to_vec(&entrant)?);
        batch.put(email_key, entrant.id.as_str().as_bytes());
        self.db.write(batch)?;

        Ok(entrant)
    }

    /// Replace an entrant's profile. Position is untouched.
    pub fn update_profile(&self, id: &EntrantId, profile: Profile) -> Result<Entrant> {
        let mut entrant = self
            .get_entrant(id)?
            .ok_or_else(|| Error::NotFound(format!("entrant {}", id)))?;

        let mut batch = WriteBatch::default();
        let old_key = email_key(&entrant.profile.email);
        let new_key = email_key(&profile.email);
        if old_key != new_key {
            if let Some(owner) = self.db.get(&new_key)? {
                if owner.as_slice() != id.as_str().as_bytes() {
                    return Err(Error::Conflict(format!(
                        "email already signed up: {}",
                        profile.email.trim()
                    )));
                }
            }
            batch.delete(old_key);
            batch.put(new_key, id.as_str().as_bytes());
        }

        entrant.profile = profile;
        entrant.updated_at = now_millis();
        batch.put(entrant_key(id), serde_json::to_vec(&entrant)?);
        self.db.write(batch)?;

        Ok(entrant)
    }

    /// Apply position updates atomically.
    ///
    /// Every id must exist; otherwise nothing is written.
    pub fn apply_positions(&self, updates: &[PositionUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let now = now_millis();
        let mut batch = WriteBatch::default();
        for update in updates {
            let mut entrant = self
                .get_entrant(&update.id)?
                .ok_or_else(|| Error::NotFound(format!("entrant {}", update.id)))?;
            entrant.line_position = update.line_position;
            entrant.updated_at = now;
            batch.put(entrant_key(&update.id), serde_json::to_vec(&entrant)?);
        }
        self.db.write(batch)?;

        Ok(())
    }

    /// Delete an entrant. Remaining positions are not renumbered.
    pub fn delete_entrant(&self, id: &EntrantId) -> Result<Entrant> {
        let entrant = self
            .get_entrant(id)?
            .ok_or_else(|| Error::NotFound(format!("entrant {}", id)))?;

        let mut batch = WriteBatch::default();
        batch.delete(entrant_key(id));
        batch.delete(email_key(&entrant.profile.email));
        self.db.write(batch)?;

        Ok(entrant)
    }
}

fn entrant_key(id: &EntrantId) -> Vec<u8> {
    format!("{}{}", ENTRANT_PREFIX, id).into_bytes()
}

fn email_key(email: &str) -> Vec<u8> {
    format!("{}{}", EMAIL_PREFIX, normalize_email(email)).into_bytes()
}

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
