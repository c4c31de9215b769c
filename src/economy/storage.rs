use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use sled::IVec;

use crate::economy::errors::EconomyError;
use crate::economy::types::{EconomyRecord, ECONOMY_SCHEMA_VERSION};

const TREE_ECONOMY: &str = "economy";
const USERS_PREFIX: &[u8] = b"users:";

/// Outcome of a mutation closure passed to [`EconomyStore::update`].
///
/// `Commit` writes the mutated record back; `Abort` discards any changes the
/// closure made. Both carry the value handed back to the caller.
#[derive(Debug)]
pub enum Mutation<T> {
    Commit(T),
    Abort(T),
}

/// Sled-backed persistence for per-user economy records.
///
/// Every mutating call is a single-document compare-and-swap; there is no
/// in-process lock around records.
#[derive(Clone)]
pub struct EconomyStore {
    _db: sled::Db,
    records: sled::Tree,
}

impl EconomyStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EconomyError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let records = db.open_tree(TREE_ECONOMY)?;
        Ok(Self { _db: db, records })
    }

    fn record_key(user_id: &str) -> Vec<u8> {
        format!("users:{}", user_id).into_bytes()
    }

    fn serialize(record: &EconomyRecord) -> Result<Vec<u8>, EconomyError> {
        Ok(bincode::serialize(record)?)
    }

    fn deserialize(bytes: &IVec) -> Result<EconomyRecord, EconomyError> {
        let record: EconomyRecord = bincode::deserialize(bytes)?;
        if record.schema_version != ECONOMY_SCHEMA_VERSION {
            return Err(EconomyError::SchemaMismatch {
                entity: "economy_record",
                expected: ECONOMY_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Insert a fresh record if none exists (set-on-insert), then return the
    /// stored record. Losing the insert race to another caller is success.
    pub fn get_or_create(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<EconomyRecord, EconomyError> {
        let key = Self::record_key(user_id);
        let fresh = Self::serialize(&EconomyRecord::new(user_id, now))?;
        match self
            .records
            .compare_and_swap(&key, None as Option<&[u8]>, Some(fresh))?
        {
            Ok(()) => {
                self.records.flush()?;
                debug!("economy: created record for {}", user_id);
            }
            Err(_) => {
                // Already present: the record that won is authoritative.
            }
        }
        self.find(user_id)?
            .ok_or_else(|| EconomyError::NotFound(format!("economy record: {}", user_id)))
    }

    /// Fetch a record without creating it.
    pub fn find(&self, user_id: &str) -> Result<Option<EconomyRecord>, EconomyError> {
        let key = Self::record_key(user_id);
        match self.records.get(&key)? {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Unconditional write. Overwrites concurrent changes; prefer [`Self::update`].
    pub fn save(&self, mut record: EconomyRecord) -> Result<(), EconomyError> {
        record.schema_version = ECONOMY_SCHEMA_VERSION;
        let key = Self::record_key(&record.user_id);
        let bytes = Self::serialize(&record)?;
        self.records.insert(key, bytes)?;
        self.records.flush()?;
        Ok(())
    }

    /// Write `record` exactly as given, schema version included.
    #[cfg(test)]
    pub(crate) fn write_unchecked(&self, record: &EconomyRecord) -> Result<(), EconomyError> {
        let key = Self::record_key(&record.user_id);
        self.records.insert(key, Self::serialize(record)?)?;
        Ok(())
    }

    /// Atomically read, mutate and write back one record.
    ///
    /// The closure sees the latest stored state. When another writer changes
    /// the record between the read and the swap, the closure is re-run against
    /// the new state, so it must be free of side effects beyond the record.
    /// Returns `None` when the record does not exist.
    pub fn update<T, F>(
        &self,
        user_id: &str,
        mut mutate: F,
    ) -> Result<Option<(T, EconomyRecord)>, EconomyError>
    where
        F: FnMut(&mut EconomyRecord) -> Mutation<T>,
    {
        let key = Self::record_key(user_id);
        loop {
            let Some(current) = self.records.get(&key)? else {
                return Ok(None);
            };
            let mut record = Self::deserialize(&current)?;
            match mutate(&mut record) {
                Mutation::Abort(value) => {
                    // Hand back the stored state, not the discarded edits.
                    return Ok(Some((value, Self::deserialize(&current)?)));
                }
                Mutation::Commit(value) => {
                    let bytes = Self::serialize(&record)?;
                    match self
                        .records
                        .compare_and_swap(&key, Some(&current), Some(bytes))?
                    {
                        Ok(()) => {
                            self.records.flush()?;
                            return Ok(Some((value, record)));
                        }
                        Err(_) => {
                            debug!("economy: concurrent write on {}, re-evaluating", user_id);
                        }
                    }
                }
            }
        }
    }

    /// Conditional update: apply `mutate` only if `predicate` holds on the
    /// current state. Returns the updated record, or `None` when the record is
    /// missing or the predicate rejected it.
    pub fn update_if<P, F>(
        &self,
        user_id: &str,
        predicate: P,
        mut mutate: F,
    ) -> Result<Option<EconomyRecord>, EconomyError>
    where
        P: Fn(&EconomyRecord) -> bool,
        F: FnMut(&mut EconomyRecord),
    {
        let outcome = self.update(user_id, |record| {
            if predicate(record) {
                mutate(record);
                Mutation::Commit(true)
            } else {
                Mutation::Abort(false)
            }
        })?;
        Ok(match outcome {
            Some((true, record)) => Some(record),
            _ => None,
        })
    }

    /// Number of stored economy records.
    pub fn record_count(&self) -> Result<usize, EconomyError> {
        let mut count = 0usize;
        for entry in self.records.scan_prefix(USERS_PREFIX) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// List all user ids with a record.
    pub fn list_user_ids(&self) -> Result<Vec<String>, EconomyError> {
        let mut ids = Vec::new();
        for entry in self.records.scan_prefix(USERS_PREFIX) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(user_id) = text.strip_prefix("users:") {
                ids.push(user_id.to_string());
            }
        }
        Ok(ids)
    }
}
