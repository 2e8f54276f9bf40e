//! In-memory option store for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;
use crate::store::{OptionStore, StoreError};
use crate::tracker::DbError;

/// In-memory implementation of the OptionStore trait.
///
/// Can simulate writes that have not landed yet (`drop_writes`) and an
/// unreachable store (`fail_all`).
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    drop_writes: Mutex<bool>,
    fail_all: Mutex<bool>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept writes without making them visible to later reads.
    pub fn drop_writes(&self, enabled: bool) {
        *lock(&self.drop_writes) = enabled;
    }

    /// Fail every read and write.
    pub fn fail_all(&self, enabled: bool) {
        *lock(&self.fail_all) = enabled;
    }

    /// Every `set_option` call, including dropped ones.
    pub fn recorded_writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if *lock(&self.fail_all) {
            return Err(StoreError::Database(DbError::new(None, "option store unavailable")));
        }
        Ok(())
    }
}

impl OptionStore for MemoryOptionStore {
    fn get_option(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(lock(&self.values).get(name).cloned())
    }

    fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        lock(&self.writes).push((name.to_string(), value.to_string()));
        if !*lock(&self.drop_writes) {
            lock(&self.values).insert(name.to_string(), value.to_string());
        }
        Ok(())
    }
}
