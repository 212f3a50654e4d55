//! Process-wide registration ids
//!
//! An id is handed to the platform when binding and names the listener's
//! window class, so it must be unique across every manager in the process.
//! A lease is held until the listener has released its resources; only then
//! can the id be handed out again.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{HotKeyError, HotKeyResult};

/// First id handed out, and where the counter restarts after wrapping
const FIRST_ID: i32 = 1;

/// Upper bound (exclusive) for registration ids; the platform reserves the rest
const REGISTRATION_ID_LIMIT: i32 = 0xC000;

static POOL: Mutex<IdPool> = Mutex::new(IdPool::new());

struct IdPool {
    next: i32,
    leased: BTreeSet<i32>,
}

impl IdPool {
    const fn new() -> Self {
        Self {
            next: FIRST_ID,
            leased: BTreeSet::new(),
        }
    }

    /// Next id not currently leased, wrapping below the limit
    fn lease(&mut self) -> Option<i32> {
        if self.leased.len() >= (REGISTRATION_ID_LIMIT - FIRST_ID) as usize {
            return None;
        }
        loop {
            let id = self.next;
            self.next = if id + 1 >= REGISTRATION_ID_LIMIT {
                FIRST_ID
            } else {
                id + 1
            };
            if self.leased.insert(id) {
                return Some(id);
            }
        }
    }

    fn release(&mut self, id: i32) {
        self.leased.remove(&id);
    }
}

fn pool() -> MutexGuard<'static, IdPool> {
    POOL.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) fn is_leased(id: i32) -> bool {
    pool().leased.contains(&id)
}

/// A registration id leased from the process-wide pool, returned on drop
#[derive(Debug, PartialEq, Eq)]
pub struct RegistrationId(i32);

impl RegistrationId {
    pub fn lease() -> HotKeyResult<Self> {
        pool()
            .lease()
            .map(Self)
            .ok_or(HotKeyError::RegistrationIdsExhausted)
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

impl Drop for RegistrationId {
    fn drop(&mut self) {
        pool().release(self.0);
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
