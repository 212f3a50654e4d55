//! Id → registration table
//!
//! The manager owns every registration context. An id is reserved in the
//! table before its listener starts, so a concurrent add of the same id is
//! refused, and the lock is not held while the caller waits for the
//! listener to report.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{HotKeyError, HotKeyResult};
use crate::events::{HotKeyEvent, HotKeyHandler};
use crate::hotkey::{HotKey, KeyCode, Modifiers};
use crate::platform::Platform;
use crate::registration::{RegistrationContext, RegistrationId, TeardownReport};

/// Manager configuration
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// How long `add_hot_key` waits for the listener to report
    pub register_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            register_timeout: Duration::from_secs(5),
        }
    }
}

struct Table<P: Platform> {
    entries: HashMap<String, RegistrationContext<P>>,
    /// Ids whose registration is in flight
    pending: HashSet<String>,
}

/// Registry of active hot keys, at most one per id
///
/// Dropping the manager asks every listener to unregister without waiting;
/// call [`HotKeyManager::shutdown`] to wait for teardown to finish.
pub struct HotKeyManager<P: Platform> {
    platform: Arc<P>,
    config: ManagerConfig,
    table: Mutex<Table<P>>,
}

impl<P: Platform> HotKeyManager<P> {
    /// Create a manager with the default configuration
    pub fn new(platform: Arc<P>) -> Self {
        Self::with_config(platform, ManagerConfig::default())
    }

    pub fn with_config(platform: Arc<P>, config: ManagerConfig) -> Self {
        Self {
            platform,
            config,
            table: Mutex::new(Table {
                entries: HashMap::new(),
                pending: HashSet::new(),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    fn lock(&self) -> MutexGuard<'_, Table<P>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a hot key, surfacing platform failures as errors
    ///
    /// Blocks until the listener reports. Nothing is left in the table when
    /// registration fails. Other calls on the manager are not blocked while
    /// waiting; the id only becomes visible once registration succeeded.
    pub fn try_add_hot_key<F>(&self, hot_key: HotKey, handler: F) -> HotKeyResult<()>
    where
        F: Fn(&HotKeyEvent) + Send + Sync + 'static,
    {
        if hot_key.id().is_empty() {
            return Err(HotKeyError::EmptyId);
        }

        let id = hot_key.id().to_string();
        {
            let mut table = self.lock();
            if table.entries.contains_key(&id) || table.pending.contains(&id) {
                warn!(id = %id, "hot key id already registered");
                return Err(HotKeyError::DuplicateId(id));
            }
            table.pending.insert(id.clone());
        }

        let outcome = self.register(hot_key, Arc::new(handler));

        let mut table = self.lock();
        table.pending.remove(&id);
        table.entries.insert(id, outcome?);
        Ok(())
    }

    fn register(
        &self,
        hot_key: HotKey,
        handler: HotKeyHandler,
    ) -> HotKeyResult<RegistrationContext<P>> {
        let registration_id = RegistrationId::lease()?;
        let mut context =
            RegistrationContext::new(Arc::clone(&self.platform), hot_key, handler, registration_id);
        context.register(self.config.register_timeout)?;
        Ok(context)
    }

    /// Register a hot key
    ///
    /// Returns `Ok(false)` if the platform refused (most often because the
    /// combination is already taken), `Err(DuplicateId)` if the id is in use.
    pub fn add_hot_key<F>(&self, hot_key: HotKey, handler: F) -> HotKeyResult<bool>
    where
        F: Fn(&HotKeyEvent) + Send + Sync + 'static,
    {
        match self.try_add_hot_key(hot_key, handler) {
            Ok(()) => Ok(true),
            Err(HotKeyError::Platform(e)) => {
                debug!(error = %e, "registration refused by platform");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Register `modifiers` + `key_code` under `id`
    pub fn add<F>(
        &self,
        id: impl Into<String>,
        modifiers: Modifiers,
        key_code: KeyCode,
        handler: F,
    ) -> HotKeyResult<bool>
    where
        F: Fn(&HotKeyEvent) + Send + Sync + 'static,
    {
        self.add_hot_key(HotKey::new(id, modifiers, key_code), handler)
    }

    /// Remove the hot key with the given id; no-op if absent
    ///
    /// Teardown finishes on the listener thread after this returns.
    pub fn remove_hot_key(&self, id: &str) {
        let context = self.lock().entries.remove(id);
        if let Some(mut context) = context {
            info!(id, "removing hot key");
            let _ = context.unregister();
        }
    }

    /// Remove the given hot key; no-op if absent
    pub fn remove(&self, hot_key: &HotKey) {
        self.remove_hot_key(hot_key.id());
    }

    /// Remove the hot key with the given id and wait for its teardown
    ///
    /// Returns `None` if the id was absent, the listener could not be
    /// signalled, or this is called from that hot key's own handler (the
    /// listener cannot wait for itself; teardown then completes after the
    /// handler returns).
    pub fn remove_hot_key_and_wait(&self, id: &str) -> Option<TeardownReport> {
        let mut context = self.lock().entries.remove(id)?;
        info!(id, "removing hot key");
        let handle = context.unregister()?;
        join_listener(id, handle)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Ids of all registered hot keys, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The registered hot key with the given id
    pub fn get(&self, id: &str) -> Option<HotKey> {
        self.lock().entries.get(id).map(|c| c.hot_key().clone())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister every hot key and wait for all listeners to finish
    pub fn shutdown(&self) -> Vec<TeardownReport> {
        let contexts: Vec<(String, RegistrationContext<P>)> = self.lock().entries.drain().collect();
        if contexts.is_empty() {
            return Vec::new();
        }
        info!(count = contexts.len(), "shutting down hot key manager");

        let handles: Vec<(String, JoinHandle<TeardownReport>)> = contexts
            .into_iter()
            .filter_map(|(id, mut context)| context.unregister().map(|handle| (id, handle)))
            .collect();

        handles
            .into_iter()
            .filter_map(|(id, handle)| join_listener(&id, handle))
            .collect()
    }
}

fn join_listener(id: &str, handle: JoinHandle<TeardownReport>) -> Option<TeardownReport> {
    if handle.thread().id() == thread::current().id() {
        debug!(id, "not waiting for own listener");
        return None;
    }
    match handle.join() {
        Ok(report) => Some(report),
        Err(_) => {
            error!(id, "listener thread panicked during teardown");
            None
        }
    }
}
