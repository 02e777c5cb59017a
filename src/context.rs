//! Explicit runtime context handed to every entity at construction.
//!
//! Holds the shared storage handle and wraps it with the persistence
//! failure policy: reads that fail are "no prior data", writes that fail
//! are logged and otherwise ignored.  In-memory state stays authoritative.

use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::app::ports::{StorageError, StoragePort};

/// Namespace for last sensor values.
pub const NS_SENSOR: &str = "sensor";
/// Namespace for last zone setpoints.
pub const NS_ZONE: &str = "zone";
/// Namespace for controller-wide values (enable flag).
pub const NS_CONTROLLER: &str = "controller";

/// Largest persisted blob this crate writes.
const MAX_VALUE_SIZE: usize = 64;

#[derive(Clone)]
pub struct Context {
    store: Arc<dyn StoragePort>,
}

impl Context {
    pub fn new(store: Arc<dyn StoragePort>) -> Self {
        Self { store }
    }

    /// Load a previously persisted value.  Absence and corruption both yield
    /// `None`; only corruption is worth a warning.
    pub fn restore<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let mut buf = [0u8; MAX_VALUE_SIZE];
        let len = match self.store.read(namespace, key, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => {
                debug!("Store: no prior value for {}/{}", namespace, key);
                return None;
            }
            Err(e) => {
                warn!("Store: read {}/{} failed: {}", namespace, key, e);
                return None;
            }
        };
        match postcard::from_bytes(&buf[..len]) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Store: {}/{} is corrupted, ignoring", namespace, key);
                None
            }
        }
    }

    /// Persist a value.  Returns whether the write landed.
    pub fn persist<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> bool {
        let bytes = match postcard::to_allocvec(value) {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!("Store: cannot encode {}/{}", namespace, key);
                return false;
            }
        };
        match self.store.write(namespace, key, &bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("Store: write {}/{} failed: {}", namespace, key, e);
                false
            }
        }
    }
}
