//! In-process cache of database connections
//!
//! One connection per distinct [`HostSpec`], created on first use and kept for
//! as long as the cache lives. There is no expiry, health check or eviction: a
//! broken cached connection surfaces as a failure of the next operation on it
//! and is not reconnected automatically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::{Error, Result};
use crate::host::HostSpec;
use crate::store::{Connector, DocumentStore};

/// Connection cache keyed by literal host spec
pub struct ConnectionCache {
    connector: Box<dyn Connector>,
    connections: Mutex<HashMap<HostSpec, Arc<dyn DocumentStore>>>,
}

impl ConnectionCache {
    /// Create an empty cache that opens connections with `connector`
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached connection for `host`, or connect and cache it.
    ///
    /// The lookup and the insert happen under one lock, so concurrent callers
    /// never open two connections for the same spec.
    pub fn get_connection(&self, host: &HostSpec) -> Result<Arc<dyn DocumentStore>> {
        let mut connections = self.connections.lock().map_err(|_| Error::LockPoisoned {
            context: "connection cache".to_string(),
        })?;

        if let Some(store) = connections.get(host) {
            return Ok(Arc::clone(store));
        }

        debug!("connecting to {}", host);
        let store = self.connector.connect(host)?;
        connections.insert(host.clone(), Arc::clone(&store));
        Ok(store)
    }

    /// Check if a host already has a cached connection
    pub fn contains(&self, host: &HostSpec) -> Result<bool> {
        let connections = self.connections.lock().map_err(|_| Error::LockPoisoned {
            context: "connection cache".to_string(),
        })?;
        Ok(connections.contains_key(host))
    }

    /// Get the number of cached connections
    pub fn len(&self) -> Result<usize> {
        let connections = self.connections.lock().map_err(|_| Error::LockPoisoned {
            context: "connection cache".to_string(),
        })?;
        Ok(connections.len())
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
