//! Device key lookup.
//!
//! Every forwarded event carries the pre-shared key of the node it came
//! from. Nodes without a key are never forwarded.

use std::collections::HashMap;

use loragate_core::{DeviceKey, Error, Result};
use loragate_protocol::Event;

/// Immutable mapping from node id to device key.
///
/// Built once at startup; lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct DeviceKeyTable {
    keys: HashMap<i64, DeviceKey>,
}

impl DeviceKeyTable {
    /// Build a table from `(node_id, key)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a node id appears twice.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i64, DeviceKey)>,
    {
        let mut keys = HashMap::new();
        for (node_id, key) in entries {
            if keys.insert(node_id, key).is_some() {
                return Err(Error::Config(format!(
                    "duplicate device key for node {node_id}"
                )));
            }
        }
        Ok(Self { keys })
    }

    pub fn lookup(&self, node_id: i64) -> Option<&DeviceKey> {
        self.keys.get(&node_id)
    }

    /// Resolve the key for an event's node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnauthenticatedDevice`] if the node has no key.
    pub fn authenticate(&self, event: &Event) -> Result<DeviceKey> {
        self.lookup(event.node_id())
            .cloned()
            .ok_or(Error::UnauthenticatedDevice {
                node_id: event.node_id(),
            })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Configured node ids, ascending.
    pub fn node_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.keys.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
