//! Connection tracking across live sessions.
//!
//! The store keeps two keyed maps of device-side connection handles: primary
//! control connections and pointer input sockets.  Both are keyed by the
//! television's `ip:port` pair, so a session's input socket survives across
//! button commands and every handle can be found again at teardown or
//! shutdown.
//!
//! The store is generic over the handle type.  The proxy stores shared
//! WebSocket sink handles; tests store plain values.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use tracing::debug;

/// Builds the store key for a television endpoint.
pub fn session_key(ip: Ipv4Addr, port: u16) -> String {
    format!("{ip}:{port}")
}

/// Keyed registry of device-side connection handles.
pub struct SessionStore<T> {
    primaries: Mutex<HashMap<String, T>>,
    inputs: Mutex<HashMap<String, T>>,
}

impl<T> Default for SessionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SessionStore<T> {
    pub fn new() -> Self {
        Self {
            primaries: Mutex::new(HashMap::new()),
            inputs: Mutex::new(HashMap::new()),
        }
    }

    /// Registers the primary control connection for `key`.
    pub fn insert_primary(&self, key: &str, handle: T) {
        debug!("store: primary registered for {key}");
        self.primaries
            .lock()
            .expect("session store poisoned")
            .insert(key.to_string(), handle);
    }

    /// Registers (or replaces) the input socket for `key`.
    pub fn insert_input(&self, key: &str, handle: T) {
        debug!("store: input socket registered for {key}");
        self.inputs
            .lock()
            .expect("session store poisoned")
            .insert(key.to_string(), handle);
    }

    /// Number of live primary connections.
    pub fn primary_count(&self) -> usize {
        self.primaries.lock().expect("session store poisoned").len()
    }

    /// Number of cached input sockets.
    pub fn input_count(&self) -> usize {
        self.inputs.lock().expect("session store poisoned").len()
    }

    /// Removes and returns the input socket for `key`, leaving the primary
    /// registered.  Used when a cached socket turns out to be dead.
    pub fn remove_input(&self, key: &str) -> Option<T> {
        let removed = self
            .inputs
            .lock()
            .expect("session store poisoned")
            .remove(key);
        if removed.is_some() {
            debug!("store: dropped stale input socket for {key}");
        }
        removed
    }

    /// Removes and returns both handles for `key`.
    ///
    /// Either slot may be empty: a session that never sent a button has no
    /// input socket, and a double teardown finds nothing at all.
    pub fn remove(&self, key: &str) -> (Option<T>, Option<T>) {
        let primary = self
            .primaries
            .lock()
            .expect("session store poisoned")
            .remove(key);
        let input = self
            .inputs
            .lock()
            .expect("session store poisoned")
            .remove(key);
        if primary.is_some() || input.is_some() {
            debug!("store: removed entries for {key}");
        }
        (primary, input)
    }

    /// Empties the store, returning every handle for caller-side closing.
    pub fn drain_all(&self) -> Vec<T> {
        let mut handles: Vec<T> = self
            .primaries
            .lock()
            .expect("session store poisoned")
            .drain()
            .map(|(_, h)| h)
            .collect();
        handles.extend(
            self.inputs
                .lock()
                .expect("session store poisoned")
                .drain()
                .map(|(_, h)| h),
        );
        handles
    }
}

impl<T: Clone> SessionStore<T> {
    /// Returns the cached input socket for `key`, if any.
    pub fn input_socket(&self, key: &str) -> Option<T> {
        self.inputs
            .lock()
            .expect("session store poisoned")
            .get(key)
            .cloned()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
