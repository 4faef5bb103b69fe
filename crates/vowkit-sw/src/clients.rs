//! Controlled window clients.
//!
//! The router claims clients at activation and routes notification
//! clicks to an existing same-origin window when one is open.

use hashbrown::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use url::Url;

use crate::SwError;

/// A window client (an open page).
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Current URL.
    pub url: Url,

    /// Whether focused.
    pub focused: bool,

    /// Whether controlled by the active router.
    pub controlled: bool,
}

/// Registry of open window clients.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Register an open page (not yet controlled).
    pub fn add(&mut self, url: Url) -> String {
        let id = format!("client-{}", client_id());
        self.clients.insert(
            id.clone(),
            Client {
                id: id.clone(),
                url,
                focused: false,
                controlled: false,
            },
        );
        id
    }

    /// Remove a client (page closed).
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    /// Take control of all clients, so in-flight pages use the new
    /// router without a reload.
    pub fn claim(&mut self) {
        for client in self.clients.values_mut() {
            client.controlled = true;
        }
        debug!(count = self.clients.len(), "Claimed clients");
    }

    /// Find an open window on the given origin.
    pub fn find_same_origin(&self, url: &Url) -> Option<&Client> {
        self.clients
            .values()
            .find(|c| c.url.origin() == url.origin())
    }

    /// Navigate an existing client and bring it to the front.
    pub fn focus_and_navigate(&mut self, id: &str, url: Url) -> Result<(), SwError> {
        let client = self
            .clients
            .get_mut(id)
            .ok_or_else(|| SwError::Client(format!("No such client: {}", id)))?;

        client.url = url;
        client.focused = true;
        for (other_id, other) in self.clients.iter_mut() {
            if other_id != id {
                other.focused = false;
            }
        }
        Ok(())
    }

    /// Open a new window at the given URL.
    pub fn open_window(&mut self, url: Url) -> Client {
        let id = format!("client-{}", client_id());
        let client = Client {
            id: id.clone(),
            url,
            focused: true,
            controlled: true,
        };
        self.clients.insert(id, client.clone());
        client
    }

    /// Number of open clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn client_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
