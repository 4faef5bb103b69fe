//! # Vowkit SW
//!
//! Offline-first cache router for the vowkit wedding-planner PWA.
//!
//! ## Features
//!
//! - **Lifecycle**: install (all-or-nothing shell precache), activate
//!   (version prune + client claim)
//! - **Strategy dispatch**: cache-first for static assets, network-first
//!   for pages, network-first with a structured offline fallback for API
//!   calls, untouched passthrough for everything else
//! - **Cache generations**: versioned named stores, pruned atomically at
//!   activation
//! - **Push notifications**: payload parsing, display, click routing
//!
//! ## Architecture
//!
//! ```text
//! CacheRouter
//!     ├── RouteTable        (static / page / api allow-lists)
//!     ├── CacheStorage      (static-vN, dynamic-vN, api-vN generations)
//!     ├── Clients           (controlled windows, claim / focus / open)
//!     └── dyn Fetcher       (the only path to the network)
//! ```

use thiserror::Error;

pub mod cache;
pub mod clients;
pub mod push;
pub mod router;
pub mod routes;

pub use cache::{Cache, CacheClass, CachedEntry, CacheStorage};
pub use clients::{Client, Clients};
pub use push::{Notification, NotificationAction, PushData, PushMessage};
pub use router::{CacheRouter, ClickOutcome, RouterConfig, RouterEvent, RouterState};
pub use routes::{RouteClass, RouteTable};

/// Errors that can occur in the cache router.
#[derive(Error, Debug)]
pub enum SwError {
    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(#[from] vowkit_net::FetchError),
}
