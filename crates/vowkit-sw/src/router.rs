//! The cache router.
//!
//! Owns the generation lifecycle (install, activate, version prune),
//! dispatches every intercepted request to a caching strategy, and
//! displays and routes push notifications.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use vowkit_common::RetryPolicy;
use vowkit_net::{Fetcher, Request, Response};

use crate::cache::{entry_key, generation_name, CacheClass, CachedEntry, CacheStorage};
use crate::clients::Clients;
use crate::push::{self, Notification, PushMessage};
use crate::routes::{RouteClass, RouteTable, ROOT_PATH};
use crate::SwError;

/// Body of the synthesized degraded-mode API reply. Callers detect
/// offline mode by the `offline` flag and the 503 status, so this is a
/// wire contract, byte for byte.
const OFFLINE_BODY: &str =
    r#"{"success":false,"error":"offline — no data available","offline":true}"#;

/// Router lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Precaching the shell; not yet eligible to serve.
    Installing,
    /// Installed, waiting for activation.
    Waiting,
    /// Controlling pages.
    Active,
    /// Replaced by a newer version, or install failed.
    Superseded,
}

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Origin the app is served from; manifest paths and notification
    /// targets resolve against it.
    pub origin: Url,
    /// Cache name prefix.
    pub prefix: String,
    /// The single version constant all generation names derive from.
    pub version: String,
    /// Retry policy for install-time manifest fetches. Defaults to no
    /// retries, keeping install fail-fast.
    pub install_retry: RetryPolicy,
}

impl RouterConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            prefix: "vowkit".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            install_retry: RetryPolicy::once(),
        }
    }
}

/// Lifecycle and notification events for the embedding shell.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// Install finished; the static generation holds `entries` snapshots.
    Installed { entries: usize },
    /// Activation finished; `pruned` generations were deleted.
    Activated { pruned: Vec<String> },
    /// A notification was displayed (or replaced an earlier one).
    NotificationShown { tag: String, title: String },
    /// A notification was clicked; `target` is None for the close action.
    NotificationClicked { target: Option<Url> },
}

/// What a notification click resolved to.
#[derive(Debug, Clone)]
pub enum ClickOutcome {
    /// Close action: dismissed, no navigation.
    Closed,
    /// An existing window was navigated and focused.
    Focused { client_id: String, url: Url },
    /// A new window was opened.
    Opened { client_id: String, url: Url },
}

/// The request-interception engine.
pub struct CacheRouter {
    config: RouterConfig,
    routes: RouteTable,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<RwLock<CacheStorage>>,
    clients: Arc<RwLock<Clients>>,
    state: RwLock<RouterState>,
    displayed: RwLock<Option<Notification>>,
    event_tx: mpsc::UnboundedSender<RouterEvent>,
}

impl CacheRouter {
    /// Create a router for one version of the app over a fresh store.
    pub fn new(
        config: RouterConfig,
        routes: RouteTable,
        fetcher: Arc<dyn Fetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<RouterEvent>) {
        Self::with_storage(
            config,
            routes,
            fetcher,
            Arc::new(RwLock::new(CacheStorage::new())),
        )
    }

    /// Create a router over an existing store.
    ///
    /// Cache generations outlive any single router version. A new
    /// version must be handed the previous version's store, or its
    /// activation has nothing to prune and cached content from the old
    /// version is stranded.
    pub fn with_storage(
        config: RouterConfig,
        routes: RouteTable,
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<RwLock<CacheStorage>>,
    ) -> (Self, mpsc::UnboundedReceiver<RouterEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self {
                config,
                routes,
                fetcher,
                storage,
                clients: Arc::new(RwLock::new(Clients::new())),
                state: RwLock::new(RouterState::Installing),
                displayed: RwLock::new(None),
                event_tx,
            },
            event_rx,
        )
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> RouterState {
        *self.state.read().await
    }

    /// Shared cache storage, persisted across router versions.
    pub fn storage(&self) -> Arc<RwLock<CacheStorage>> {
        Arc::clone(&self.storage)
    }

    /// The window client registry.
    pub fn clients(&self) -> Arc<RwLock<Clients>> {
        Arc::clone(&self.clients)
    }

    /// Name of the current generation for a class.
    pub fn generation(&self, class: CacheClass) -> String {
        generation_name(&self.config.prefix, class, &self.config.version)
    }

    // ==================== Lifecycle ====================

    /// Precache the shell manifest into the static generation.
    ///
    /// All-or-nothing: any fetch failure or non-200 status aborts the
    /// install and leaves no partial static generation reachable, so a
    /// broken shell can never silently activate.
    pub async fn install(&self) -> Result<(), SwError> {
        {
            let state = self.state.read().await;
            if *state != RouterState::Installing {
                return Err(SwError::State(format!("Cannot install in state {:?}", *state)));
            }
        }

        info!(version = %self.config.version, entries = self.routes.manifest().len(), "Installing");

        // Stage every snapshot before writing any, so a failed install
        // leaves nothing behind.
        let mut staged = Vec::with_capacity(self.routes.manifest().len());
        for path in self.routes.manifest() {
            let url = self
                .config
                .origin
                .join(path)
                .map_err(|e| SwError::InvalidUrl(e.to_string()))?;
            let request = Request::get(url);

            let response = match self
                .config
                .install_retry
                .run(|| self.fetcher.fetch(&request))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    return self.fail_install(format!("{}: {}", path, e)).await;
                }
            };

            if response.status != StatusCode::OK {
                return self
                    .fail_install(format!("{} returned {}", path, response.status))
                    .await;
            }

            staged.push(CachedEntry::from_response(&request, &response));
        }

        let entries = staged.len();
        let name = self.generation(CacheClass::Static);
        {
            let mut storage = self.storage.write().await;
            let cache = storage.open(&name);
            for entry in staged {
                cache.put(entry);
            }
        }

        *self.state.write().await = RouterState::Waiting;
        info!(cache = %name, entries, "Install complete");
        let _ = self.event_tx.send(RouterEvent::Installed { entries });
        Ok(())
    }

    async fn fail_install(&self, reason: String) -> Result<(), SwError> {
        warn!(reason = %reason, "Install failed");
        *self.state.write().await = RouterState::Superseded;
        Err(SwError::InstallFailed(reason))
    }

    /// Prune stale generations and take control of all open pages.
    ///
    /// Every generation whose name is not among the three current
    /// version-qualified names is deleted; the current three are created
    /// empty if not yet populated. This is the only place generations
    /// are ever removed.
    pub async fn activate(&self) -> Result<Vec<String>, SwError> {
        {
            let state = self.state.read().await;
            if *state != RouterState::Waiting {
                return Err(SwError::State(format!("Cannot activate in state {:?}", *state)));
            }
        }

        let current: Vec<String> = CacheClass::ALL
            .iter()
            .map(|class| self.generation(*class))
            .collect();

        let mut pruned = Vec::new();
        {
            let mut storage = self.storage.write().await;
            for name in storage.keys() {
                if !current.contains(&name) {
                    storage.delete(&name);
                    pruned.push(name);
                }
            }
            for name in &current {
                storage.open(name);
            }
        }

        self.clients.write().await.claim();
        *self.state.write().await = RouterState::Active;

        info!(version = %self.config.version, pruned = pruned.len(), "Activated");
        let _ = self.event_tx.send(RouterEvent::Activated {
            pruned: pruned.clone(),
        });
        Ok(pruned)
    }

    /// Bypass the waiting step. Explicit caller opt-in for a new version
    /// to take over immediately after a successful install.
    pub async fn skip_waiting(&self) -> Result<Vec<String>, SwError> {
        self.activate().await
    }

    /// Mark this router as replaced by a newer version.
    pub async fn supersede(&self) {
        *self.state.write().await = RouterState::Superseded;
    }

    // ==================== Request handling ====================

    /// Handle one intercepted request.
    ///
    /// Network failures are recovered per strategy where a fallback
    /// exists and propagate otherwise. Any internal fault degrades to a
    /// plain uncached passthrough for this one request instead of
    /// failing the page load.
    pub async fn handle(&self, request: Request) -> Result<Response, SwError> {
        let class = self.routes.classify(&request.method, &request.url);
        debug!(url = %request.url, method = %request.method, ?class, "Handling request");

        let result = match class {
            RouteClass::StaticAsset => self.cache_first(&request).await,
            RouteClass::Page => self.network_first_page(&request).await,
            RouteClass::Api => self.network_first_api(&request).await,
            RouteClass::Passthrough => return Ok(self.fetcher.fetch(&request).await?),
        };

        match result {
            Ok(response) => Ok(response),
            // Strategies propagate network failures deliberately.
            Err(SwError::Network(e)) => Err(SwError::Network(e)),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Strategy failed, passing through");
                Ok(self.fetcher.fetch(&request).await?)
            }
        }
    }

    /// Cache-first: a static hit never touches the network.
    async fn cache_first(&self, request: &Request) -> Result<Response, SwError> {
        let key = entry_key(&request.method, &request.url);
        let name = self.generation(CacheClass::Static);

        {
            let storage = self.storage.read().await;
            if let Some(entry) = storage.match_in(&name, &key) {
                debug!(key = %key, "Static cache hit");
                return entry.to_response();
            }
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == StatusCode::OK {
                    self.store(CacheClass::Static, request, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                if request.url.path() == ROOT_PATH {
                    if let Some(shell) = self.match_root_shell().await? {
                        debug!("Offline, serving cached root document");
                        return Ok(shell);
                    }
                }
                Err(SwError::Network(e))
            }
        }
    }

    /// Network-first for pages, with the cached copy and then the root
    /// shell as offline fallbacks.
    async fn network_first_page(&self, request: &Request) -> Result<Response, SwError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == StatusCode::OK {
                    self.store(CacheClass::Dynamic, request, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                let key = entry_key(&request.method, &request.url);
                let name = self.generation(CacheClass::Dynamic);
                {
                    let storage = self.storage.read().await;
                    if let Some(entry) = storage.match_in(&name, &key) {
                        debug!(key = %key, "Offline, serving cached page");
                        return entry.to_response();
                    }
                }

                if let Some(shell) = self.match_root_shell().await? {
                    debug!(url = %request.url, "Offline, serving root shell");
                    return Ok(shell);
                }

                Err(SwError::Network(e))
            }
        }
    }

    /// Network-first for API calls, with a synthesized 503 JSON reply
    /// when offline with no cached copy.
    async fn network_first_api(&self, request: &Request) -> Result<Response, SwError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == StatusCode::OK
                    && self.routes.is_api_cacheable(request.url.path())
                {
                    self.store(CacheClass::Api, request, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                let key = entry_key(&request.method, &request.url);
                let name = self.generation(CacheClass::Api);
                {
                    let storage = self.storage.read().await;
                    if let Some(entry) = storage.match_in(&name, &key) {
                        debug!(key = %key, "Offline, serving cached API response");
                        return entry.to_response();
                    }
                }

                debug!(url = %request.url, error = %e, "Offline, synthesizing API fallback");
                Ok(offline_response(request))
            }
        }
    }

    /// Last-resort shell: the cached root document, from any generation.
    async fn match_root_shell(&self) -> Result<Option<Response>, SwError> {
        let root = self
            .config
            .origin
            .join(ROOT_PATH)
            .map_err(|e| SwError::InvalidUrl(e.to_string()))?;
        let key = entry_key(&Method::GET, &root);

        let storage = self.storage.read().await;
        match storage.match_any(&key) {
            Some(entry) => entry.to_response().map(Some),
            None => Ok(None),
        }
    }

    /// Snapshot a response into the current generation for a class.
    /// Best-effort: the response is served whether or not this succeeds.
    async fn store(&self, class: CacheClass, request: &Request, response: &Response) {
        let entry = CachedEntry::from_response(request, response);
        let name = self.generation(class);
        let mut storage = self.storage.write().await;
        storage.open(&name).put(entry);
        debug!(cache = %name, url = %request.url, "Stored response");
    }

    // ==================== Push notifications ====================

    /// Handle an inbound push event.
    ///
    /// Malformed payloads are dropped without display. A valid payload
    /// replaces any currently displayed notification (shared tag).
    pub async fn handle_push(&self, payload: &[u8]) -> Option<Notification> {
        let message = PushMessage::parse(payload)?;
        let notification = message.into_notification();

        info!(title = %notification.title, "Displaying notification");
        let _ = self.event_tx.send(RouterEvent::NotificationShown {
            tag: notification.tag.clone(),
            title: notification.title.clone(),
        });

        *self.displayed.write().await = Some(notification.clone());
        Some(notification)
    }

    /// Handle a click on the displayed notification.
    ///
    /// The notification closes unconditionally. The close action stops
    /// there; the open action (or a default tap, `action` = None)
    /// navigates an existing same-origin window or opens a new one.
    pub async fn handle_notification_click(
        &self,
        action: Option<&str>,
    ) -> Result<ClickOutcome, SwError> {
        let notification = self
            .displayed
            .write()
            .await
            .take()
            .ok_or_else(|| SwError::State("No notification displayed".to_string()))?;

        if action == Some(push::ACTION_CLOSE) {
            let _ = self
                .event_tx
                .send(RouterEvent::NotificationClicked { target: None });
            return Ok(ClickOutcome::Closed);
        }

        let target = push::resolve_target(notification.data.as_ref());
        let url = self
            .config
            .origin
            .join(&target)
            .map_err(|e| SwError::InvalidUrl(e.to_string()))?;

        let mut clients = self.clients.write().await;
        let existing = clients.find_same_origin(&url).map(|c| c.id.clone());
        let outcome = match existing {
            Some(id) => {
                clients.focus_and_navigate(&id, url.clone())?;
                debug!(client = %id, url = %url, "Focused existing window");
                ClickOutcome::Focused {
                    client_id: id,
                    url: url.clone(),
                }
            }
            None => {
                let client = clients.open_window(url.clone());
                debug!(client = %client.id, url = %url, "Opened new window");
                ClickOutcome::Opened {
                    client_id: client.id,
                    url: url.clone(),
                }
            }
        };

        let _ = self
            .event_tx
            .send(RouterEvent::NotificationClicked { target: Some(url) });
        Ok(outcome)
    }
}

/// Synthesized degraded-mode API reply.
fn offline_response(request: &Request) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    Response {
        request_id: request.id,
        url: request.url.clone(),
        status: StatusCode::SERVICE_UNAVAILABLE,
        headers,
        body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
    }
}
