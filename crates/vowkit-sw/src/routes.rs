//! Request classification against build-time allow-lists.
//!
//! Classification is ordered: static exact/suffix match, then page prefix,
//! then API prefix. First match wins; no match means passthrough. Adding a
//! new page or API route to the app requires updating these lists or it
//! silently becomes passthrough.

use http::Method;
use url::Url;

/// The root document path, used as the offline shell fallback.
pub const ROOT_PATH: &str = "/";

/// Static classification of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Build-time asset, served cache-first.
    StaticAsset,
    /// Rendered page, served network-first.
    Page,
    /// API call, served network-first with an offline fallback.
    Api,
    /// Never intercepted or cached.
    Passthrough,
}

/// Allow-lists consulted by the classifier.
#[derive(Debug, Clone)]
pub struct RouteTable {
    /// URL paths that must precache successfully during install.
    /// Also serve as exact static-asset matches.
    manifest: Vec<String>,
    /// Suffixes classified as static assets (e.g. ".css").
    static_suffixes: Vec<String>,
    /// Path prefixes classified as cacheable pages.
    page_prefixes: Vec<String>,
    /// Path prefix that classifies a request as an API call.
    api_root: String,
    /// API path prefixes whose successful responses may be cached.
    /// API calls outside this list are still served network-first but
    /// never stored.
    api_prefixes: Vec<String>,
}

impl RouteTable {
    pub fn new(
        manifest: Vec<String>,
        static_suffixes: Vec<String>,
        page_prefixes: Vec<String>,
        api_root: String,
        api_prefixes: Vec<String>,
    ) -> Self {
        Self {
            manifest,
            static_suffixes,
            page_prefixes,
            api_root,
            api_prefixes,
        }
    }

    /// The route table of the wedding-planner app shell.
    pub fn wedding_app() -> Self {
        Self {
            manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/css/styles.css".to_string(),
                "/js/app.js".to_string(),
                "/js/guests.js".to_string(),
                "/js/budget.js".to_string(),
                "/js/tasks.js".to_string(),
                "/manifest.json".to_string(),
                "/icons/icon-192.png".to_string(),
                "/icons/icon-512.png".to_string(),
            ],
            static_suffixes: vec![
                ".css".to_string(),
                ".js".to_string(),
                ".png".to_string(),
                ".svg".to_string(),
                ".ico".to_string(),
                ".woff2".to_string(),
            ],
            page_prefixes: vec![
                "/guests".to_string(),
                "/budget".to_string(),
                "/tasks".to_string(),
                "/seating".to_string(),
                "/settings".to_string(),
                "/gifts".to_string(),
                "/uploads".to_string(),
            ],
            api_root: "/api/".to_string(),
            api_prefixes: vec![
                "/api/guests".to_string(),
                "/api/budget".to_string(),
                "/api/tasks".to_string(),
                "/api/seating".to_string(),
                "/api/settings".to_string(),
            ],
        }
    }

    /// The install-time precache manifest.
    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    /// Classify a request. First match wins.
    pub fn classify(&self, method: &Method, url: &Url) -> RouteClass {
        if method != Method::GET {
            return RouteClass::Passthrough;
        }

        let path = url.path();

        if self.manifest.iter().any(|m| m == path)
            || self.static_suffixes.iter().any(|s| path.ends_with(s))
        {
            return RouteClass::StaticAsset;
        }

        if self.page_prefixes.iter().any(|p| path.starts_with(p)) {
            return RouteClass::Page;
        }

        if path.starts_with(&self.api_root) {
            return RouteClass::Api;
        }

        RouteClass::Passthrough
    }

    /// Whether a successful response for this API path may be stored.
    pub fn is_api_cacheable(&self, path: &str) -> bool {
        self.api_prefixes.iter().any(|p| path.starts_with(p))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::wedding_app()
    }
}
