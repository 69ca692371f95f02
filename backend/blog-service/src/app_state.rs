//! Shared application state
//!
//! Everything a handler needs is reached through `AppState`, registered once
//! as `web::Data<AppState>`.

use page_cache::PageCache;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::BlogStore;
use crate::services::{MediaStorage, SessionKeys};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub page_cache: Arc<dyn PageCache>,
    pub media: MediaStorage,
    pub sessions: SessionKeys,
    /// Lifetime of the cached home listing
    pub index_ttl: Duration,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BlogStore>,
        page_cache: Arc<dyn PageCache>,
        media: MediaStorage,
        sessions: SessionKeys,
    ) -> Self {
        Self {
            store,
            page_cache,
            media,
            sessions,
            index_ttl: Duration::from_secs(20),
            secure_cookies: false,
        }
    }

    /// Wire state from configuration around already connected backends
    pub fn from_config(
        config: &Config,
        store: Arc<dyn BlogStore>,
        page_cache: Arc<dyn PageCache>,
    ) -> Self {
        Self {
            store,
            page_cache,
            media: MediaStorage::new(&config.media.root, config.media.url.clone()),
            sessions: SessionKeys::new(&config.auth.session_secret, config.auth.session_ttl_secs),
            index_ttl: Duration::from_secs(config.cache.index_ttl_secs),
            secure_cookies: config.app.is_production(),
        }
    }

    pub fn with_index_ttl(mut self, ttl: Duration) -> Self {
        self.index_ttl = ttl;
        self
    }

    /// Public URL of a stored media path
    pub fn media_url(&self, relative: &str) -> String {
        self.media.url(relative)
    }
}
