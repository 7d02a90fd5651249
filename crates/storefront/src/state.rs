//! Application state shared across handlers.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::config::StoreConfig;
use crate::db::StoreRepository;
use crate::services::StoreService;
use crate::services::auth::{HashPasswordVerifier, JwtTokenIssuer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration and the store service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StoreConfig,
    service: StoreService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Store configuration (token secret, stock status mode)
    /// * `repo` - Persistence backend for the store service
    #[must_use]
    pub fn new(config: StoreConfig, repo: Arc<dyn StoreRepository>) -> Self {
        let tokens = JwtTokenIssuer::new(&config.token_secret);
        let stock_status = if config.legacy_stock_status {
            StatusCode::OK
        } else {
            StatusCode::CONFLICT
        };

        let service = StoreService::new(repo, Arc::new(HashPasswordVerifier), Arc::new(tokens))
            .with_insufficient_stock_status(stock_status);

        Self {
            inner: Arc::new(AppStateInner { config, service }),
        }
    }

    /// Get a reference to the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Get a reference to the store service.
    #[must_use]
    pub fn service(&self) -> &StoreService {
        &self.inner.service
    }
}
