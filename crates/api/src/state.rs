//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{
    OrderEventRelay, OrderService, ProductCatalog, SmsSender, TokenService,
};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The SMS provider and realtime relay are
/// injected so the server, CLI and tests can each supply their own.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenService,
    sms: Arc<dyn SmsSender>,
    relay: Arc<dyn OrderEventRelay>,
    catalog: ProductCatalog,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        pool: PgPool,
        sms: Arc<dyn SmsSender>,
        relay: Arc<dyn OrderEventRelay>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                sms,
                relay,
                catalog: ProductCatalog::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    /// Order service bound to this state's pool, SMS provider and relay.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(
            &self.inner.pool,
            self.inner.sms.as_ref(),
            Arc::clone(&self.inner.relay),
        )
    }
}
