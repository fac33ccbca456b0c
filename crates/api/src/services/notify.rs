//! Order change notifications.
//!
//! Notifications are best effort: they run on a spawned task, are never
//! awaited by the request that triggered them, and failures are only
//! logged. There is no delivery or ordering guarantee.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use freshmart_core::order::OrderView;

/// Event name pushed to clients when one of their orders changes.
pub const ORDER_UPDATED: &str = "orderUpdated";

/// Errors from the realtime channel.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to emit event: {0}")]
    Emit(String),
}

/// Pushes order events to the live clients in a room.
#[async_trait]
pub trait OrderEventRelay: Send + Sync {
    async fn order_updated(&self, room: &str, order: &OrderView) -> Result<(), RelayError>;
}

/// Relay for processes without a realtime channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelay;

#[async_trait]
impl OrderEventRelay for NoopRelay {
    async fn order_updated(&self, _room: &str, _order: &OrderView) -> Result<(), RelayError> {
        Ok(())
    }
}

/// Tell the purchaser of `order` that it changed.
///
/// Orders without a purchaser emit nothing.
pub fn notify_order_updated(relay: Arc<dyn OrderEventRelay>, order: OrderView) {
    let Some(user) = order.order.user else {
        return;
    };
    let room = user.room();

    tokio::spawn(async move {
        match relay.order_updated(&room, &order).await {
            Ok(()) => debug!(order_id = %order.order.id, room = %room, "Order event emitted"),
            Err(e) => warn!(
                order_id = %order.order.id,
                room = %room,
                error = %e,
                "Failed to emit order event"
            ),
        }
    });
}
