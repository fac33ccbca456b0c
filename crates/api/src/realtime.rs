//! Socket.IO channel for order updates.
//!
//! Clients connect on the default namespace and emit `join` with either
//! their bearer token or their bare user id. The socket joins the room named
//! by that user id and from then on receives `orderUpdated` events for the
//! user's orders.

use async_trait::async_trait;
use serde_json::Value;
use socketioxide::SocketIo;
use socketioxide::extract::{Data, SocketRef};
use socketioxide::layer::SocketIoLayer;
use tracing::{debug, info};

use freshmart_core::UserId;
use freshmart_core::order::OrderView;

use crate::services::notify::{ORDER_UPDATED, OrderEventRelay, RelayError};
use crate::services::TokenService;

/// Client event announcing which user the socket belongs to.
pub const JOIN_EVENT: &str = "join";

/// Build the Socket.IO layer and the handle used to emit events.
#[must_use]
pub fn layer(tokens: TokenService) -> (SocketIoLayer, SocketIo) {
    let (layer, io) = SocketIo::new_layer();

    io.ns("/", move |socket: SocketRef| {
        let tokens = tokens.clone();
        async move {
            debug!(socket_id = %socket.id, "Socket connected");
            socket.on(
                JOIN_EVENT,
                move |socket: SocketRef, Data(identity): Data<Value>| {
                    let tokens = tokens.clone();
                    async move {
                        if let Some(room) = resolve_room(&tokens, &identity) {
                            info!(socket_id = %socket.id, room = %room, "Socket joined room");
                            socket.join(room);
                        } else {
                            debug!(socket_id = %socket.id, "Ignoring join without a usable identity");
                        }
                    }
                },
            );
        }
    });

    (layer, io)
}

/// Room for a `join` payload: a token's subject, or a bare user id given as
/// a string or number.
#[must_use]
pub fn resolve_room(tokens: &TokenService, identity: &Value) -> Option<String> {
    let text = match identity {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    let user = tokens
        .verify(&text)
        .ok()
        .and_then(|claims| claims.user_id().ok())
        .or_else(|| text.parse::<UserId>().ok())?;
    Some(user.room())
}

/// Relay that emits through the Socket.IO server.
#[derive(Clone)]
pub struct SocketIoRelay {
    io: SocketIo,
}

impl SocketIoRelay {
    #[must_use]
    pub const fn new(io: SocketIo) -> Self {
        Self { io }
    }
}

#[async_trait]
impl OrderEventRelay for SocketIoRelay {
    async fn order_updated(&self, room: &str, order: &OrderView) -> Result<(), RelayError> {
        self.io
            .to(room.to_owned())
            .emit(ORDER_UPDATED, order)
            .await
            .map_err(|e| RelayError::Emit(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;
    use serde_json::json;

    use freshmart_core::UserRole;

    use super::*;
    use crate::config::JwtConfig;

    fn tokens() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: SecretString::from("k3J9xP2mQ7vR4tY8wZ1aB5cD6eF0gH3j".to_owned()),
            expiration_days: 30,
        })
    }

    #[test]
    fn test_bare_id_joins_its_room() {
        assert_eq!(resolve_room(&tokens(), &json!("17")), Some("17".to_owned()));
        assert_eq!(resolve_room(&tokens(), &json!(17)), Some("17".to_owned()));
    }

    #[test]
    fn test_token_joins_subject_room() {
        let tokens = tokens();
        let token = tokens
            .issue(UserId::new(42), UserRole::Customer, Utc::now())
            .unwrap();
        assert_eq!(resolve_room(&tokens, &json!(token)), Some("42".to_owned()));
    }

    #[test]
    fn test_unusable_identity_is_ignored() {
        let tokens = tokens();
        assert_eq!(resolve_room(&tokens, &json!("")), None);
        assert_eq!(resolve_room(&tokens, &json!(null)), None);
        assert_eq!(resolve_room(&tokens, &json!({ "id": 1 })), None);
        assert_eq!(resolve_room(&tokens, &json!("not-a-user")), None);
    }
}
