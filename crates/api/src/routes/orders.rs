//! Purchaser and admin order endpoints.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use freshmart_core::order::{CheckoutRequest, OrderView, StatusSurface};
use freshmart_core::{OrderId, OrderStatus, UserId};

use super::parse_id;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::CourierChoice;
use crate::state::AppState;

pub(super) const ORDER_NOT_FOUND: &str = "Order not found";

/// Body of the status endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusBody {
    /// # Errors
    ///
    /// `BadRequest` when absent or blank, `Validation` for an unknown status.
    pub fn parse(self) -> Result<OrderStatus> {
        let raw = self
            .status
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("Status is required".to_owned()))?;
        raw.parse()
            .map_err(|_| AppError::Validation(vec![format!("`{raw}` is not a valid status")]))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    #[serde(default)]
    pub delivery_boy_id: Option<Value>,
}

impl AssignBody {
    /// The courier to assign. Unparseable ids are resolved only after the
    /// order is found.
    fn courier(&self) -> CourierChoice {
        let raw = match &self.delivery_boy_id {
            None | Some(Value::Null) => return CourierChoice::Unassign,
            Some(Value::String(s)) if s.trim().is_empty() => return CourierChoice::Unassign,
            Some(Value::String(s)) => s.trim().to_owned(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return CourierChoice::Unknown,
        };
        raw.parse::<UserId>()
            .map_or(CourierChoice::Unknown, CourierChoice::User)
    }
}

/// `GET /api/orders`: every order, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders().list_all().await?))
}

/// `GET /api/orders/my-orders`
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders().list_for_user(user.id).await?))
}

/// `POST /api/orders`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let Json(request) = body?;
    let order = state.orders().place(request, &user, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `PUT /api/orders/{id}/status`: admin may set any status.
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    body: std::result::Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<OrderView>> {
    let Json(body) = body?;
    let status = body.parse()?;
    let id: OrderId = parse_id(&id, ORDER_NOT_FOUND)?;
    let order = state
        .orders()
        .set_status(id, status, StatusSurface::Admin)
        .await?;
    Ok(Json(order))
}

/// `PUT /api/orders/{id}/assign`
pub async fn assign(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    body: std::result::Result<Json<AssignBody>, JsonRejection>,
) -> Result<Json<OrderView>> {
    let Json(body) = body?;
    let id: OrderId = parse_id(&id, ORDER_NOT_FOUND)?;
    Ok(Json(state.orders().assign(id, body.courier()).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn status(body: Value) -> Result<OrderStatus> {
        serde_json::from_value::<StatusBody>(body).unwrap().parse()
    }

    #[test]
    fn test_status_body() {
        assert_eq!(
            status(json!({ "status": "out_for_delivery" })).unwrap(),
            OrderStatus::OutForDelivery
        );
        assert!(matches!(status(json!({})), Err(AppError::BadRequest(m)) if m == "Status is required"));
        assert!(matches!(status(json!({ "status": " " })), Err(AppError::BadRequest(_))));
        assert!(matches!(status(json!({ "status": "lost" })), Err(AppError::Validation(_))));
    }

    fn courier(body: Value) -> CourierChoice {
        serde_json::from_value::<AssignBody>(body).unwrap().courier()
    }

    #[test]
    fn test_assign_body() {
        assert_eq!(courier(json!({ "deliveryBoyId": "7" })), CourierChoice::User(UserId::new(7)));
        assert_eq!(courier(json!({ "deliveryBoyId": 7 })), CourierChoice::User(UserId::new(7)));
        assert_eq!(courier(json!({ "deliveryBoyId": null })), CourierChoice::Unassign);
        assert_eq!(courier(json!({ "deliveryBoyId": " " })), CourierChoice::Unassign);
        assert_eq!(courier(json!({})), CourierChoice::Unassign);
        assert_eq!(courier(json!({ "deliveryBoyId": "abc" })), CourierChoice::Unknown);
        assert_eq!(courier(json!({ "deliveryBoyId": [7] })), CourierChoice::Unknown);
    }
}
