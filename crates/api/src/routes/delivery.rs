//! Courier endpoints under `/api/orders/delivery`.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use freshmart_core::OrderId;
use freshmart_core::order::{OrderView, StatusSurface};

use super::orders::{ORDER_NOT_FOUND, StatusBody};
use super::parse_id;
use crate::error::Result;
use crate::middleware::RequireCourier;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyOtpBody {
    #[serde(default)]
    pub otp: Option<Value>,
}

impl VerifyOtpBody {
    /// A request without a JSON body submits no code; malformed JSON is
    /// still rejected.
    fn from_extracted(body: std::result::Result<Json<Self>, JsonRejection>) -> Result<Self> {
        match body {
            Ok(Json(body)) => Ok(body),
            Err(JsonRejection::MissingJsonContentType(_)) => Ok(Self::default()),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpGenerated {
    pub message: &'static str,
    pub expires_at: DateTime<Utc>,
    pub otp_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct OtpVerified {
    pub message: &'static str,
    pub order: OrderView,
}

/// `GET /api/orders/delivery/assigned`
pub async fn assigned(
    State(state): State<AppState>,
    RequireCourier(courier): RequireCourier,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders().list_for_courier(courier.id).await?))
}

/// `POST /api/orders/delivery/{id}/generate-otp`
pub async fn generate_otp(
    State(state): State<AppState>,
    RequireCourier(courier): RequireCourier,
    Path(id): Path<String>,
) -> Result<Json<OtpGenerated>> {
    let id: OrderId = parse_id(&id, ORDER_NOT_FOUND)?;
    let issued = state
        .orders()
        .generate_otp(id, courier.id, Utc::now())
        .await?;
    Ok(Json(OtpGenerated {
        message: "OTP generated",
        expires_at: issued.expires_at,
        otp_sent: issued.otp_sent,
    }))
}

/// `POST /api/orders/delivery/{id}/verify-otp`
pub async fn verify_otp(
    State(state): State<AppState>,
    RequireCourier(courier): RequireCourier,
    Path(id): Path<String>,
    body: std::result::Result<Json<VerifyOtpBody>, JsonRejection>,
) -> Result<Json<OtpVerified>> {
    let body = VerifyOtpBody::from_extracted(body)?;
    let id: OrderId = parse_id(&id, ORDER_NOT_FOUND)?;
    let order = state
        .orders()
        .verify_otp(id, courier.id, body.otp.as_ref(), Utc::now())
        .await?;
    Ok(Json(OtpVerified {
        message: "OTP verified, order marked delivered",
        order,
    }))
}

/// `PUT /api/orders/delivery/{id}/status`: never `delivered`.
pub async fn set_status(
    State(state): State<AppState>,
    RequireCourier(courier): RequireCourier,
    Path(id): Path<String>,
    body: std::result::Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<OrderView>> {
    let Json(body) = body?;
    let status = body.parse()?;
    let id: OrderId = parse_id(&id, ORDER_NOT_FOUND)?;
    let order = state
        .orders()
        .set_status(id, status, StatusSurface::Courier(courier.id))
        .await?;
    Ok(Json(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{Request, header};

    use freshmart_core::order::OrderError;
    use freshmart_core::order::otp::normalize_submission;

    use super::*;
    use crate::error::AppError;

    async fn extract(request: Request<Body>) -> Result<VerifyOtpBody> {
        VerifyOtpBody::from_extracted(Json::from_request(request, &()).await)
    }

    fn post(content_type: Option<&str>, body: &'static str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_bodyless_submission_means_no_code() {
        let body = extract(post(None, "")).await.unwrap();
        assert!(body.otp.is_none());
        assert_eq!(
            normalize_submission(body.otp.as_ref()),
            Err(OrderError::OtpRequired)
        );

        let body = extract(post(Some("text/plain"), "123456")).await.unwrap();
        assert!(body.otp.is_none());
    }

    #[tokio::test]
    async fn test_json_submission() {
        let body = extract(post(Some("application/json"), r#"{"otp":"123456"}"#))
            .await
            .unwrap();
        assert_eq!(normalize_submission(body.otp.as_ref()).unwrap(), "123456");

        let err = extract(post(Some("application/json"), "{")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
