//! Checkout input normalization.
//!
//! Storefront clients post loosely typed bodies: numbers arrive as strings,
//! delivery fields are often blank. [`CheckoutRequest`] accepts that shape
//! and [`CheckoutRequest::into_new_order`] turns it into a fully defaulted
//! [`NewOrder`] ready for a single insert, OTP included.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::otp::PendingOtp;
use super::{DeliveryDetails, LineItem, OrderNumber};
use crate::types::{Money, MoneyError, PaymentMethod, ProductId, UserId};

/// Minutes between placing an order and its estimated delivery.
pub const ESTIMATED_DELIVERY_MINUTES: i64 = 45;

const DEFAULT_NAME: &str = "Guest";
const DEFAULT_PHONE: &str = "0000000000";
const DEFAULT_ADDRESS: &str = "Address not provided";
const DEFAULT_CITY: &str = "Unknown";
const DEFAULT_ZIP: &str = "000000";

/// Reasons a checkout body is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("No order items")]
    NoItems,

    #[error("Invalid item details")]
    InvalidItem,

    #[error("Validation failed")]
    Validation(Vec<String>),
}

/// A line item as posted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    #[serde(default)]
    pub product: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
}

/// Checkout body for `POST /api/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Option<Vec<ItemInput>>,
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_result: Option<Value>,
    #[serde(default)]
    pub delivery_name: Option<String>,
    #[serde(default)]
    pub delivery_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default)]
    pub delivery_zip: Option<String>,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    #[serde(default)]
    pub delivery_lat: Option<f64>,
    #[serde(default)]
    pub delivery_lng: Option<f64>,
}

/// The authenticated identity placing the order.
#[derive(Debug, Clone)]
pub struct Purchaser {
    pub id: UserId,
    pub name: String,
}

/// A validated order that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user: UserId,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<Value>,
    pub delivery: DeliveryDetails,
    pub estimated_delivery: DateTime<Utc>,
    pub otp: PendingOtp,
}

impl NewOrder {
    /// Replace the order number after a uniqueness collision.
    pub fn remint_number(&mut self, now: DateTime<Utc>) {
        self.order_number = OrderNumber::mint(now);
    }
}

impl CheckoutRequest {
    /// Validate and default the body for `purchaser` at time `now`.
    ///
    /// # Errors
    ///
    /// `NoItems` for a missing or empty item list, `InvalidItem` for an
    /// item without product or name or with a non-positive price or
    /// quantity, and `Validation` listing every problem with the total and
    /// payment method.
    pub fn into_new_order(
        self,
        purchaser: &Purchaser,
        now: DateTime<Utc>,
    ) -> Result<NewOrder, CheckoutError> {
        let items = match self.items {
            Some(items) if !items.is_empty() => items
                .iter()
                .map(parse_item)
                .collect::<Option<Vec<_>>>()
                .ok_or(CheckoutError::InvalidItem)?,
            _ => return Err(CheckoutError::NoItems),
        };

        let mut errors = Vec::new();

        let total = match self.total.as_ref() {
            None | Some(Value::Null) => Some(Money::ZERO),
            Some(value) => match number(value).map(Money::from_f64) {
                Some(Ok(total)) => Some(total),
                Some(Err(MoneyError::Negative)) => {
                    errors.push("Total cannot be negative".to_owned());
                    None
                }
                Some(Err(_)) => {
                    errors.push(format!("Total cannot exceed {}", Money::MAX));
                    None
                }
                None => {
                    errors.push("Total must be a number".to_owned());
                    None
                }
            },
        };

        let payment_method = match trimmed(self.payment_method) {
            None => Some(PaymentMethod::default()),
            Some(method) => {
                let parsed = method.parse::<PaymentMethod>().ok();
                if parsed.is_none() {
                    errors.push(format!("`{method}` is not a valid payment method"));
                }
                parsed
            }
        };

        let (Some(total), Some(payment_method)) = (total, payment_method) else {
            return Err(CheckoutError::Validation(errors));
        };

        let paid = payment_method == PaymentMethod::Paypal
            && self.payment_result.as_ref().is_some_and(|r| !r.is_null());
        let (is_paid, paid_at, payment_result) = if paid {
            (true, Some(now), self.payment_result)
        } else {
            (false, None, None)
        };

        let delivery = DeliveryDetails {
            name: trimmed(self.delivery_name)
                .or_else(|| trimmed(Some(purchaser.name.clone())))
                .unwrap_or_else(|| DEFAULT_NAME.to_owned()),
            phone: trimmed(self.delivery_phone).unwrap_or_else(|| DEFAULT_PHONE.to_owned()),
            address: trimmed(self.delivery_address).unwrap_or_else(|| DEFAULT_ADDRESS.to_owned()),
            city: trimmed(self.delivery_city).unwrap_or_else(|| DEFAULT_CITY.to_owned()),
            zip: trimmed(self.delivery_zip).unwrap_or_else(|| DEFAULT_ZIP.to_owned()),
            notes: trimmed(self.delivery_notes).unwrap_or_default(),
            lat: self.delivery_lat,
            lng: self.delivery_lng,
        };

        Ok(NewOrder {
            order_number: OrderNumber::mint(now),
            user: purchaser.id,
            items,
            total,
            payment_method,
            is_paid,
            paid_at,
            payment_result,
            delivery,
            estimated_delivery: now + Duration::minutes(ESTIMATED_DELIVERY_MINUTES),
            otp: PendingOtp::issue(now),
        })
    }
}

/// Trim, mapping empty results to `None`.
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// A JSON number, or a string holding one.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn parse_item(input: &ItemInput) -> Option<LineItem> {
    let product = match input.product.as_ref()? {
        Value::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .filter(|n| *n > 0)
            .map(ProductId::new),
        Value::String(s) => s.parse::<ProductId>().ok(),
        _ => None,
    }?;

    let name = input.name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;

    let price = input.price.as_ref().and_then(number).filter(|p| *p > 0.0)?;
    let price = Money::from_f64(price).ok()?;

    let quantity = input
        .quantity
        .as_ref()
        .and_then(number)
        .filter(|q| *q >= 1.0 && q.fract().abs() < f64::EPSILON)?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let quantity = quantity.min(f64::from(u32::MAX)) as u32;

    Some(LineItem {
        product,
        name: name.to_owned(),
        price,
        quantity,
    })
}
