//! The order document.
//!
//! [`Order`] is the in-memory form of a persisted order. Its `Serialize`
//! impl is the public read projection: the pending OTP never appears in it,
//! and party references are added by [`OrderView`].

pub mod checkout;
pub mod lifecycle;
pub mod otp;
mod view;

use core::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{Money, OrderId, OrderStatus, PaymentMethod, ProductId, UserId};

pub use checkout::{CheckoutError, CheckoutRequest, ESTIMATED_DELIVERY_MINUTES, NewOrder, Purchaser};
pub use lifecycle::{OrderError, StatusSurface};
pub use otp::{OTP_TTL_MINUTES, OtpCode, PendingOtp};
pub use view::{OrderView, Party, PartySummary};

/// Human-facing order identifier: `ORD` + Unix millis + 3 digit suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Mint a number for an order created at `now`.
    ///
    /// Two orders minted in the same millisecond collide one time in a
    /// thousand; the store enforces uniqueness and callers re-mint.
    #[must_use]
    pub fn mint(now: DateTime<Utc>) -> Self {
        let suffix: u16 = rand::rng().random_range(0..1000);
        Self(format!("ORD{}{suffix:03}", now.timestamp_millis()))
    }

    /// Wrap a number read back from storage.
    #[must_use]
    pub const fn from_stored(s: String) -> Self {
        Self(s)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for `ORD` followed by one or more ASCII digits.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0
            .strip_prefix("ORD")
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One purchased product. Stored as an element of the order's JSONB items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
}

/// Where and to whom the order is delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    #[serde(rename = "deliveryName")]
    pub name: String,
    #[serde(rename = "deliveryPhone")]
    pub phone: String,
    #[serde(rename = "deliveryAddress")]
    pub address: String,
    #[serde(rename = "deliveryCity")]
    pub city: String,
    #[serde(rename = "deliveryZip")]
    pub zip: String,
    #[serde(rename = "deliveryNotes")]
    pub notes: String,
    #[serde(rename = "deliveryLat")]
    pub lat: Option<f64>,
    #[serde(rename = "deliveryLng")]
    pub lng: Option<f64>,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub order_number: OrderNumber,
    /// Purchaser. Serialized by [`OrderView`].
    #[serde(skip)]
    pub user: Option<UserId>,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<serde_json::Value>,
    pub status: OrderStatus,
    /// Assigned courier. Serialized by [`OrderView`] as `deliveryBoy`.
    #[serde(skip)]
    pub courier: Option<UserId>,
    #[serde(flatten)]
    pub delivery: DeliveryDetails,
    pub estimated_delivery: DateTime<Utc>,
    #[serde(skip)]
    pub otp: Option<PendingOtp>,
    pub otp_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let now = Utc::now();
        for _ in 0..100 {
            let number = OrderNumber::mint(now);
            assert!(number.is_well_formed(), "{number}");
            let expected_len = 3 + now.timestamp_millis().to_string().len() + 3;
            assert_eq!(number.as_str().len(), expected_len);
        }
        assert!(!OrderNumber::from_stored("ORD".to_owned()).is_well_formed());
        assert!(!OrderNumber::from_stored("INV123".to_owned()).is_well_formed());
    }

    #[test]
    fn test_serialization_omits_otp_and_parties() {
        let mut order = fixtures::order_at(Utc::now());
        order.courier = Some(UserId::new(4));
        let json = serde_json::to_value(&order).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("otp"));
        assert!(!obj.contains_key("otpCode"));
        assert!(!obj.contains_key("otpExpires"));
        assert!(!obj.contains_key("user"));
        assert!(!obj.contains_key("courier"));
        assert_eq!(obj["_id"], 1);
        assert_eq!(obj["total"], 25.5);
        assert_eq!(obj["status"], "pending");
        assert_eq!(obj["paymentMethod"], "cod");
        assert_eq!(obj["deliveryCity"], "Pune");
        assert_eq!(obj["otpVerified"], false);
        assert_eq!(obj["items"][0]["quantity"], 2);
    }
}
