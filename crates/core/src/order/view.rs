use serde::Serialize;

use super::Order;
use crate::types::{Email, UserId};

/// Name and email of an identity referenced by an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartySummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A party reference: bare id, or expanded to a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Party {
    Id(UserId),
    Summary(PartySummary),
}

/// Response and event payload for an order.
///
/// Purchaser and courier appear as `user` and `deliveryBoy`, either as ids
/// or, where the caller looked them up, as summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub user: Option<Party>,
    pub delivery_boy: Option<Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_sent: Option<bool>,
}

impl OrderView {
    #[must_use]
    pub fn new(order: Order) -> Self {
        Self {
            user: order.user.map(Party::Id),
            delivery_boy: order.courier.map(Party::Id),
            order,
            otp_sent: None,
        }
    }

    /// Expand the purchaser reference.
    #[must_use]
    pub fn with_user(mut self, summary: Option<PartySummary>) -> Self {
        if let Some(summary) = summary {
            self.user = Some(Party::Summary(summary));
        }
        self
    }

    /// Expand the courier reference.
    #[must_use]
    pub fn with_courier(mut self, summary: Option<PartySummary>) -> Self {
        if let Some(summary) = summary {
            self.delivery_boy = Some(Party::Summary(summary));
        }
        self
    }

    #[must_use]
    pub const fn with_otp_sent(mut self, sent: bool) -> Self {
        self.otp_sent = Some(sent);
        self
    }
}
