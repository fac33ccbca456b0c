//! Order fulfillment service.
//!
//! Each operation loads the order, applies one lifecycle rule from
//! `freshmart_core::order`, persists the result in a single statement and
//! then notifies the purchaser. SMS dispatch happens after the write and
//! its outcome is reported, never propagated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use freshmart_core::order::{
    CheckoutError, CheckoutRequest, Order, OrderError, OrderView, Purchaser, StatusSurface,
    otp::normalize_submission,
};
use freshmart_core::{OrderId, OrderStatus, UserId};

use crate::db::orders::OrderRecord;
use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::models::User;
use crate::services::notify::{OrderEventRelay, notify_order_updated};
use crate::services::sms::{SmsSender, send_otp};

/// Attempts at minting an unused order number before giving up.
const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The identity named for assignment does not exist.
    #[error("Delivery user not found")]
    CourierNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Courier requested for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourierChoice {
    /// Clear the assignment.
    Unassign,
    User(UserId),
    /// An identifier that cannot name any user.
    Unknown,
}

/// Result of issuing a delivery code.
#[derive(Debug, Clone, Copy)]
pub struct OtpIssued {
    pub expires_at: DateTime<Utc>,
    pub otp_sent: bool,
}

/// Order operations over the store, SMS provider and realtime relay.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    sms: &'a dyn SmsSender,
    relay: Arc<dyn OrderEventRelay>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool, sms: &'a dyn SmsSender, relay: Arc<dyn OrderEventRelay>) -> Self {
        Self { pool, sms, relay }
    }

    fn orders(&self) -> OrderRepository<'a> {
        OrderRepository::new(self.pool)
    }

    async fn load(&self, id: OrderId) -> Result<Order, OrderServiceError> {
        self.orders()
            .get(id)
            .await?
            .map(|record| record.order)
            .ok_or_else(|| OrderError::NotFound.into())
    }

    async fn save(&self, order: &Order) -> Result<OrderRecord, OrderServiceError> {
        self.orders().save_lifecycle(order).await.map_err(|e| match e {
            RepositoryError::NotFound => OrderError::NotFound.into(),
            other => other.into(),
        })
    }

    fn notify(&self, record: &OrderRecord) {
        notify_order_updated(Arc::clone(&self.relay), record.clone().into_view());
    }

    /// Place an order for `purchaser` with its delivery code attached.
    ///
    /// # Errors
    ///
    /// Returns `Checkout` errors for an invalid body, or `Repository` if the
    /// insert fails.
    #[instrument(skip(self, request, purchaser), fields(user_id = %purchaser.id))]
    pub async fn place(
        &self,
        request: CheckoutRequest,
        purchaser: &User,
        now: DateTime<Utc>,
    ) -> Result<OrderView, OrderServiceError> {
        let purchaser = Purchaser {
            id: purchaser.id,
            name: purchaser.name.clone(),
        };
        let mut new = request.into_new_order(&purchaser, now)?;

        let mut attempt = 1;
        let record = loop {
            match self.orders().insert(&new).await {
                Ok(record) => break record,
                Err(RepositoryError::Conflict(_)) if attempt < MAX_NUMBER_ATTEMPTS => {
                    warn!(order_number = %new.order_number, attempt, "Order number taken, re-minting");
                    new.remint_number(Utc::now());
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            order_id = %record.order.id,
            order_number = %record.order.order_number,
            total = %record.order.total,
            "Order placed"
        );

        let otp_sent = send_otp(
            self.sms,
            record.order.id,
            &record.order.delivery.phone,
            &new.otp.code,
        )
        .await;

        Ok(OrderView::new(record.order).with_otp_sent(otp_sent))
    }

    /// Every order, newest first, with both parties expanded.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderView>, OrderServiceError> {
        let records = self.orders().list_all().await?;
        Ok(records.into_iter().map(OrderRecord::into_view).collect())
    }

    /// Orders placed by `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<OrderView>, OrderServiceError> {
        let records = self.orders().list_for_user(user).await?;
        Ok(records
            .into_iter()
            .map(|record| OrderView::new(record.order))
            .collect())
    }

    /// Orders assigned to `courier`, newest first, with both parties expanded.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the query fails.
    pub async fn list_for_courier(
        &self,
        courier: UserId,
    ) -> Result<Vec<OrderView>, OrderServiceError> {
        let records = self.orders().list_for_courier(courier).await?;
        Ok(records.into_iter().map(OrderRecord::into_view).collect())
    }

    /// Change an order's status on behalf of `surface`.
    ///
    /// # Errors
    ///
    /// Returns `Order(NotFound)` for an unknown order, and whatever
    /// [`Order::set_status`] refuses.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        surface: StatusSurface,
    ) -> Result<OrderView, OrderServiceError> {
        let mut order = self.load(id).await?;
        let previous = order.status;
        order.set_status(status, surface)?;

        let record = self.save(&order).await?;
        info!(order_id = %id, from = %previous, to = %status, "Order status changed");
        self.notify(&record);
        Ok(OrderView::new(record.order))
    }

    /// Assign `courier` to the order, or clear the assignment with `None`.
    ///
    /// # Errors
    ///
    /// Returns `Order(NotFound)`, `CourierNotFound`, or `Order(NotACourier)`
    /// when the identity is not a courier (the order is left unchanged).
    #[instrument(skip(self))]
    pub async fn assign(
        &self,
        id: OrderId,
        courier: CourierChoice,
    ) -> Result<OrderView, OrderServiceError> {
        let mut order = self.load(id).await?;

        let candidate = match courier {
            CourierChoice::User(courier) => {
                let user = UserRepository::new(self.pool)
                    .get_by_id(courier)
                    .await?
                    .ok_or(OrderServiceError::CourierNotFound)?;
                Some((user.id, user.role))
            }
            CourierChoice::Unassign => None,
            CourierChoice::Unknown => return Err(OrderServiceError::CourierNotFound),
        };
        order.assign_courier(candidate)?;

        let record = self.save(&order).await?;
        info!(order_id = %id, courier = ?courier, "Courier assignment changed");
        self.notify(&record);
        Ok(record.into_view())
    }

    /// Issue a fresh delivery code and text it to the delivery phone.
    ///
    /// # Errors
    ///
    /// Returns `Order(NotFound)` and whatever [`Order::issue_otp`] refuses.
    #[instrument(skip(self))]
    pub async fn generate_otp(
        &self,
        id: OrderId,
        courier: UserId,
        now: DateTime<Utc>,
    ) -> Result<OtpIssued, OrderServiceError> {
        let mut order = self.load(id).await?;
        let code = order.issue_otp(courier, now)?;

        let record = self.save(&order).await?;
        let expires_at = record
            .order
            .otp
            .as_ref()
            .map_or(now, |otp| otp.expires_at);
        info!(order_id = %id, expires_at = %expires_at, "Delivery code issued");

        let otp_sent = send_otp(self.sms, id, &record.order.delivery.phone, &code).await;
        Ok(OtpIssued {
            expires_at,
            otp_sent,
        })
    }

    /// Check a submitted delivery code and mark the order delivered.
    ///
    /// # Errors
    ///
    /// Returns `Order(OtpRequired)` for a missing or blank code before the
    /// order is loaded, then `Order(NotFound)` and whatever
    /// [`Order::verify_otp`] refuses.
    #[instrument(skip(self, submitted))]
    pub async fn verify_otp(
        &self,
        id: OrderId,
        courier: UserId,
        submitted: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Result<OrderView, OrderServiceError> {
        let submitted = normalize_submission(submitted)?;
        let mut order = self.load(id).await?;
        order.verify_otp(courier, &submitted, now)?;

        let record = self.save(&order).await?;
        info!(order_id = %id, "Delivery confirmed by code");
        self.notify(&record);
        Ok(OrderView::new(record.order))
    }
}
