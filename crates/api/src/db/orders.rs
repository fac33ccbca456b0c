//! Order repository.
//!
//! Every read joins the purchaser and courier so handlers can return party
//! summaries without a second round trip. Every write is a single statement:
//! checkout is one `INSERT` carrying the delivery OTP, and each lifecycle
//! change is one `UPDATE ... RETURNING`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use freshmart_core::order::{
    DeliveryDetails, LineItem, NewOrder, Order, OrderNumber, OrderView, PartySummary, PendingOtp,
};
use freshmart_core::{Email, Money, OrderId, OrderStatus, PaymentMethod, UserId};

use super::RepositoryError;

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.user_id, o.items, o.total, \
     o.payment_method, o.is_paid, o.paid_at, o.payment_result, o.status, o.delivery_boy_id, \
     o.delivery_name, o.delivery_phone, o.delivery_address, o.delivery_city, o.delivery_zip, \
     o.delivery_notes, o.delivery_lat, o.delivery_lng, o.estimated_delivery, \
     o.otp_code, o.otp_expires, o.otp_verified, o.created_at, o.updated_at";

/// `SELECT` over `source` (aliased `o`) with both parties joined.
fn select_with_parties(source: &str) -> String {
    format!(
        "SELECT {ORDER_COLUMNS}, \
                u.name AS user_name, u.email AS user_email, \
                c.name AS courier_name, c.email AS courier_email \
         FROM {source} o \
         LEFT JOIN users u ON u.id = o.user_id \
         LEFT JOIN users c ON c.id = o.delivery_boy_id"
    )
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: Option<UserId>,
    items: Json<Vec<LineItem>>,
    total: Money,
    payment_method: PaymentMethod,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_result: Option<serde_json::Value>,
    status: OrderStatus,
    delivery_boy_id: Option<UserId>,
    delivery_name: String,
    delivery_phone: String,
    delivery_address: String,
    delivery_city: String,
    delivery_zip: String,
    delivery_notes: String,
    delivery_lat: Option<f64>,
    delivery_lng: Option<f64>,
    estimated_delivery: DateTime<Utc>,
    otp_code: Option<String>,
    otp_expires: Option<DateTime<Utc>>,
    otp_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let otp = PendingOtp::from_columns(r.otp_code.as_deref(), r.otp_expires);
        if r.otp_code.is_some() && r.otp_expires.is_some() && otp.is_none() {
            return Err(RepositoryError::DataCorruption(format!(
                "malformed OTP code on order {}",
                r.id
            )));
        }

        Ok(Self {
            id: r.id,
            order_number: OrderNumber::from_stored(r.order_number),
            user: r.user_id,
            items: r.items.0,
            total: r.total,
            payment_method: r.payment_method,
            is_paid: r.is_paid,
            paid_at: r.paid_at,
            payment_result: r.payment_result,
            status: r.status,
            courier: r.delivery_boy_id,
            delivery: DeliveryDetails {
                name: r.delivery_name,
                phone: r.delivery_phone,
                address: r.delivery_address,
                city: r.delivery_city,
                zip: r.delivery_zip,
                notes: r.delivery_notes,
                lat: r.delivery_lat,
                lng: r.delivery_lng,
            },
            estimated_delivery: r.estimated_delivery,
            otp,
            otp_verified: r.otp_verified,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderWithPartiesRow {
    #[sqlx(flatten)]
    order: OrderRow,
    user_name: Option<String>,
    user_email: Option<String>,
    courier_name: Option<String>,
    courier_email: Option<String>,
}

fn party(
    id: Option<UserId>,
    name: Option<String>,
    email: Option<String>,
) -> Result<Option<PartySummary>, RepositoryError> {
    let (Some(id), Some(name), Some(email)) = (id, name, email) else {
        return Ok(None);
    };
    let email = Email::parse(&email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;
    Ok(Some(PartySummary { id, name, email }))
}

impl TryFrom<OrderWithPartiesRow> for OrderRecord {
    type Error = RepositoryError;

    fn try_from(r: OrderWithPartiesRow) -> Result<Self, Self::Error> {
        let user = party(r.order.user_id, r.user_name, r.user_email)?;
        let courier = party(r.order.delivery_boy_id, r.courier_name, r.courier_email)?;
        Ok(Self {
            order: Order::try_from(r.order)?,
            user,
            courier,
        })
    }
}

/// An order with the purchaser and courier it references.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order: Order,
    pub user: Option<PartySummary>,
    pub courier: Option<PartySummary>,
}

impl OrderRecord {
    /// Response/event document with both parties expanded.
    #[must_use]
    pub fn into_view(self) -> OrderView {
        OrderView::new(self.order)
            .with_user(self.user)
            .with_courier(self.courier)
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new order, OTP included, in one statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, new: &NewOrder) -> Result<OrderRecord, RepositoryError> {
        let sql = format!(
            r"
            WITH inserted AS (
                INSERT INTO orders (
                    order_number, user_id, items, total, payment_method, is_paid, paid_at,
                    payment_result, delivery_name, delivery_phone, delivery_address,
                    delivery_city, delivery_zip, delivery_notes, delivery_lat, delivery_lng,
                    estimated_delivery, otp_code, otp_expires, otp_verified
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                        $16, $17, $18, $19, FALSE)
                RETURNING *
            )
            {}
            ",
            select_with_parties("inserted")
        );

        let row = sqlx::query_as::<_, OrderWithPartiesRow>(&sql)
            .bind(new.order_number.as_str())
            .bind(new.user)
            .bind(Json(&new.items))
            .bind(new.total)
            .bind(new.payment_method)
            .bind(new.is_paid)
            .bind(new.paid_at)
            .bind(&new.payment_result)
            .bind(&new.delivery.name)
            .bind(&new.delivery.phone)
            .bind(&new.delivery.address)
            .bind(&new.delivery.city)
            .bind(&new.delivery.zip)
            .bind(&new.delivery.notes)
            .bind(new.delivery.lat)
            .bind(new.delivery.lng)
            .bind(new.estimated_delivery)
            .bind(new.otp.code.as_str())
            .bind(new.otp.expires_at)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "order number"))?;

        OrderRecord::try_from(row)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>, RepositoryError> {
        let sql = format!("{} WHERE o.id = $1", select_with_parties("orders"));
        let row = sqlx::query_as::<_, OrderWithPartiesRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(OrderRecord::try_from).transpose()
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        let sql = format!(
            "{} ORDER BY o.created_at DESC, o.id DESC",
            select_with_parties("orders")
        );
        let rows = sqlx::query_as::<_, OrderWithPartiesRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(OrderRecord::try_from).collect()
    }

    /// Orders placed by `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.list_where("o.user_id = $1", user).await
    }

    /// Orders assigned to `courier`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_courier(
        &self,
        courier: UserId,
    ) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.list_where("o.delivery_boy_id = $1", courier).await
    }

    async fn list_where(
        &self,
        predicate: &str,
        party: UserId,
    ) -> Result<Vec<OrderRecord>, RepositoryError> {
        let sql = format!(
            "{} WHERE {predicate} ORDER BY o.created_at DESC, o.id DESC",
            select_with_parties("orders")
        );
        let rows = sqlx::query_as::<_, OrderWithPartiesRow>(&sql)
            .bind(party)
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(OrderRecord::try_from).collect()
    }

    /// Persist the lifecycle fields of `order`: status, courier and OTP state.
    ///
    /// Last writer wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order no longer exists.
    pub async fn save_lifecycle(&self, order: &Order) -> Result<OrderRecord, RepositoryError> {
        let sql = format!(
            r"
            WITH updated AS (
                UPDATE orders
                SET status = $2, delivery_boy_id = $3, otp_code = $4, otp_expires = $5,
                    otp_verified = $6, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            {}
            ",
            select_with_parties("updated")
        );

        let row = sqlx::query_as::<_, OrderWithPartiesRow>(&sql)
            .bind(order.id)
            .bind(order.status)
            .bind(order.courier)
            .bind(order.otp.as_ref().map(|otp| otp.code.as_str()))
            .bind(order.otp.as_ref().map(|otp| otp.expires_at))
            .bind(order.otp_verified)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        OrderRecord::try_from(row)
    }
}
