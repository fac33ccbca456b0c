//! Business logic services.

pub mod auth;
pub mod catalog;
pub mod notify;
pub mod orders;
pub mod sms;
pub mod tokens;

pub use auth::{AuthError, AuthService};
pub use catalog::{CatalogError, ProductCatalog};
pub use notify::{NoopRelay, OrderEventRelay, RelayError};
pub use orders::{CourierChoice, OrderService, OrderServiceError, OtpIssued};
pub use sms::{LogSmsSender, SmsError, SmsSender, TwilioSmsSender};
pub use tokens::{Claims, TokenError, TokenService};
