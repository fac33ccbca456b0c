//! Seed the database with the sample grocery catalog and an admin account.
//!
//! The catalog is replaced wholesale. The admin is only created when no
//! account with [`ADMIN_EMAIL`] exists yet.

use freshmart_api::db::{ProductRepository, UserRepository};
use freshmart_api::models::ProductFields;
use freshmart_api::services::{AuthError, AuthService};
use freshmart_core::{Email, Money, ProductCategory, UserRole};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{CommandError, connect};

/// Email of the seeded administrator.
pub const ADMIN_EMAIL: &str = "admin@freshmart.com";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Database error: {0}")]
    Repository(#[from] freshmart_api::db::RepositoryError),

    #[error("Failed to create admin: {0}")]
    Admin(#[from] AuthError),
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
fn product(
    name: &str,
    category: ProductCategory,
    emoji: &str,
    cents: u32,
    compare_cents: Option<u32>,
    unit: &str,
    stock: i32,
    featured: bool,
) -> ProductFields {
    ProductFields {
        name: name.to_owned(),
        category,
        emoji: emoji.to_owned(),
        price: Money::from_cents(cents),
        compare_price: compare_cents.map(Money::from_cents),
        unit: unit.to_owned(),
        stock,
        featured,
    }
}

/// The sample catalog.
#[must_use]
pub fn sample_products() -> Vec<ProductFields> {
    use ProductCategory::{Bakery, Dairy, Fruits, Vegetables};

    vec![
        product("Fresh Oranges", Fruits, "🍊", 499, Some(699), "1 kg", 50, true),
        product("Organic Bananas", Fruits, "🍌", 299, None, "1 bunch", 100, true),
        product("Red Apples", Fruits, "🍎", 599, Some(799), "1 kg", 75, true),
        product("Fresh Carrots", Vegetables, "🥕", 349, None, "500g", 60, true),
        product("Broccoli", Vegetables, "🥦", 449, None, "1 head", 40, true),
        product("Fresh Milk", Dairy, "🥛", 399, None, "1 liter", 80, true),
        product("Cheese", Dairy, "🧀", 699, None, "250g", 35, false),
        product("Fresh Bread", Bakery, "🍞", 249, None, "1 loaf", 90, false),
    ]
}

/// Replace the catalog and make sure the admin account exists.
///
/// Without `admin_password` a random one is generated and logged once.
///
/// # Errors
///
/// Returns an error if the connection or any write fails.
pub async fn run(admin_password: Option<String>) -> Result<(), SeedError> {
    let pool = connect().await?;

    let count = ProductRepository::new(&pool)
        .replace_all(&sample_products())
        .await?;
    info!(count, "Product catalog replaced");

    let admin_email = Email::parse(ADMIN_EMAIL).map_err(AuthError::from)?;
    if let Some(existing) = UserRepository::new(&pool)
        .get_by_email(&admin_email)
        .await?
    {
        info!(user_id = %existing.id, "Admin already exists, leaving it unchanged");
        return Ok(());
    }

    let generated = admin_password.is_none();
    let password = admin_password.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let admin = AuthService::new(&pool)
        .create_user("Admin", ADMIN_EMAIL, &password, UserRole::Admin)
        .await?;

    info!(user_id = %admin.id, email = ADMIN_EMAIL, "Admin created");
    if generated {
        warn!("Generated admin password (shown once): {password}");
    }

    info!("Data seeded successfully!");
    Ok(())
}
