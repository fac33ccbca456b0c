//! Product catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use freshmart_core::{Money, MoneyError, ProductCategory, ProductId};

/// Emoji shown when a product is created without one.
pub const DEFAULT_EMOJI: &str = "🛒";

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub category: ProductCategory,
    pub emoji: String,
    pub price: Money,
    /// Previous price shown struck through.
    pub compare_price: Option<Money>,
    /// Sale unit, e.g. `1 kg`.
    pub unit: String,
    pub stock: i32,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for inserting or updating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub category: ProductCategory,
    pub emoji: String,
    pub price: Money,
    pub compare_price: Option<Money>,
    pub unit: String,
    pub stock: i32,
    pub featured: bool,
}

impl From<Product> for ProductFields {
    fn from(p: Product) -> Self {
        Self {
            name: p.name,
            category: p.category,
            emoji: p.emoji,
            price: p.price,
            compare_price: p.compare_price,
            unit: p.unit,
            stock: p.stock,
            featured: p.featured,
        }
    }
}

/// Body of `POST /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub emoji: Option<String>,
    pub price: Option<Decimal>,
    pub compare_price: Option<Decimal>,
    pub unit: Option<String>,
    pub stock: Option<i64>,
    pub featured: Option<bool>,
}

impl ProductInput {
    /// Check required fields and apply defaults.
    ///
    /// # Errors
    ///
    /// Returns every validation message found.
    pub fn validate(self) -> Result<ProductFields, Vec<String>> {
        let mut errors = Vec::new();

        let name = required_text(self.name, "Product name is required", &mut errors);
        let unit = required_text(self.unit, "Unit is required", &mut errors);
        let category = match self.category {
            Some(c) => parse_category(&c, &mut errors),
            None => {
                errors.push("Category is required".to_owned());
                None
            }
        };
        let price = match self.price {
            Some(p) => parse_money(p, "Price", &mut errors),
            None => {
                errors.push("Price is required".to_owned());
                None
            }
        };
        let compare_price = self
            .compare_price
            .and_then(|p| parse_money(p, "Compare price", &mut errors));
        let stock = parse_stock(self.stock.unwrap_or(0), &mut errors);

        match (name, unit, category, price, stock) {
            (Some(name), Some(unit), Some(category), Some(price), Some(stock))
                if errors.is_empty() =>
            {
                Ok(ProductFields {
                    name,
                    category,
                    emoji: self
                        .emoji
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_EMOJI.to_owned()),
                    price,
                    compare_price,
                    unit,
                    stock,
                    featured: self.featured.unwrap_or(false),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Body of `PUT /api/products/{id}`: only the given fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub emoji: Option<String>,
    pub price: Option<Decimal>,
    /// `null` clears the compare price.
    #[serde(default, deserialize_with = "present")]
    pub compare_price: Option<Option<Decimal>>,
    pub unit: Option<String>,
    pub stock: Option<i64>,
    pub featured: Option<bool>,
}

impl ProductPatch {
    /// Merge into the current fields.
    ///
    /// # Errors
    ///
    /// Returns every validation message found; `current` is not modified.
    pub fn apply(self, current: ProductFields) -> Result<ProductFields, Vec<String>> {
        let mut errors = Vec::new();
        let mut next = current;

        if self.name.is_some()
            && let Some(name) = required_text(self.name, "Product name is required", &mut errors)
        {
            next.name = name;
        }
        if self.unit.is_some()
            && let Some(unit) = required_text(self.unit, "Unit is required", &mut errors)
        {
            next.unit = unit;
        }
        if let Some(category) = self.category.and_then(|c| parse_category(&c, &mut errors)) {
            next.category = category;
        }
        if let Some(emoji) = self.emoji.filter(|e| !e.trim().is_empty()) {
            next.emoji = emoji;
        }
        if let Some(price) = self.price.and_then(|p| parse_money(p, "Price", &mut errors)) {
            next.price = price;
        }
        match self.compare_price {
            Some(Some(p)) => {
                if let Some(p) = parse_money(p, "Compare price", &mut errors) {
                    next.compare_price = Some(p);
                }
            }
            Some(None) => next.compare_price = None,
            None => {}
        }
        if let Some(stock) = self.stock.and_then(|s| parse_stock(s, &mut errors)) {
            next.stock = stock;
        }
        if let Some(featured) = self.featured {
            next.featured = featured;
        }

        if errors.is_empty() { Ok(next) } else { Err(errors) }
    }
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required_text(value: Option<String>, message: &str, errors: &mut Vec<String>) -> Option<String> {
    let value = value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
    if value.is_none() {
        errors.push(message.to_owned());
    }
    value
}

fn parse_category(value: &str, errors: &mut Vec<String>) -> Option<ProductCategory> {
    let parsed = value.trim().parse::<ProductCategory>();
    if parsed.is_err() {
        errors.push(format!("`{value}` is not a valid category"));
    }
    parsed.ok()
}

fn parse_money(value: Decimal, field: &str, errors: &mut Vec<String>) -> Option<Money> {
    match Money::new(value) {
        Ok(money) => Some(money),
        Err(MoneyError::Negative) => {
            errors.push(format!("{field} cannot be negative"));
            None
        }
        Err(_) => {
            errors.push(format!("{field} cannot exceed {}", Money::MAX));
            None
        }
    }
}

fn parse_stock(value: i64, errors: &mut Vec<String>) -> Option<i32> {
    match i32::try_from(value) {
        Ok(stock) if stock >= 0 => Some(stock),
        _ => {
            errors.push("Stock cannot be negative".to_owned());
            None
        }
    }
}
