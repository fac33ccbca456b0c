//! Domain models for the API.
//!
//! Orders live in `freshmart_core::order`; users and products are plain
//! records whose only rules are the ones their database constraints enforce.

pub mod product;
pub mod user;

pub use product::{Product, ProductFields, ProductInput, ProductPatch};
pub use user::{User, UserResponse};
