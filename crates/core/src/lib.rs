//! FreshMart Core - Domain types and the order fulfillment state machine.
//!
//! This crate provides the types shared by every FreshMart component:
//! - `api` - HTTP + Socket.IO server for storefront, admin and courier clients
//! - `cli` - Command-line tools for migrations, seeding and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Every rule about how an order may change (status
//! policy per surface, courier assignment, OTP issue and verification) lives
//! here so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, emails and status enums
//! - [`order`] - The order document, checkout normalization and lifecycle

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod order;
pub mod types;

pub use types::*;
