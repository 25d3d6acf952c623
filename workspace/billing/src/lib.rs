//! Business rules for the water billing backend: reading intake, monthly
//! invoice generation, payment allocation and the client credit ledger.
//!
//! Everything here is written against `sea_orm::ConnectionTrait`, so the
//! same functions run standalone or inside a caller's transaction. Functions
//! that need their own transaction (payment approval, generation) take a
//! `TransactionTrait` connection instead.

pub mod allocation;
pub mod balance;
pub mod error;
pub mod generation;
pub mod invoice;
pub mod period;
pub mod reading;

#[cfg(test)]
pub mod testing;

pub use error::{BillingError, Result};
pub use period::BillingPeriod;
