use rust_decimal::Decimal;
use thiserror::Error;

/// Error types for the billing module
#[derive(Error, Debug)]
pub enum BillingError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A debit was requested that exceeds the client's available balance
    #[error("Insufficient balance for client {client_id}: available {available}, requested {requested}")]
    InsufficientBalance {
        client_id: i32,
        available: Decimal,
        requested: Decimal,
    },

    /// The balance row changed between read and write, the caller should retry
    #[error("Concurrent balance update detected for client {client_id}")]
    BalanceConflict { client_id: i32 },

    /// Applied plus credited funds do not add up to the declared payment amount
    #[error(
        "Allocation mismatch for payment {payment_id}: declared {declared}, applied {applied}, credited {credited}"
    )]
    AllocationMismatch {
        payment_id: i32,
        declared: Decimal,
        applied: Decimal,
        credited: Decimal,
    },

    /// The payment has already been approved or rejected
    #[error("Payment {payment_id} has already been processed")]
    AlreadyProcessed { payment_id: i32 },

    /// The current reading is below the previous one and rollover is not allowed
    #[error("Negative consumption on meter {meter_id}: previous {previous}, current {current}")]
    NegativeConsumption {
        meter_id: i32,
        previous: i32,
        current: i32,
    },

    /// A reading already exists for this meter and period
    #[error("Reading already exists for meter {meter_id} in period {year}-{month:02}")]
    DuplicateReading { meter_id: i32, year: i32, month: u32 },

    /// The reading is referenced by an invoice and can no longer be changed
    #[error("Reading {reading_id} is locked by invoice {invoice_id}")]
    ReadingLocked { reading_id: i32, invoice_id: i32 },

    /// No active tariff is configured
    #[error("No active tariff configured")]
    MissingTariff,

    /// A monetary amount is zero, negative, or otherwise out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Type alias for Result with BillingError
pub type Result<T> = std::result::Result<T, BillingError>;
