use axum::http::StatusCode;
use axum::response::Json;
use moka::future::Cache;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use billing::BillingError;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for expensive operations
    pub cache: Cache<String, CachedData>,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    AccountSummary(ClientAccountSummary),
}

/// Aggregated view of a client's account: credit, debt and open invoices
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientAccountSummary {
    pub client_id: i32,
    pub name: String,
    pub active: bool,
    /// Credit available to spend on future invoices
    pub available_credit: Decimal,
    /// Sum of outstanding balances across the client's invoices
    pub outstanding_total: Decimal,
    /// Invoices with an outstanding balance
    pub open_invoices: u64,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Maps a billing error to its HTTP status and structured body.
///
/// Conflicting writes and duplicates are 409, business-rule rejections are
/// 422, unknown rows are 404 and everything else is a 500.
pub fn error_response(err: BillingError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        BillingError::DuplicateReading { .. } => (StatusCode::CONFLICT, "duplicate_reading"),
        BillingError::AlreadyProcessed { .. } => (StatusCode::CONFLICT, "already_processed"),
        BillingError::ReadingLocked { .. } => (StatusCode::CONFLICT, "reading_locked"),
        BillingError::BalanceConflict { .. } => (StatusCode::CONFLICT, "balance_conflict"),
        BillingError::InsufficientBalance { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")
        }
        BillingError::NegativeConsumption { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "negative_consumption")
        }
        BillingError::MissingTariff => (StatusCode::UNPROCESSABLE_ENTITY, "missing_tariff"),
        BillingError::InvalidAmount(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_amount"),
        BillingError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        BillingError::AllocationMismatch { .. } => {
            tracing::error!("allocation mismatch: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "allocation_mismatch")
        }
        BillingError::Database(db_err) => {
            tracing::error!("database error: {}", db_err);
            (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
            success: false,
        }),
    )
}

/// Shorthand for handlers that only hit the database directly.
pub fn db_error_response(err: sea_orm::DbErr) -> (StatusCode, Json<ErrorResponse>) {
    error_response(BillingError::from(err))
}

pub fn not_found(what: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    error_response(BillingError::NotFound(what.into()))
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::clients::create_client,
        crate::handlers::clients::get_clients,
        crate::handlers::clients::get_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::deactivate_client,
        crate::handlers::clients::get_client_account,
        crate::handlers::clients::get_client_movements,
        crate::handlers::balances::adjust_balance,
        crate::handlers::balances::apply_credit,
        crate::handlers::meters::create_meter,
        crate::handlers::meters::get_meters,
        crate::handlers::meters::get_meter,
        crate::handlers::meters::update_meter,
        crate::handlers::meters::deactivate_meter,
        crate::handlers::readings::create_reading,
        crate::handlers::readings::get_readings,
        crate::handlers::readings::update_reading_value,
        crate::handlers::readings::repair_duplicate_readings,
        crate::handlers::tariffs::create_tariff,
        crate::handlers::tariffs::get_tariffs,
        crate::handlers::tariffs::get_current_tariff,
        crate::handlers::invoices::get_invoices,
        crate::handlers::invoices::get_invoice,
        crate::handlers::payments::register_payment,
        crate::handlers::payments::get_payments,
        crate::handlers::payments::get_payment,
        crate::handlers::payments::approve_payment,
        crate::handlers::payments::reject_payment,
        crate::handlers::generation::preview_generation,
        crate::handlers::generation::run_generation,
        crate::handlers::generation::get_generation_runs,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            ClientAccountSummary,
            crate::handlers::clients::CreateClientRequest,
            crate::handlers::clients::UpdateClientRequest,
            crate::handlers::clients::ClientResponse,
            crate::handlers::clients::MovementResponse,
            crate::handlers::balances::AdjustBalanceRequest,
            crate::handlers::balances::AdjustmentKind,
            crate::handlers::meters::CreateMeterRequest,
            crate::handlers::meters::UpdateMeterRequest,
            crate::handlers::meters::MeterResponse,
            crate::handlers::readings::CreateReadingRequest,
            crate::handlers::readings::UpdateReadingRequest,
            crate::handlers::readings::ReadingResponse,
            crate::handlers::readings::RepairSummaryResponse,
            crate::handlers::tariffs::CreateTariffRequest,
            crate::handlers::tariffs::TariffResponse,
            crate::handlers::invoices::InvoiceResponse,
            crate::handlers::payments::RegisterPaymentRequest,
            crate::handlers::payments::ApprovePaymentRequest,
            crate::handlers::payments::RejectPaymentRequest,
            crate::handlers::payments::PaymentResponse,
            crate::handlers::payments::AllocationReportResponse,
            crate::handlers::payments::InvoiceApplicationResponse,
            crate::handlers::generation::RunGenerationRequest,
            crate::handlers::generation::MeterFailureResponse,
            crate::handlers::generation::GenerationSummaryResponse,
            crate::handlers::generation::GenerationPreviewResponse,
            crate::handlers::generation::GenerationRunResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "clients", description = "Client registry and account views"),
        (name = "balances", description = "Client credit balance operations"),
        (name = "meters", description = "Water meter registry"),
        (name = "readings", description = "Monthly meter readings"),
        (name = "tariffs", description = "Billing rates"),
        (name = "invoices", description = "Issued invoices"),
        (name = "payments", description = "Payment intake and allocation"),
        (name = "generation", description = "Monthly invoice generation"),
    ),
    info(
        title = "Aquabill API",
        description = "Water utility billing backend - readings, invoices, payments and client credit",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
