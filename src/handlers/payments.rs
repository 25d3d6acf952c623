use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use billing::allocation::{self, AllocationReport, InvoiceApplication, NewPayment};
use model::entities::payment::{self, PaymentStatus};

use crate::handlers::clients::account_cache_key;
use crate::schemas::{db_error_response, error_response, not_found, ApiResponse, AppState, ErrorResponse};

/// Request body for registering a payment
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RegisterPaymentRequest {
    pub client_id: i32,
    /// Amount the client declares to have paid
    pub declared_amount: Decimal,
    /// How the payment was made (transferencia, efectivo, ...)
    pub method: Option<String>,
    /// Reference to the uploaded proof of payment
    pub receipt_path: Option<String>,
    pub notes: Option<String>,
    /// Date the client says they paid
    pub paid_on: Option<NaiveDate>,
}

/// Request body for approving a payment
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ApprovePaymentRequest {
    /// Administrator approving the payment
    pub user_id: Option<i32>,
    /// Pool the client's available credit with the payment (default true)
    pub use_credit: Option<bool>,
}

/// Request body for rejecting a payment
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RejectPaymentRequest {
    pub reason: String,
    /// Administrator rejecting the payment
    pub user_id: Option<i32>,
}

/// Query parameters for listing payments
#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentQuery {
    pub client_id: Option<i32>,
    /// pendiente, aprobado or rechazado
    pub status: Option<String>,
}

/// Payment response model
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: i32,
    pub payment_number: String,
    pub client_id: i32,
    pub declared_amount: Decimal,
    pub amount_applied: Decimal,
    pub amount_as_credit: Decimal,
    pub status: String,
    pub method: Option<String>,
    pub receipt_path: Option<String>,
    pub notes: Option<String>,
    pub paid_on: Option<NaiveDate>,
    pub submitted_on: NaiveDate,
    pub processed_on: Option<NaiveDate>,
    pub processed_by: Option<i32>,
    pub rejection_reason: Option<String>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            payment_number: model.payment_number,
            client_id: model.client_id,
            declared_amount: model.declared_amount,
            amount_applied: model.amount_applied,
            amount_as_credit: model.amount_as_credit,
            status: match model.status {
                PaymentStatus::Pending => "pendiente".to_string(),
                PaymentStatus::Approved => "aprobado".to_string(),
                PaymentStatus::Rejected => "rechazado".to_string(),
            },
            method: model.method,
            receipt_path: model.receipt_path,
            notes: model.notes,
            paid_on: model.paid_on,
            submitted_on: model.submitted_on,
            processed_on: model.processed_on,
            processed_by: model.processed_by,
            rejection_reason: model.rejection_reason,
        }
    }
}

/// One invoice touched by an allocation
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceApplicationResponse {
    pub invoice_id: i32,
    pub invoice_number: String,
    pub amount: Decimal,
    pub settles_invoice: bool,
}

impl From<InvoiceApplication> for InvoiceApplicationResponse {
    fn from(a: InvoiceApplication) -> Self {
        Self {
            invoice_id: a.invoice_id,
            invoice_number: a.invoice_number,
            amount: a.amount,
            settles_invoice: a.settles_invoice,
        }
    }
}

/// How an approved payment's funds were distributed
#[derive(Debug, Serialize, ToSchema)]
pub struct AllocationReportResponse {
    pub payment_id: i32,
    pub payment_number: String,
    pub amount_applied: Decimal,
    pub amount_as_credit: Decimal,
    pub credit_used: Decimal,
    pub applications: Vec<InvoiceApplicationResponse>,
}

impl From<AllocationReport> for AllocationReportResponse {
    fn from(r: AllocationReport) -> Self {
        Self {
            payment_id: r.payment_id,
            payment_number: r.payment_number,
            amount_applied: r.amount_applied,
            amount_as_credit: r.amount_as_credit,
            credit_used: r.credit_used,
            applications: r
                .applications
                .into_iter()
                .map(InvoiceApplicationResponse::from)
                .collect(),
        }
    }
}

/// Register a pending payment
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "payments",
    request_body = RegisterPaymentRequest,
    responses(
        (status = 201, description = "Payment registered", body = ApiResponse<PaymentResponse>),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 422, description = "Invalid amount", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn register_payment(
    State(state): State<AppState>,
    Json(request): Json<RegisterPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), (StatusCode, Json<ErrorResponse>)> {
    let created = allocation::register_payment(
        &state.db,
        NewPayment {
            client_id: request.client_id,
            declared_amount: request.declared_amount,
            method: request.method,
            receipt_path: request.receipt_path,
            notes: request.notes,
            paid_on: request.paid_on,
        },
    )
    .await
    .map_err(error_response)?;

    info!("Payment {} registered for client {}", created.payment_number, created.client_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            PaymentResponse::from(created),
            "Payment registered",
        )),
    ))
}

/// Get payments, optionally filtered by client or status
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "payments",
    params(PaymentQuery),
    responses(
        (status = 200, description = "Payments retrieved successfully", body = ApiResponse<Vec<PaymentResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let mut finder = payment::Entity::find();
    if let Some(client_id) = query.client_id {
        finder = finder.filter(payment::Column::ClientId.eq(client_id));
    }
    if let Some(status) = query.status {
        finder = finder.filter(payment::Column::Status.eq(status));
    }

    let payments = finder
        .order_by_asc(payment::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error_response)?;

    let data: Vec<PaymentResponse> = payments.into_iter().map(PaymentResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Payments retrieved successfully")))
}

/// Get a payment by ID
#[utoipa::path(
    get,
    path = "/api/v1/payments/{payment_id}",
    tag = "payments",
    params(("payment_id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment retrieved successfully", body = ApiResponse<PaymentResponse>),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
) -> Result<Json<ApiResponse<PaymentResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = payment::Entity::find_by_id(payment_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("payment {}", payment_id)))?;

    Ok(Json(ApiResponse::new(
        PaymentResponse::from(found),
        "Payment retrieved successfully",
    )))
}

/// Approve a pending payment, allocating its funds to outstanding invoices
#[utoipa::path(
    post,
    path = "/api/v1/payments/{payment_id}/approve",
    tag = "payments",
    params(("payment_id" = i32, Path, description = "Payment ID")),
    request_body = ApprovePaymentRequest,
    responses(
        (status = 200, description = "Payment approved and allocated", body = ApiResponse<AllocationReportResponse>),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already processed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn approve_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
    Json(request): Json<ApprovePaymentRequest>,
) -> Result<Json<ApiResponse<AllocationReportResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let use_credit = request.use_credit.unwrap_or(true);
    let report = allocation::approve(&state.db, payment_id, request.user_id, use_credit)
        .await
        .map_err(error_response)?;

    // The allocation changed the client's outstanding totals and balance.
    let client_id = payment::Entity::find_by_id(payment_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .map(|p| p.client_id);
    if let Some(client_id) = client_id {
        state.cache.invalidate(&account_cache_key(client_id)).await;
    }

    info!(
        "Payment {} approved: {} applied, {} credited",
        report.payment_number, report.amount_applied, report.amount_as_credit
    );
    Ok(Json(ApiResponse::new(
        AllocationReportResponse::from(report),
        "Payment approved and allocated",
    )))
}

/// Reject a pending payment
#[utoipa::path(
    post,
    path = "/api/v1/payments/{payment_id}/reject",
    tag = "payments",
    params(("payment_id" = i32, Path, description = "Payment ID")),
    request_body = RejectPaymentRequest,
    responses(
        (status = 200, description = "Payment rejected", body = ApiResponse<PaymentResponse>),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already processed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn reject_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
    Json(request): Json<RejectPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let rejected = allocation::reject(&state.db, payment_id, request.reason, request.user_id)
        .await
        .map_err(error_response)?;

    info!("Payment {} rejected", rejected.payment_number);
    Ok(Json(ApiResponse::new(
        PaymentResponse::from(rejected),
        "Payment rejected",
    )))
}
