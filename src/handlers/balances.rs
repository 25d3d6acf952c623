use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use billing::allocation;
use billing::balance::{self, BalanceChange};
use model::entities::balance_movement::{MovementKind, MovementOrigin};

use crate::handlers::clients::{account_cache_key, MovementResponse};
use crate::handlers::payments::AllocationReportResponse;
use crate::schemas::{db_error_response, error_response, ApiResponse, AppState, ErrorResponse};

/// Direction of a manual balance adjustment
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    /// Add credit to the client's balance
    Ingreso,
    /// Remove credit from the client's balance
    Egreso,
}

/// Request body for a manual balance adjustment
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AdjustBalanceRequest {
    pub kind: AdjustmentKind,
    /// Positive amount to add or remove
    pub amount: Decimal,
    /// Why the adjustment was made
    pub description: String,
    /// Administrator performing the adjustment
    pub user_id: Option<i32>,
}

/// Manually adjust a client's credit balance
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/balance-adjustments",
    tag = "balances",
    params(("client_id" = i32, Path, description = "Client ID")),
    request_body = AdjustBalanceRequest,
    responses(
        (status = 201, description = "Adjustment applied", body = ApiResponse<MovementResponse>),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 422, description = "Amount invalid or exceeds balance", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn adjust_balance(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
    Json(request): Json<AdjustBalanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MovementResponse>>), (StatusCode, Json<ErrorResponse>)> {
    // The balance update and the movement row must land together.
    let txn = state.db.begin().await.map_err(db_error_response)?;
    let movement = balance::adjust(
        &txn,
        client_id,
        BalanceChange {
            kind: match request.kind {
                AdjustmentKind::Ingreso => MovementKind::Credit,
                AdjustmentKind::Egreso => MovementKind::Debit,
            },
            origin: MovementOrigin::ManualAdjustment,
            amount: request.amount,
            payment_id: None,
            invoice_id: None,
            user_id: request.user_id,
            description: Some(request.description),
        },
    )
    .await
    .map_err(error_response)?;
    txn.commit().await.map_err(db_error_response)?;

    state.cache.invalidate(&account_cache_key(client_id)).await;
    info!(
        "Manual adjustment of {} applied to client {}, balance now {}",
        movement.amount, client_id, movement.balance_after
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            MovementResponse::from(movement),
            "Adjustment applied",
        )),
    ))
}

/// Spend the client's available credit on their outstanding invoices
#[utoipa::path(
    post,
    path = "/api/v1/clients/{client_id}/apply-credit",
    tag = "balances",
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Credit applied", body = ApiResponse<AllocationReportResponse>),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 422, description = "No credit available", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn apply_credit(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ApiResponse<AllocationReportResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let report = allocation::apply_credit(&state.db, client_id, None)
        .await
        .map_err(error_response)?;

    state.cache.invalidate(&account_cache_key(client_id)).await;
    info!(
        "Credit of {} applied for client {} across {} invoices",
        report.credit_used,
        client_id,
        report.applications.len()
    );

    Ok(Json(ApiResponse::new(
        AllocationReportResponse::from(report),
        "Credit applied",
    )))
}
