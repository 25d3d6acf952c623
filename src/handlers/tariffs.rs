use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use billing::invoice::active_tariff;
use model::entities::tariff;

use crate::schemas::{db_error_response, error_response, ApiResponse, AppState, ErrorResponse};

/// Request body for replacing the billing rates
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateTariffRequest {
    /// Fixed monthly charge
    pub fixed_charge: Decimal,
    /// Price per cubic meter consumed
    pub price_per_m3: Decimal,
}

/// Tariff response model
#[derive(Debug, Serialize, ToSchema)]
pub struct TariffResponse {
    pub id: i32,
    pub fixed_charge: Decimal,
    pub price_per_m3: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<tariff::Model> for TariffResponse {
    fn from(model: tariff::Model) -> Self {
        Self {
            id: model.id,
            fixed_charge: model.fixed_charge,
            price_per_m3: model.price_per_m3,
            active: model.active,
            created_at: model.created_at,
        }
    }
}

/// Replace the active tariff. Issued invoices keep the rates they were
/// computed with.
#[utoipa::path(
    post,
    path = "/api/v1/tariffs",
    tag = "tariffs",
    request_body = CreateTariffRequest,
    responses(
        (status = 201, description = "Tariff created and activated", body = ApiResponse<TariffResponse>),
        (status = 422, description = "Invalid rates", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_tariff(
    State(state): State<AppState>,
    Json(request): Json<CreateTariffRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TariffResponse>>), (StatusCode, Json<ErrorResponse>)> {
    if request.fixed_charge < Decimal::ZERO || request.price_per_m3 < Decimal::ZERO {
        return Err(error_response(billing::BillingError::InvalidAmount(
            "tariff rates must be non-negative".to_string(),
        )));
    }

    let txn = state.db.begin().await.map_err(db_error_response)?;

    tariff::Entity::update_many()
        .col_expr(tariff::Column::Active, Expr::value(false))
        .filter(tariff::Column::Active.eq(true))
        .exec(&txn)
        .await
        .map_err(db_error_response)?;

    let created = tariff::ActiveModel {
        fixed_charge: Set(request.fixed_charge),
        price_per_m3: Set(request.price_per_m3),
        active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(db_error_response)?;

    txn.commit().await.map_err(db_error_response)?;
    info!("Tariff {} activated", created.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TariffResponse::from(created),
            "Tariff created and activated",
        )),
    ))
}

/// Get all tariffs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/tariffs",
    tag = "tariffs",
    responses(
        (status = 200, description = "Tariffs retrieved successfully", body = ApiResponse<Vec<TariffResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_tariffs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TariffResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let tariffs = tariff::Entity::find()
        .order_by_desc(tariff::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error_response)?;

    let data: Vec<TariffResponse> = tariffs.into_iter().map(TariffResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Tariffs retrieved successfully")))
}

/// Get the currently active tariff
#[utoipa::path(
    get,
    path = "/api/v1/tariffs/current",
    tag = "tariffs",
    responses(
        (status = 200, description = "Active tariff retrieved", body = ApiResponse<TariffResponse>),
        (status = 422, description = "No active tariff configured", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_current_tariff(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TariffResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let current = active_tariff(&state.db).await.map_err(error_response)?;
    Ok(Json(ApiResponse::new(
        TariffResponse::from(current),
        "Active tariff retrieved",
    )))
}
