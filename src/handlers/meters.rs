use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use model::entities::meter;

use crate::schemas::{db_error_response, not_found, ApiResponse, AppState, ErrorResponse};

/// Request body for registering a meter
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateMeterRequest {
    pub client_id: i32,
    /// Serial number stamped on the meter
    pub meter_number: Option<String>,
    /// Installation address when it differs from the client's
    pub address: Option<String>,
    pub installed_on: Option<NaiveDate>,
}

/// Request body for updating a meter
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateMeterRequest {
    pub meter_number: Option<String>,
    pub address: Option<String>,
    pub installed_on: Option<NaiveDate>,
    /// Reason recorded when deactivating
    pub deactivation_reason: Option<String>,
}

/// Query parameters for listing meters
#[derive(Debug, Deserialize, IntoParams)]
pub struct MeterQuery {
    /// Restrict to one client
    pub client_id: Option<i32>,
    /// Restrict to active or inactive meters
    pub active: Option<bool>,
}

/// Meter response model
#[derive(Debug, Serialize, ToSchema)]
pub struct MeterResponse {
    pub id: i32,
    pub client_id: i32,
    pub meter_number: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub installed_on: Option<NaiveDate>,
    pub deactivated_on: Option<NaiveDate>,
    pub deactivation_reason: Option<String>,
}

impl From<meter::Model> for MeterResponse {
    fn from(model: meter::Model) -> Self {
        Self {
            id: model.id,
            client_id: model.client_id,
            meter_number: model.meter_number,
            address: model.address,
            active: model.active,
            installed_on: model.installed_on,
            deactivated_on: model.deactivated_on,
            deactivation_reason: model.deactivation_reason,
        }
    }
}

/// Register a new meter
#[utoipa::path(
    post,
    path = "/api/v1/meters",
    tag = "meters",
    request_body = CreateMeterRequest,
    responses(
        (status = 201, description = "Meter created successfully", body = ApiResponse<MeterResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_meter(
    State(state): State<AppState>,
    Json(request): Json<CreateMeterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MeterResponse>>), (StatusCode, Json<ErrorResponse>)> {
    debug!("Creating meter for client {}", request.client_id);

    let new_meter = meter::ActiveModel {
        client_id: Set(request.client_id),
        meter_number: Set(request.meter_number.clone()),
        address: Set(request.address.clone()),
        active: Set(true),
        installed_on: Set(request.installed_on),
        deactivated_on: Set(None),
        deactivation_reason: Set(None),
        ..Default::default()
    };

    let created = new_meter.insert(&state.db).await.map_err(db_error_response)?;
    info!("Meter created successfully with ID: {}", created.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            MeterResponse::from(created),
            "Meter created successfully",
        )),
    ))
}

/// Get meters, optionally filtered by client or active state
#[utoipa::path(
    get,
    path = "/api/v1/meters",
    tag = "meters",
    params(MeterQuery),
    responses(
        (status = 200, description = "Meters retrieved successfully", body = ApiResponse<Vec<MeterResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_meters(
    State(state): State<AppState>,
    Query(query): Query<MeterQuery>,
) -> Result<Json<ApiResponse<Vec<MeterResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let mut finder = meter::Entity::find();
    if let Some(client_id) = query.client_id {
        finder = finder.filter(meter::Column::ClientId.eq(client_id));
    }
    if let Some(active) = query.active {
        finder = finder.filter(meter::Column::Active.eq(active));
    }

    let meters = finder
        .order_by_asc(meter::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error_response)?;

    let data: Vec<MeterResponse> = meters.into_iter().map(MeterResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Meters retrieved successfully")))
}

/// Get a meter by ID
#[utoipa::path(
    get,
    path = "/api/v1/meters/{meter_id}",
    tag = "meters",
    params(("meter_id" = i32, Path, description = "Meter ID")),
    responses(
        (status = 200, description = "Meter retrieved successfully", body = ApiResponse<MeterResponse>),
        (status = 404, description = "Meter not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_meter(
    State(state): State<AppState>,
    Path(meter_id): Path<i32>,
) -> Result<Json<ApiResponse<MeterResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = meter::Entity::find_by_id(meter_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("meter {}", meter_id)))?;

    Ok(Json(ApiResponse::new(
        MeterResponse::from(found),
        "Meter retrieved successfully",
    )))
}

/// Update a meter
#[utoipa::path(
    put,
    path = "/api/v1/meters/{meter_id}",
    tag = "meters",
    params(("meter_id" = i32, Path, description = "Meter ID")),
    request_body = UpdateMeterRequest,
    responses(
        (status = 200, description = "Meter updated successfully", body = ApiResponse<MeterResponse>),
        (status = 404, description = "Meter not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_meter(
    State(state): State<AppState>,
    Path(meter_id): Path<i32>,
    Json(request): Json<UpdateMeterRequest>,
) -> Result<Json<ApiResponse<MeterResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = meter::Entity::find_by_id(meter_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("meter {}", meter_id)))?;

    let mut active: meter::ActiveModel = found.into();
    if let Some(meter_number) = request.meter_number {
        active.meter_number = Set(Some(meter_number));
    }
    if let Some(address) = request.address {
        active.address = Set(Some(address));
    }
    if let Some(installed_on) = request.installed_on {
        active.installed_on = Set(Some(installed_on));
    }

    let updated = active.update(&state.db).await.map_err(db_error_response)?;
    info!("Meter {} updated", meter_id);

    Ok(Json(ApiResponse::new(
        MeterResponse::from(updated),
        "Meter updated successfully",
    )))
}

/// Soft-deactivate a meter; its readings and invoices are kept
#[utoipa::path(
    delete,
    path = "/api/v1/meters/{meter_id}",
    tag = "meters",
    params(("meter_id" = i32, Path, description = "Meter ID")),
    request_body = UpdateMeterRequest,
    responses(
        (status = 200, description = "Meter deactivated", body = ApiResponse<MeterResponse>),
        (status = 404, description = "Meter not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn deactivate_meter(
    State(state): State<AppState>,
    Path(meter_id): Path<i32>,
    request: Option<Json<UpdateMeterRequest>>,
) -> Result<Json<ApiResponse<MeterResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = meter::Entity::find_by_id(meter_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("meter {}", meter_id)))?;

    let mut active: meter::ActiveModel = found.into();
    active.active = Set(false);
    active.deactivated_on = Set(Some(Utc::now().date_naive()));
    if let Some(Json(request)) = request {
        active.deactivation_reason = Set(request.deactivation_reason);
    }

    let updated = active.update(&state.db).await.map_err(db_error_response)?;
    info!("Meter {} deactivated", meter_id);

    Ok(Json(ApiResponse::new(
        MeterResponse::from(updated),
        "Meter deactivated",
    )))
}
