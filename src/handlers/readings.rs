use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use billing::reading::{self, NewReading, RepairSummary};
use billing::BillingPeriod;
use model::entities::reading as reading_entity;

use crate::schemas::{db_error_response, error_response, ApiResponse, AppState, ErrorResponse};

/// Request body for capturing a reading
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateReadingRequest {
    pub meter_id: i32,
    /// Cumulative meter value in cubic meters
    #[validate(range(min = 0))]
    pub value_m3: i32,
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    /// Date the value was captured; defaults to the period's last day
    pub reading_date: Option<NaiveDate>,
    pub photo_path: Option<String>,
    pub photo_name: Option<String>,
}

/// Request body for correcting a reading value
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateReadingRequest {
    #[validate(range(min = 0))]
    pub value_m3: i32,
}

/// Query parameters for listing readings
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReadingQuery {
    pub meter_id: Option<i32>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Reading response model
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingResponse {
    pub id: i32,
    pub meter_id: i32,
    pub value_m3: i32,
    pub reading_date: NaiveDate,
    pub photo_path: String,
    pub photo_name: Option<String>,
    pub year: i32,
    pub month: i32,
}

impl From<reading_entity::Model> for ReadingResponse {
    fn from(model: reading_entity::Model) -> Self {
        Self {
            id: model.id,
            meter_id: model.meter_id,
            value_m3: model.value_m3,
            reading_date: model.reading_date,
            photo_path: model.photo_path,
            photo_name: model.photo_name,
            year: model.year,
            month: model.month,
        }
    }
}

/// Counts from a duplicate-reading repair pass
#[derive(Debug, Serialize, ToSchema)]
pub struct RepairSummaryResponse {
    pub groups: usize,
    pub deleted: usize,
    pub kept_invoiced: usize,
}

impl From<RepairSummary> for RepairSummaryResponse {
    fn from(s: RepairSummary) -> Self {
        Self {
            groups: s.groups,
            deleted: s.deleted,
            kept_invoiced: s.kept_invoiced,
        }
    }
}

/// Capture a reading for a meter and period
#[utoipa::path(
    post,
    path = "/api/v1/readings",
    tag = "readings",
    request_body = CreateReadingRequest,
    responses(
        (status = 201, description = "Reading created successfully", body = ApiResponse<ReadingResponse>),
        (status = 404, description = "Meter not found", body = ErrorResponse),
        (status = 409, description = "Reading already exists for the period", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_reading(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateReadingRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ReadingResponse>>), (StatusCode, Json<ErrorResponse>)> {
    let default_date = BillingPeriod::new(request.year, request.month)
        .map_err(error_response)?
        .last_day();

    let created = reading::create(
        &state.db,
        NewReading {
            meter_id: request.meter_id,
            value_m3: request.value_m3,
            reading_date: request.reading_date.unwrap_or(default_date),
            photo_path: request.photo_path.unwrap_or_default(),
            photo_name: request.photo_name,
            year: request.year,
            month: request.month,
        },
    )
    .await
    .map_err(error_response)?;

    info!(
        "Reading {} created for meter {} period {}-{:02}",
        created.id, created.meter_id, created.year, created.month
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            ReadingResponse::from(created),
            "Reading created successfully",
        )),
    ))
}

/// Get readings, optionally filtered by meter and period
#[utoipa::path(
    get,
    path = "/api/v1/readings",
    tag = "readings",
    params(ReadingQuery),
    responses(
        (status = 200, description = "Readings retrieved successfully", body = ApiResponse<Vec<ReadingResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingQuery>,
) -> Result<Json<ApiResponse<Vec<ReadingResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let mut finder = reading_entity::Entity::find();
    if let Some(meter_id) = query.meter_id {
        finder = finder.filter(reading_entity::Column::MeterId.eq(meter_id));
    }
    if let Some(year) = query.year {
        finder = finder.filter(reading_entity::Column::Year.eq(year));
    }
    if let Some(month) = query.month {
        finder = finder.filter(reading_entity::Column::Month.eq(month as i32));
    }

    let readings = finder
        .order_by_asc(reading_entity::Column::Year)
        .order_by_asc(reading_entity::Column::Month)
        .order_by_asc(reading_entity::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error_response)?;

    let data: Vec<ReadingResponse> = readings.into_iter().map(ReadingResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Readings retrieved successfully")))
}

/// Correct the value of a reading that has not been invoiced yet
#[utoipa::path(
    put,
    path = "/api/v1/readings/{reading_id}",
    tag = "readings",
    params(("reading_id" = i32, Path, description = "Reading ID")),
    request_body = UpdateReadingRequest,
    responses(
        (status = 200, description = "Reading updated successfully", body = ApiResponse<ReadingResponse>),
        (status = 404, description = "Reading not found", body = ErrorResponse),
        (status = 409, description = "Reading is locked by an invoice", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_reading_value(
    State(state): State<AppState>,
    Path(reading_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateReadingRequest>>,
) -> Result<Json<ApiResponse<ReadingResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let updated = reading::update_value(&state.db, reading_id, request.value_m3)
        .await
        .map_err(error_response)?;

    info!("Reading {} updated to {}", reading_id, request.value_m3);
    Ok(Json(ApiResponse::new(
        ReadingResponse::from(updated),
        "Reading updated successfully",
    )))
}

/// Remove duplicate readings left over from before the unique constraint
#[utoipa::path(
    post,
    path = "/api/v1/readings/repair-duplicates",
    tag = "readings",
    responses(
        (status = 200, description = "Repair finished", body = ApiResponse<RepairSummaryResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn repair_duplicate_readings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RepairSummaryResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let summary = reading::repair_duplicates(&state.db)
        .await
        .map_err(error_response)?;

    info!(
        "Duplicate repair: {} groups, {} deleted, {} kept",
        summary.groups, summary.deleted, summary.kept_invoiced
    );
    Ok(Json(ApiResponse::new(
        RepairSummaryResponse::from(summary),
        "Repair finished",
    )))
}
