use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use billing::generation::{self, GenerationPolicy, MissingReadingValue};
use billing::BillingPeriod;
use model::entities::generation_run::{self, RunStatus};

use crate::schemas::{db_error_response, error_response, ApiResponse, AppState, ErrorResponse};

/// Request body for running invoice generation
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RunGenerationRequest {
    pub year: i32,
    pub month: u32,
    /// Synthesize readings for meters without one (default true)
    pub create_missing_readings: Option<bool>,
    /// How to value a synthesized reading: last_value, zero or estimated
    pub missing_reading_value: Option<String>,
    /// Treat a reading lower than the previous one as a meter rollover
    pub allow_rollover: Option<bool>,
    /// Operator starting the run
    pub user_id: Option<i32>,
}

/// Query parameters for previewing a generation run
#[derive(Debug, Deserialize, IntoParams)]
pub struct PreviewQuery {
    pub year: i32,
    pub month: u32,
}

/// Per-meter failure inside a generation run
#[derive(Debug, Serialize, ToSchema)]
pub struct MeterFailureResponse {
    pub meter_id: i32,
    pub message: String,
}

/// Result of a generation run
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationSummaryResponse {
    pub run_id: i32,
    pub period: String,
    pub readings_created: i32,
    pub invoices_created: i32,
    pub skipped: i32,
    pub failures: Vec<MeterFailureResponse>,
    pub duration_ms: i64,
}

impl From<generation::GenerationSummary> for GenerationSummaryResponse {
    fn from(summary: generation::GenerationSummary) -> Self {
        Self {
            run_id: summary.run_id,
            period: summary.period.to_string(),
            readings_created: summary.readings_created,
            invoices_created: summary.invoices_created,
            skipped: summary.skipped,
            failures: summary
                .failures
                .into_iter()
                .map(|f| MeterFailureResponse {
                    meter_id: f.meter_id,
                    message: f.message,
                })
                .collect(),
            duration_ms: summary.duration_ms,
        }
    }
}

/// Dry-run view of what a generation run would do
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationPreviewResponse {
    pub period: String,
    pub active_meters: usize,
    /// Meter IDs without a reading for the period
    pub meters_without_reading: Vec<i32>,
    /// Reading IDs that have no invoice yet
    pub readings_without_invoice: Vec<i32>,
}

impl From<generation::GenerationPreview> for GenerationPreviewResponse {
    fn from(preview: generation::GenerationPreview) -> Self {
        Self {
            period: preview.period.to_string(),
            active_meters: preview.active_meters,
            meters_without_reading: preview
                .meters_without_reading
                .into_iter()
                .map(|m| m.id)
                .collect(),
            readings_without_invoice: preview
                .readings_without_invoice
                .into_iter()
                .map(|r| r.id)
                .collect(),
        }
    }
}

/// Generation run log entry
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationRunResponse {
    pub id: i32,
    pub period_year: i32,
    pub period_month: i32,
    pub automatic: bool,
    pub status: String,
    pub readings_created: i32,
    pub invoices_created: i32,
    pub skipped: i32,
    pub errors: i32,
    pub message: Option<String>,
    pub started_by: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl From<generation_run::Model> for GenerationRunResponse {
    fn from(model: generation_run::Model) -> Self {
        Self {
            id: model.id,
            period_year: model.period_year,
            period_month: model.period_month,
            automatic: model.automatic,
            status: match model.status {
                RunStatus::Running => "en_curso".to_string(),
                RunStatus::Completed => "completado".to_string(),
                RunStatus::Failed => "error".to_string(),
            },
            readings_created: model.readings_created,
            invoices_created: model.invoices_created,
            skipped: model.skipped,
            errors: model.errors,
            message: model.message,
            started_by: model.started_by,
            started_at: model.started_at,
            duration_ms: model.duration_ms,
        }
    }
}

fn parse_missing_value(raw: &str) -> Option<MissingReadingValue> {
    match raw {
        "last_value" => Some(MissingReadingValue::LastValue),
        "zero" => Some(MissingReadingValue::Zero),
        "estimated" => Some(MissingReadingValue::Estimated),
        _ => None,
    }
}

/// Preview what a generation run would create for a period
#[utoipa::path(
    get,
    path = "/api/v1/generation/preview",
    tag = "generation",
    params(PreviewQuery),
    responses(
        (status = 200, description = "Preview computed", body = ApiResponse<GenerationPreviewResponse>),
        (status = 422, description = "Invalid period", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn preview_generation(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<ApiResponse<GenerationPreviewResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let period = BillingPeriod::new(query.year, query.month).map_err(error_response)?;
    let preview = generation::preview(&state.db, period)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::new(
        GenerationPreviewResponse::from(preview),
        "Preview computed",
    )))
}

/// Run invoice generation for a period
#[utoipa::path(
    post,
    path = "/api/v1/generation/run",
    tag = "generation",
    request_body = RunGenerationRequest,
    responses(
        (status = 200, description = "Generation run finished", body = ApiResponse<GenerationSummaryResponse>),
        (status = 422, description = "Invalid period or no active tariff", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn run_generation(
    State(state): State<AppState>,
    Json(request): Json<RunGenerationRequest>,
) -> Result<Json<ApiResponse<GenerationSummaryResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let period = BillingPeriod::new(request.year, request.month).map_err(error_response)?;

    let defaults = GenerationPolicy::default();
    let missing_reading_value = match request.missing_reading_value.as_deref() {
        None => defaults.missing_reading_value,
        Some(raw) => parse_missing_value(raw).ok_or_else(|| {
            error_response(billing::BillingError::InvalidAmount(format!(
                "unknown missing reading policy: {}",
                raw
            )))
        })?,
    };
    let policy = GenerationPolicy {
        create_missing_readings: request
            .create_missing_readings
            .unwrap_or(defaults.create_missing_readings),
        missing_reading_value,
        allow_rollover: request.allow_rollover.unwrap_or(defaults.allow_rollover),
    };

    let summary = generation::run(&state.db, period, policy, false, request.user_id)
        .await
        .map_err(error_response)?;

    // Generation touches every client's invoices; drop all cached summaries.
    state.cache.invalidate_all();

    info!(
        "Generation run {} for {}: {} invoices, {} readings, {} skipped, {} failures",
        summary.run_id,
        summary.period,
        summary.invoices_created,
        summary.readings_created,
        summary.skipped,
        summary.failures.len()
    );
    Ok(Json(ApiResponse::new(
        GenerationSummaryResponse::from(summary),
        "Generation run finished",
    )))
}

/// Get past generation runs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/generation/runs",
    tag = "generation",
    responses(
        (status = 200, description = "Runs retrieved successfully", body = ApiResponse<Vec<GenerationRunResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_generation_runs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<GenerationRunResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let runs = generation_run::Entity::find()
        .order_by_desc(generation_run::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error_response)?;

    let data: Vec<GenerationRunResponse> = runs.into_iter().map(GenerationRunResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Runs retrieved successfully")))
}
