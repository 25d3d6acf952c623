use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use model::entities::invoice;

use crate::schemas::{db_error_response, not_found, ApiResponse, AppState, ErrorResponse};

/// Query parameters for listing invoices
#[derive(Debug, Deserialize, IntoParams)]
pub struct InvoiceQuery {
    pub meter_id: Option<i32>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// Only invoices with an outstanding balance
    pub outstanding_only: Option<bool>,
}

/// Invoice response model
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: i32,
    pub invoice_number: String,
    pub reading_id: i32,
    pub meter_id: i32,
    pub period_year: i32,
    pub period_month: i32,
    pub previous_reading: i32,
    pub current_reading: i32,
    pub consumption_m3: i32,
    pub fixed_charge: Decimal,
    pub price_per_m3: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub outstanding_balance: Decimal,
    pub amount_paid: Decimal,
    pub issued_on: NaiveDate,
    pub paid_on: Option<NaiveDate>,
}

impl From<invoice::Model> for InvoiceResponse {
    fn from(model: invoice::Model) -> Self {
        Self {
            id: model.id,
            invoice_number: model.invoice_number,
            reading_id: model.reading_id,
            meter_id: model.meter_id,
            period_year: model.period_year,
            period_month: model.period_month,
            previous_reading: model.previous_reading,
            current_reading: model.current_reading,
            consumption_m3: model.consumption_m3,
            fixed_charge: model.fixed_charge,
            price_per_m3: model.price_per_m3,
            subtotal: model.subtotal,
            total: model.total,
            outstanding_balance: model.outstanding_balance,
            amount_paid: model.amount_paid,
            issued_on: model.issued_on,
            paid_on: model.paid_on,
        }
    }
}

/// Get invoices, optionally filtered by meter, period or outstanding state
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "invoices",
    params(InvoiceQuery),
    responses(
        (status = 200, description = "Invoices retrieved successfully", body = ApiResponse<Vec<InvoiceResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<ApiResponse<Vec<InvoiceResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let mut finder = invoice::Entity::find();
    if let Some(meter_id) = query.meter_id {
        finder = finder.filter(invoice::Column::MeterId.eq(meter_id));
    }
    if let Some(year) = query.year {
        finder = finder.filter(invoice::Column::PeriodYear.eq(year));
    }
    if let Some(month) = query.month {
        finder = finder.filter(invoice::Column::PeriodMonth.eq(month as i32));
    }
    if query.outstanding_only.unwrap_or(false) {
        finder = finder.filter(invoice::Column::OutstandingBalance.gt(Decimal::ZERO));
    }

    let invoices = finder
        .order_by_asc(invoice::Column::PeriodYear)
        .order_by_asc(invoice::Column::PeriodMonth)
        .order_by_asc(invoice::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error_response)?;

    let data: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Invoices retrieved successfully")))
}

/// Get an invoice by ID
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{invoice_id}",
    tag = "invoices",
    params(("invoice_id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice retrieved successfully", body = ApiResponse<InvoiceResponse>),
        (status = 404, description = "Invoice not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i32>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = invoice::Entity::find_by_id(invoice_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("invoice {}", invoice_id)))?;

    Ok(Json(ApiResponse::new(
        InvoiceResponse::from(found),
        "Invoice retrieved successfully",
    )))
}
