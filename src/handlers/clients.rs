use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use billing::balance;
use billing::invoice::outstanding_for_client;
use model::entities::{balance_movement, client};
use rust_decimal::Decimal;

use crate::schemas::{
    db_error_response, error_response, not_found, ApiResponse, AppState, CachedData,
    ClientAccountSummary, ErrorResponse,
};

/// Request body for creating a client
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateClientRequest {
    /// Short unique name the client is known by
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Full legal name
    pub full_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Request body for updating a client
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub active: Option<bool>,
}

/// Client response model
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientResponse {
    pub id: i32,
    pub name: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<client::Model> for ClientResponse {
    fn from(model: client::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            full_name: model.full_name,
            phone: model.phone,
            email: model.email,
            address: model.address,
            active: model.active,
            created_at: model.created_at,
        }
    }
}

/// One balance movement in a client's audit trail
#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResponse {
    pub id: i32,
    pub kind: String,
    pub origin: String,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub payment_id: Option<i32>,
    pub invoice_id: Option<i32>,
    pub user_id: Option<i32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<balance_movement::Model> for MovementResponse {
    fn from(m: balance_movement::Model) -> Self {
        Self {
            id: m.id,
            kind: match m.kind {
                balance_movement::MovementKind::Credit => "ingreso".to_string(),
                balance_movement::MovementKind::Debit => "egreso".to_string(),
            },
            origin: match m.origin {
                balance_movement::MovementOrigin::PaymentSurplus => "excedente_pago".to_string(),
                balance_movement::MovementOrigin::InvoiceApplication => {
                    "aplicacion_boleta".to_string()
                }
                balance_movement::MovementOrigin::ManualAdjustment => "ajuste_manual".to_string(),
            },
            amount: m.amount,
            balance_before: m.balance_before,
            balance_after: m.balance_after,
            payment_id: m.payment_id,
            invoice_id: m.invoice_id,
            user_id: m.user_id,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

pub(crate) fn account_cache_key(client_id: i32) -> String {
    format!("client-account:{}", client_id)
}

/// Create a new client
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created successfully", body = ApiResponse<ClientResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_client(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateClientRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ClientResponse>>), (StatusCode, Json<ErrorResponse>)> {
    debug!("Creating client with name: {}", request.name);

    let new_client = client::ActiveModel {
        name: Set(request.name.clone()),
        full_name: Set(request.full_name.clone()),
        phone: Set(request.phone.clone()),
        email: Set(request.email.clone()),
        address: Set(request.address.clone()),
        active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = new_client.insert(&state.db).await.map_err(db_error_response)?;
    info!("Client created successfully with ID: {}", created.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            ClientResponse::from(created),
            "Client created successfully",
        )),
    ))
}

/// Get all clients
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "clients",
    responses(
        (status = 200, description = "Clients retrieved successfully", body = ApiResponse<Vec<ClientResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_clients(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ClientResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let clients = client::Entity::find()
        .order_by_asc(client::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error_response)?;

    debug!("Retrieved {} clients", clients.len());
    let data: Vec<ClientResponse> = clients.into_iter().map(ClientResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Clients retrieved successfully")))
}

/// Get a client by ID
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}",
    tag = "clients",
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client retrieved successfully", body = ApiResponse<ClientResponse>),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ApiResponse<ClientResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = client::Entity::find_by_id(client_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("client {}", client_id)))?;

    Ok(Json(ApiResponse::new(
        ClientResponse::from(found),
        "Client retrieved successfully",
    )))
}

/// Update a client
#[utoipa::path(
    put,
    path = "/api/v1/clients/{client_id}",
    tag = "clients",
    params(("client_id" = i32, Path, description = "Client ID")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated successfully", body = ApiResponse<ClientResponse>),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateClientRequest>>,
) -> Result<Json<ApiResponse<ClientResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = client::Entity::find_by_id(client_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("client {}", client_id)))?;

    let mut active: client::ActiveModel = found.into();
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(full_name) = request.full_name {
        active.full_name = Set(Some(full_name));
    }
    if let Some(phone) = request.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(email) = request.email {
        active.email = Set(Some(email));
    }
    if let Some(address) = request.address {
        active.address = Set(Some(address));
    }
    if let Some(is_active) = request.active {
        active.active = Set(is_active);
    }

    let updated = active.update(&state.db).await.map_err(db_error_response)?;
    state.cache.invalidate(&account_cache_key(client_id)).await;
    info!("Client {} updated", client_id);

    Ok(Json(ApiResponse::new(
        ClientResponse::from(updated),
        "Client updated successfully",
    )))
}

/// Soft-deactivate a client. Historical readings, invoices and payments are
/// kept.
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{client_id}",
    tag = "clients",
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client deactivated", body = ApiResponse<ClientResponse>),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn deactivate_client(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ApiResponse<ClientResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let found = client::Entity::find_by_id(client_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("client {}", client_id)))?;

    let mut active: client::ActiveModel = found.into();
    active.active = Set(false);
    let updated = active.update(&state.db).await.map_err(db_error_response)?;
    state.cache.invalidate(&account_cache_key(client_id)).await;
    info!("Client {} deactivated", client_id);

    Ok(Json(ApiResponse::new(
        ClientResponse::from(updated),
        "Client deactivated",
    )))
}

/// Get the client's account summary (cached)
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/account",
    tag = "clients",
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Account summary retrieved", body = ApiResponse<ClientAccountSummary>),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_client_account(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ApiResponse<ClientAccountSummary>>, (StatusCode, Json<ErrorResponse>)> {
    let cache_key = account_cache_key(client_id);
    if let Some(CachedData::AccountSummary(summary)) = state.cache.get(&cache_key).await {
        debug!("Account summary cache hit for client {}", client_id);
        return Ok(Json(ApiResponse::new(summary, "Account summary retrieved (cached)")));
    }

    let found = client::Entity::find_by_id(client_id)
        .one(&state.db)
        .await
        .map_err(db_error_response)?
        .ok_or_else(|| not_found(format!("client {}", client_id)))?;

    let available_credit = balance::current_balance(&state.db, client_id)
        .await
        .map_err(error_response)?;
    let open = outstanding_for_client(&state.db, client_id)
        .await
        .map_err(error_response)?;

    let summary = ClientAccountSummary {
        client_id,
        name: found.name,
        active: found.active,
        available_credit,
        outstanding_total: open.iter().map(|i| i.outstanding_balance).sum(),
        open_invoices: open.len() as u64,
    };
    state
        .cache
        .insert(cache_key, CachedData::AccountSummary(summary.clone()))
        .await;

    Ok(Json(ApiResponse::new(summary, "Account summary retrieved")))
}

/// Get the client's balance movement history, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/movements",
    tag = "clients",
    params(("client_id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Movements retrieved", body = ApiResponse<Vec<MovementResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_client_movements(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<MovementResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let movements = balance::history(&state.db, client_id)
        .await
        .map_err(error_response)?;
    let data: Vec<MovementResponse> = movements.into_iter().map(MovementResponse::from).collect();
    Ok(Json(ApiResponse::new(data, "Movements retrieved successfully")))
}
