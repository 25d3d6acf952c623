use crate::handlers::{
    balances::{adjust_balance, apply_credit},
    clients::{
        create_client, deactivate_client, get_client, get_client_account, get_client_movements,
        get_clients, update_client,
    },
    generation::{get_generation_runs, preview_generation, run_generation},
    health::health_check,
    invoices::{get_invoice, get_invoices},
    meters::{create_meter, deactivate_meter, get_meter, get_meters, update_meter},
    payments::{approve_payment, get_payment, get_payments, register_payment, reject_payment},
    readings::{create_reading, get_readings, repair_duplicate_readings, update_reading_value},
    tariffs::{create_tariff, get_current_tariff, get_tariffs},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Client CRUD routes
        .route("/api/v1/clients", post(create_client))
        .route("/api/v1/clients", get(get_clients))
        .route("/api/v1/clients/:client_id", get(get_client))
        .route("/api/v1/clients/:client_id", put(update_client))
        .route("/api/v1/clients/:client_id", delete(deactivate_client))
        // Client account routes
        .route("/api/v1/clients/:client_id/account", get(get_client_account))
        .route("/api/v1/clients/:client_id/movements", get(get_client_movements))
        .route("/api/v1/clients/:client_id/balance-adjustments", post(adjust_balance))
        .route("/api/v1/clients/:client_id/apply-credit", post(apply_credit))
        // Meter CRUD routes
        .route("/api/v1/meters", post(create_meter))
        .route("/api/v1/meters", get(get_meters))
        .route("/api/v1/meters/:meter_id", get(get_meter))
        .route("/api/v1/meters/:meter_id", put(update_meter))
        .route("/api/v1/meters/:meter_id", delete(deactivate_meter))
        // Reading routes
        .route("/api/v1/readings", post(create_reading))
        .route("/api/v1/readings", get(get_readings))
        .route("/api/v1/readings/:reading_id", put(update_reading_value))
        .route("/api/v1/readings/repair-duplicates", post(repair_duplicate_readings))
        // Tariff routes
        .route("/api/v1/tariffs", post(create_tariff))
        .route("/api/v1/tariffs", get(get_tariffs))
        .route("/api/v1/tariffs/current", get(get_current_tariff))
        // Invoice routes
        .route("/api/v1/invoices", get(get_invoices))
        .route("/api/v1/invoices/:invoice_id", get(get_invoice))
        // Payment routes
        .route("/api/v1/payments", post(register_payment))
        .route("/api/v1/payments", get(get_payments))
        .route("/api/v1/payments/:payment_id", get(get_payment))
        .route("/api/v1/payments/:payment_id/approve", post(approve_payment))
        .route("/api/v1/payments/:payment_id/reject", post(reject_payment))
        // Generation routes
        .route("/api/v1/generation/preview", get(preview_generation))
        .route("/api/v1/generation/run", post(run_generation))
        .route("/api/v1/generation/runs", get(get_generation_runs))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
