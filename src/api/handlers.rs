//! HTTP request handlers for the payroll engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, post},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::simulate;
use crate::config::{ConfigurationStore, project};
use crate::error::EngineError;
use crate::models::CalculationParameters;

use super::response::{ApiError, ApiErrorResponse, InvalidationResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
///
/// - `POST /organizations/:slug/simulations` runs a simulation
/// - `DELETE /organizations/:slug/cache` drops one cached configuration
/// - `DELETE /cache` drops every cached configuration
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: ConfigurationStore + 'static,
{
    Router::new()
        .route("/organizations/:slug/simulations", post(simulate_handler::<S>))
        .route("/organizations/:slug/cache", delete(invalidate_handler::<S>))
        .route("/cache", delete(invalidate_all_handler::<S>))
        .with_state(state)
}

/// Handler for POST /organizations/:slug/simulations.
///
/// Resolves the organization's rules and returns the simulation result.
async fn simulate_handler<S>(
    State(state): State<AppState<S>>,
    Path(slug): Path<String>,
    payload: Result<Json<CalculationParameters>, JsonRejection>,
) -> Response
where
    S: ConfigurationStore + 'static,
{
    // Generate correlation ID for request tracking
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, org_slug = %slug, "Processing simulation request");

    let params = match payload {
        Ok(Json(params)) => params,
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            return (
                StatusCode::BAD_REQUEST,
                [(header::CONTENT_TYPE, "application/json")],
                Json(error),
            )
                .into_response();
        }
    };

    let start_time = Instant::now();
    let outcome = async {
        let effective = state.resolver().resolve(&slug).await?;
        let rules = project(&effective)?;
        simulate(&params, &rules, &effective.organization)
    }
    .await;

    match outcome {
        Ok(simulation) => {
            info!(
                correlation_id = %correlation_id,
                org_slug = %slug,
                calculation_id = %simulation.calculation_id,
                net_pay = %simulation.totals.net_pay,
                duration_us = start_time.elapsed().as_micros() as u64,
                "Simulation request completed"
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                Json(simulation),
            )
                .into_response()
        }
        Err(err) => error_response(correlation_id, &slug, err),
    }
}

/// Handler for DELETE /organizations/:slug/cache.
async fn invalidate_handler<S>(
    State(state): State<AppState<S>>,
    Path(slug): Path<String>,
) -> Response
where
    S: ConfigurationStore + 'static,
{
    let invalidated = state.resolver().invalidate(&slug);
    info!(org_slug = %slug, invalidated, "Cache invalidation requested");
    (
        StatusCode::OK,
        Json(InvalidationResponse {
            org_slug: slug,
            invalidated,
        }),
    )
        .into_response()
}

/// Handler for DELETE /cache.
async fn invalidate_all_handler<S>(State(state): State<AppState<S>>) -> StatusCode
where
    S: ConfigurationStore + 'static,
{
    state.resolver().invalidate_all();
    info!("Full cache invalidation requested");
    StatusCode::NO_CONTENT
}

fn error_response(correlation_id: Uuid, slug: &str, err: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        org_slug = %slug,
        code = err.code(),
        error = %err,
        "Simulation request failed"
    );
    let api_error: ApiErrorResponse = err.into();
    (
        api_error.status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(api_error.error),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigCache, ConfigRecord, InMemoryStore, OrganizationRecord};
    use crate::models::PayrollSimulation;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let store = InMemoryStore::new();
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        store.put_global(ConfigRecord::active(
            "salary_tables",
            json!({"analyst": {"C13": "5000.00"}}),
            from,
        ));
        store.put_global(ConfigRecord::active(
            "bonus_rates",
            json!({"activity": "0", "specific_gratification": "0"}),
            from,
        ));
        store.put_global(ConfigRecord::active(
            "pension",
            json!({
                "brackets": {"2025": [{"min": "0", "max": "7000", "rate": "0.14"}]},
                "ceilings": {"2025": "7000.00"}
            }),
            from,
        ));
        store.put_global(ConfigRecord::active(
            "income_tax",
            json!({"brackets": {"2025": [{"min": "4664.69", "rate": "0.275"}]}}),
            from,
        ));
        store.put_organization(OrganizationRecord {
            slug: "trf-demo".to_string(),
            name: "Demo Regional Court".to_string(),
            sector: None,
            configuration: json!({}),
        });
        AppState::new(store)
    }

    fn simulation_body() -> Value {
        json!({
            "period": 0,
            "month": 3,
            "role": "analyst",
            "grade": "C13",
            "pension_regime": "migrated",
            "pension_table": "2025",
            "income_tax_table": "2025"
        })
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        router.oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_simulation_returns_200() {
        let router = create_router(create_test_state());

        let response = send(router, "POST", "/organizations/trf-demo/simulations", Some(simulation_body())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let simulation: PayrollSimulation = serde_json::from_slice(&body).unwrap();
        let withholding = simulation.withholding.computed().unwrap();
        assert_eq!(withholding.pension_contribution.to_string(), "700.00");
        assert_eq!(simulation.organization.slug, "trf-demo");
    }

    #[tokio::test]
    async fn test_unknown_organization_returns_404() {
        let router = create_router(create_test_state());

        let response = send(router, "POST", "/organizations/nowhere/simulations", Some(simulation_body())).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "CONFIG_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/organizations/trf-demo/simulations")
                    .header("Content-Type", "application/json")
                    .body(Body::from("{invalid json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let mut body = simulation_body();
        body.as_object_mut().unwrap().remove("role");

        let response = send(router, "POST", "/organizations/trf-demo/simulations", Some(body)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_month_returns_400() {
        let router = create_router(create_test_state());
        let mut body = simulation_body();
        body["month"] = json!(13);

        let response = send(router, "POST", "/organizations/trf-demo/simulations", Some(body)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalidate_endpoints() {
        let state = create_test_state();
        let router = create_router(state.clone());

        state.resolver().resolve("trf-demo").await.unwrap();
        assert_eq!(state.resolver().cache().len(), 1);

        let response = send(router.clone(), "DELETE", "/organizations/trf-demo/cache", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let invalidation: InvalidationResponse = serde_json::from_slice(&body).unwrap();
        assert!(invalidation.invalidated);
        assert_eq!(state.resolver().cache().len(), 0);

        state.resolver().resolve("trf-demo").await.unwrap();
        let response = send(router, "DELETE", "/cache", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.resolver().cache().is_empty());
    }
}
