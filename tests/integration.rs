//! Integration tests for the payroll engine.
//!
//! This test suite covers:
//! - Hierarchical configuration resolution over the sample store
//! - Rule projection, fallbacks and the January backfill
//! - Cache staleness and invalidation
//! - Full simulations through the HTTP router
//! - Per-item failure reporting and error responses

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use payroll_engine::api::{AppState, create_router};
use payroll_engine::calculation::simulate;
use payroll_engine::config::{
    ConfigCache, ConfigRecord, ConfigResolver, InMemoryStore, OrganizationRecord, TableVersion,
};
use payroll_engine::error::EngineError;
use payroll_engine::models::{CalculationParameters, LineItem, PensionRegime};

// =============================================================================
// Test Helpers
// =============================================================================

const STORE_PATH: &str = "./config/store.yaml";

fn load_store() -> InMemoryStore {
    InMemoryStore::load(STORE_PATH).expect("Failed to load store")
}

fn create_router_for_test() -> Router {
    create_router(AppState::new(load_store()))
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn assert_money(value: &Value, expected: &str) {
    let actual = value.as_str().unwrap_or_else(|| panic!("Expected a decimal string, got {}", value));
    assert_eq!(
        decimal(actual),
        decimal(expected),
        "Expected {}, got {}",
        expected,
        actual
    );
}

fn create_request(regime: &str, month: u32) -> Value {
    json!({
        "period": 0,
        "month": month,
        "role": "analyst",
        "grade": "C13",
        "pension_regime": regime,
        "pension_table": "2025",
        "income_tax_table": "2025"
    })
}

async fn post_simulation(router: Router, slug: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/organizations/{}/simulations", slug))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

// =============================================================================
// SECTION 1: Configuration Resolution
// =============================================================================

#[tokio::test]
async fn test_resolve_merges_three_layers() {
    let resolver = ConfigResolver::new(load_store());

    let effective = resolver.resolve("trf-demo").await.unwrap();

    assert_eq!(effective.organization.name, "Demo Regional Court");
    assert_eq!(effective.organization.sector.as_deref(), Some("judiciary"));
    // Organization-only key
    assert_eq!(effective.values["benefits"]["food_allowance"], "1393.10");
    // Nested objects merge field by field across layers
    assert_eq!(effective.values["benefits"]["transport_discount_rate"], "0.06");
    assert_eq!(effective.values["qualification"]["max_multiplier"], "1");
    assert_eq!(effective.values["qualification"]["reference_value"], "11290.00");
    // Closed sector record is ignored
    assert_eq!(effective.values["bonus_rates"]["activity"], "1.40");
}

#[tokio::test]
async fn test_organization_without_sector() {
    let resolver = ConfigResolver::new(load_store());

    let effective = resolver.resolve("standalone-agency").await.unwrap();

    assert_eq!(effective.organization.sector, None);
    assert_eq!(effective.values["salary_tables"]["analyst"]["C13"], "7200.00");
    assert!(effective.values.get("dailies").is_none());
}

#[tokio::test]
async fn test_unknown_organization() {
    let resolver = ConfigResolver::new(load_store());

    match resolver.resolve("nowhere").await {
        Err(EngineError::ConfigNotFound { org_slug }) => assert_eq!(org_slug, "nowhere"),
        other => panic!("Expected ConfigNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_organization_overrides_every_layer() {
    let store = load_store();
    store.put_organization(OrganizationRecord {
        slug: "override-court".to_string(),
        name: "Override Court".to_string(),
        sector: Some("judiciary".to_string()),
        configuration: json!({"bonus_rates": {"activity": "1.10"}}),
    });
    store.put_global(ConfigRecord::active(
        "bonus_rates",
        json!({"activity": "0.50", "specific_gratification": "0.10"}),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ));
    let resolver = ConfigResolver::new(store);

    let effective = resolver.resolve("override-court").await.unwrap();

    assert_eq!(effective.values["bonus_rates"]["activity"], "1.10");
    assert_eq!(effective.values["bonus_rates"]["specific_gratification"], "0.35");
}

// =============================================================================
// SECTION 2: Rule Projection
// =============================================================================

#[tokio::test]
async fn test_projected_rules_from_sample_store() {
    let resolver = ConfigResolver::new(load_store());

    let rules = resolver.resolve_rules("trf-demo").await.unwrap();

    assert_eq!(rules.bonuses.activity_rate, Some(decimal("1.40")));
    assert_eq!(rules.salary.adjustments.steps().len(), 3);
    assert_eq!(rules.income_tax.dependent_deduction, decimal("189.59"));
    assert_eq!(
        rules.pension.ceiling_for(TableVersion::year(2025)).unwrap(),
        decimal("8157.41")
    );
}

#[tokio::test]
async fn test_january_income_tax_table_is_backfilled() {
    let resolver = ConfigResolver::new(load_store());

    let rules = resolver.resolve_rules("trf-demo").await.unwrap();

    assert!(rules.income_tax.brackets.contains(TableVersion::year(2025)));
    let january = rules.income_tax.top_bracket(TableVersion::year(2025)).unwrap();
    let may = rules.income_tax.top_bracket(TableVersion::new(2025, 5)).unwrap();
    // January carries the 2024 table, with the fallback top deduction
    assert_eq!(january.deduction, decimal("896.00"));
    assert_eq!(may.deduction, decimal("908.73"));
}

// =============================================================================
// SECTION 3: Cache Behaviour
// =============================================================================

#[tokio::test]
async fn test_cached_configuration_is_stale_until_invalidated() {
    let store = Arc::new(load_store());
    let resolver = ConfigResolver::new(Arc::clone(&store));

    let before = resolver.resolve("trf-demo").await.unwrap();
    store.put_organization(OrganizationRecord {
        slug: "trf-demo".to_string(),
        name: "Renamed Court".to_string(),
        sector: Some("judiciary".to_string()),
        configuration: json!({}),
    });

    let cached = resolver.resolve("trf-demo").await.unwrap();
    assert!(Arc::ptr_eq(&before, &cached));
    assert_eq!(cached.organization.name, "Demo Regional Court");

    assert!(resolver.invalidate("trf-demo"));
    let fresh = resolver.resolve("trf-demo").await.unwrap();
    assert_eq!(fresh.organization.name, "Renamed Court");
}

#[tokio::test]
async fn test_invalidate_all_clears_every_entry() {
    let resolver = ConfigResolver::new(load_store());
    resolver.resolve("trf-demo").await.unwrap();
    resolver.resolve("standalone-agency").await.unwrap();
    assert_eq!(resolver.cache().len(), 2);

    resolver.invalidate_all();

    assert!(resolver.cache().is_empty());
    assert!(!resolver.invalidate("trf-demo"));
}

// =============================================================================
// SECTION 4: Simulations Through the Router
// =============================================================================

#[tokio::test]
async fn test_complementary_regime_simulation() {
    // Salary 8529.65, activity 140%, gratification 35% (not pension-sensitive)
    // Total 23456.54; sensitive base 20471.16 capped at 8157.41
    let router = create_router_for_test();

    let (status, result) = post_simulation(router, "trf-demo", create_request("complementary", 3)).await;

    assert_eq!(status, StatusCode::OK);
    assert_money(&result["base"]["total"], "23456.54");
    let withholding = &result["withholding"];
    assert_eq!(withholding["status"], "computed");
    assert_money(&withholding["value"]["pension_contribution"], "951.63");
    assert_money(&withholding["value"]["complementary_base"], "12313.75");
    assert_money(&withholding["value"]["complementary_contribution"], "1046.67");
    // (23456.54 - 951.63 - 1046.67) × 27.5% - 896
    assert_money(&withholding["value"]["income_tax"], "5005.02");
    assert_eq!(result["dailies"]["status"], "not_requested");
}

#[tokio::test]
async fn test_simulation_with_benefits_and_dailies() {
    let router = create_router_for_test();
    let mut request = create_request("migrated", 3);
    request["benefits"] = json!({"food_units": 1});
    request["dailies"] = json!({"quantity": "2", "embarkation": "half"});

    let (status, result) = post_simulation(router, "trf-demo", request).await;

    assert_eq!(status, StatusCode::OK);
    assert_money(&result["benefits"]["value"]["food_allowance"], "1393.10");
    // 466.95 × 2 + 514.35
    assert_money(&result["dailies"]["value"]["gross"], "1448.25");
    assert_money(&result["dailies"]["value"]["net"], "1448.25");
}

#[tokio::test]
async fn test_executive_function_uses_executive_rate() {
    let router = create_router_for_test();
    let mut request = create_request("legacy", 3);
    request["function_code"] = json!("CJ1");
    request["dailies"] = json!({"quantity": "1"});

    let (status, result) = post_simulation(router, "trf-demo", request).await;

    assert_eq!(status, StatusCode::OK);
    assert_money(&result["base"]["components"]["function_bonus"], "10990.74");
    assert_money(&result["dailies"]["value"]["rate"], "587.43");
}

#[tokio::test]
async fn test_adjustment_schedule_through_period() {
    let router = create_router_for_test();
    let mut request = create_request("legacy", 3);
    request["period"] = json!(1);

    let (status, result) = post_simulation(router, "trf-demo", request).await;

    assert_eq!(status, StatusCode::OK);
    // 8529.65 × 1.0613
    assert_money(&result["base"]["components"]["salary"], "9052.52");
}

#[tokio::test]
async fn test_november_pays_both_installments() {
    let router = create_router_for_test();

    let (status, result) = post_simulation(router, "trf-demo", create_request("migrated", 11)).await;

    assert_eq!(status, StatusCode::OK);
    let thirteenth = &result["thirteenth"]["value"];
    assert_eq!(thirteenth["state"], "both");
    assert!(decimal(thirteenth["pension_contribution"].as_str().unwrap()) > Decimal::ZERO);
    assert!(decimal(thirteenth["income_tax"].as_str().unwrap()) > Decimal::ZERO);
}

#[tokio::test]
async fn test_missing_rule_fails_only_its_item() {
    let router = create_router_for_test();
    let mut request = create_request("legacy", 3);
    request["dailies"] = json!({"quantity": "1"});
    request["overtime"] = json!({"first_tier_hours": "2"});

    let (status, result) = post_simulation(router, "standalone-agency", request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["dailies"]["status"], "failed");
    assert_eq!(result["dailies"]["value"]["code"], "MISSING_REQUIRED_RULE");
    assert_eq!(result["overtime"]["status"], "computed");
    // Legacy regime over the 2025 brackets on 7200.00
    assert_money(&result["withholding"]["value"]["pension_contribution"], "817.60");
    assert_money(&result["withholding"]["value"]["income_tax"], "859.16");
}

#[tokio::test]
async fn test_negative_overtime_hours_returns_400() {
    let router = create_router_for_test();
    let mut request = create_request("complementary", 3);
    request["overtime"] = json!({"first_tier_hours": "-100"});

    let (status, result) = post_simulation(router, "trf-demo", request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(result["code"], "INVALID_PARAMETERS");
    assert!(result["message"].as_str().unwrap().contains("overtime.first_tier_hours"));
}

#[tokio::test]
async fn test_oversized_dailies_quantity_fails_its_item() {
    let router = create_router_for_test();
    let mut request = create_request("legacy", 3);
    request["dailies"] = json!({"quantity": "79228162514264337593543950335"});

    let (status, result) = post_simulation(router, "trf-demo", request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["dailies"]["status"], "failed");
    assert_eq!(result["dailies"]["value"]["code"], "CALCULATION_ERROR");
    assert_eq!(result["withholding"]["status"], "computed");
}

#[tokio::test]
async fn test_unknown_grade_returns_422() {
    let router = create_router_for_test();
    let mut request = create_request("legacy", 3);
    request["grade"] = json!("Z99");

    let (status, result) = post_simulation(router, "trf-demo", request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(result["code"], "MISSING_REQUIRED_RULE");
    assert!(result["message"].as_str().unwrap().contains("salary_tables.analyst.Z99"));
}

#[tokio::test]
async fn test_unknown_organization_returns_404() {
    let router = create_router_for_test();

    let (status, result) = post_simulation(router, "nowhere", create_request("legacy", 3)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(result["code"], "CONFIG_NOT_FOUND");
}

// =============================================================================
// SECTION 5: Library Entry Point
// =============================================================================

#[tokio::test]
async fn test_simulate_matches_router_result() {
    let resolver = ConfigResolver::new(load_store());
    let effective = resolver.resolve("trf-demo").await.unwrap();
    let rules = resolver.resolve_rules("trf-demo").await.unwrap();
    let params = CalculationParameters::new(
        "analyst",
        "C13",
        3,
        PensionRegime::Complementary,
        TableVersion::year(2025),
    );

    let simulation = simulate(&params, &rules, &effective.organization).unwrap();

    match &simulation.withholding {
        LineItem::Computed(withholding) => {
            assert_eq!(withholding.pension_contribution, decimal("951.63"));
        }
        other => panic!("Expected Computed, got {:?}", other),
    }
    assert_eq!(
        simulation.totals.net_pay,
        simulation.totals.gross_earnings - simulation.totals.total_deductions
    );
}
