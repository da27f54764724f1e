use axum::http::StatusCode;
use buybox_guard::api::{self, AppState};
use buybox_guard::db::init_db;
use buybox_guard::domain::{BuyboxStatus, PriceSnapshot};
use buybox_guard::marketplace::BuyboxInfo;
use buybox_guard::notify::DisabledChannel;
use buybox_guard::orchestration::{
    AutoPilot, BatchRunner, JobLock, JobRunner, ManualPricing, PriceApplier, PricingService,
    Poller,
};
use buybox_guard::{
    Decimal, FeeBasis, MockMarketplaceClient, PricingEngine, ProductId, Repository, TimeMs,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    client: Arc<MockMarketplaceClient>,
    _temp: TempDir,
}

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

async fn setup_test_app(client: MockMarketplaceClient) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let client = Arc::new(client);

    let engine = PricingEngine::new(FeeBasis::CostAnchored);
    let pricing = PricingService::new(repo.clone(), engine);
    let applier = PriceApplier::new(repo.clone(), client.clone(), engine);
    let manual = ManualPricing::new(
        repo.clone(),
        pricing.clone(),
        applier.clone(),
        BatchRunner::new(2),
    );
    let jobs = Arc::new(JobRunner::new(
        JobLock::new(repo.clone(), 600),
        AutoPilot::new(repo.clone(), pricing.clone(), applier, Arc::new(DisabledChannel)),
        Poller::new(
            repo.clone(),
            client.clone(),
            pricing.clone(),
            Arc::new(DisabledChannel),
        ),
    ));
    let app = api::create_router(AppState::new(repo.clone(), pricing, manual, jobs));

    TestApp {
        app,
        repo,
        client,
        _temp: temp_dir,
    }
}

async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Cost 100, commission 10%, shipping 20, VAT 15% inclusive: floor 145.
async fn seed_scenario_product(app: &TestApp, id: &str, auto_pilot: bool) {
    let (status, _) = request(
        &app.app,
        "PUT",
        &format!("/v1/products/{}", id),
        Some(json!({
            "barcode": format!("BC-{}", id),
            "title": "Test product",
            "currentPrice": 210,
            "autoPilot": auto_pilot
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app.app,
        "PUT",
        &format!("/v1/products/{}/settings", id),
        Some(json!({
            "costPrice": 100,
            "feeRate": 10,
            "shippingCost": 20,
            "vatRate": 15,
            "vatMode": "INCLUSIVE"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn seed_snapshot(repo: &Repository, id: &str, competitor: &str, checked_at: TimeMs) {
    repo.insert_snapshot(&PriceSnapshot {
        product_id: ProductId::new(id),
        checked_at,
        our_price: Some(d("210")),
        competitor_min_price: Some(d(competitor)),
        buybox_status: BuyboxStatus::Lose,
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;

    let (status, body) = request(&app.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = request(&app.app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_global_settings_roundtrip_and_validation() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;

    let (status, mut settings) = request(&app.app, "GET", "/v1/settings/global", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["feeRate"], json!(0.15));
    assert_eq!(settings["vatMode"], "INCLUSIVE");
    assert_eq!(settings["cooldownMinutes"], 60);

    settings["vatRate"] = json!(150);
    let (status, body) =
        request(&app.app, "PUT", "/v1/settings/global", Some(settings.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("vatRate"));

    settings["vatRate"] = json!(5);
    settings["undercutStep"] = json!(1);
    let (status, _) = request(&app.app, "PUT", "/v1/settings/global", Some(settings)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, stored) = request(&app.app, "GET", "/v1/settings/global", None).await;
    assert_eq!(stored["vatRate"], json!(5.0));
    assert_eq!(stored["undercutStep"], json!(1.0));
}

#[tokio::test]
async fn test_product_settings_rejects_invalid_override() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;
    let (status, _) = request(
        &app.app,
        "PUT",
        "/v1/products/SKU-1",
        Some(json!({"barcode": "BC-SKU-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app.app,
        "PUT",
        "/v1/products/SKU-1/settings",
        Some(json!({"feeRate": 250})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app.app,
        "PUT",
        "/v1/products/SKU-1/settings",
        Some(json!({"shippingCost": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was stored; the product still inherits everything.
    let (status, body) = request(&app.app, "GET", "/v1/products/SKU-1/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overrides"]["feeRate"], Value::Null);
    assert_eq!(body["effective"]["feeRate"], json!(0.15));
}

#[tokio::test]
async fn test_product_settings_for_unknown_product_is_not_found() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;

    let (status, body) = request(&app.app, "GET", "/v1/products/NOPE/settings", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("NOPE"));

    let (status, _) = request(
        &app.app,
        "PUT",
        "/v1/products/GHOST/settings",
        Some(json!({"costPrice": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for id in ["NOPE", "GHOST"] {
        assert!(app
            .repo
            .get_product_settings(&ProductId::new(id))
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn test_product_upsert_and_lookup() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;

    let (status, _) = request(&app.app, "GET", "/v1/products/SKU-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    seed_scenario_product(&app, "SKU-1", true).await;
    let (status, body) = request(&app.app, "GET", "/v1/products/SKU-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["barcode"], "BC-SKU-1");
    assert_eq!(body["currentPrice"], json!(210.0));
    assert_eq!(body["autoPilot"], true);

    let (status, _) = request(
        &app.app,
        "PUT",
        "/v1/products/SKU-2",
        Some(json!({"minPrice": -5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pricing_at_floor_has_zero_profit() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;
    seed_scenario_product(&app, "SKU-1", false).await;

    let (status, body) =
        request(&app.app, "GET", "/v1/products/SKU-1/pricing?price=145", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feeBasis"], "COST_ANCHORED");
    assert_eq!(body["breakEven"], json!(145.0));
    assert_eq!(body["floor"], json!(145.0));
    assert_eq!(body["computation"]["commissionFee"], json!(10.0));
    assert_eq!(body["computation"]["totalFees"], json!(45.0));
    assert_eq!(body["computation"]["profitSar"], json!(0.0));

    // Defaults to the current price.
    let (status, body) = request(&app.app, "GET", "/v1/products/SKU-1/pricing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], json!(210.0));
    assert_eq!(body["computation"]["profitSar"], json!(65.0));

    let (status, _) =
        request(&app.app, "GET", "/v1/products/SKU-1/pricing?price=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_suggestion_endpoint() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;
    seed_scenario_product(&app, "SKU-1", false).await;

    let (status, body) = request(&app.app, "GET", "/v1/products/SKU-1/suggestion", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reason"], "NO_COMPETITOR_DATA");
    assert_eq!(body["suggested"], Value::Null);

    seed_snapshot(&app.repo, "SKU-1", "140", TimeMs::new(1_000)).await;
    let (status, body) = request(&app.app, "GET", "/v1/products/SKU-1/suggestion", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reason"], "FLOOR_PROTECTED");
    assert_eq!(body["suggested"], json!(145.0));
    assert_eq!(body["target"], json!(139.5));

    let (status, _) = request(&app.app, "GET", "/v1/products/NOPE/suggestion", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_reprice_reports_each_product() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;
    seed_scenario_product(&app, "SKU-1", false).await;
    seed_snapshot(&app.repo, "SKU-1", "200", TimeMs::new(1_000)).await;

    let (status, body) = request(
        &app.app,
        "POST",
        "/v1/products/reprice",
        Some(json!({"productIds": ["SKU-1", "MISSING", "SKU-1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 1);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["productId"], "MISSING");
    assert_eq!(items[0]["ok"], false);
    assert!(items[0]["error"].as_str().unwrap().contains("not found"));
    assert_eq!(items[1]["productId"], "SKU-1");
    assert_eq!(items[1]["result"]["status"], "APPLIED");
    assert_eq!(items[1]["result"]["change"]["newPrice"], json!(199.5));
    assert_eq!(items[1]["result"]["change"]["method"], "MANUAL");

    assert_eq!(
        app.client.updates(),
        vec![("BC-SKU-1".to_string(), d("199.5"))]
    );

    let (status, changes) =
        request(&app.app, "GET", "/v1/products/SKU-1/price-changes", None).await;
    assert_eq!(status, StatusCode::OK);
    let changes = changes.as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["oldPrice"], json!(210.0));

    let (_, product) = request(&app.app, "GET", "/v1/products/SKU-1", None).await;
    assert_eq!(product["currentPrice"], json!(199.5));
}

#[tokio::test]
async fn test_reprice_respects_cooldown_unless_bypassed() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;
    seed_scenario_product(&app, "SKU-1", false).await;
    seed_snapshot(&app.repo, "SKU-1", "200", TimeMs::new(1_000)).await;

    let (_, body) = request(
        &app.app,
        "POST",
        "/v1/products/reprice",
        Some(json!({"productId": "SKU-1"})),
    )
    .await;
    assert_eq!(body["succeeded"], 1);

    // The competitor drops again right after a downward change. The new
    // snapshot must be newer than the one written by the first apply.
    seed_snapshot(&app.repo, "SKU-1", "180", TimeMs::now()).await;
    let (_, body) = request(
        &app.app,
        "POST",
        "/v1/products/reprice",
        Some(json!({"productId": "SKU-1"})),
    )
    .await;
    assert_eq!(body["items"][0]["result"]["status"], "UNCHANGED");
    assert_eq!(body["items"][0]["result"]["reason"], "COOLDOWN_ACTIVE");

    let (_, body) = request(
        &app.app,
        "POST",
        "/v1/products/reprice",
        Some(json!({"productId": "SKU-1", "bypassCooldown": true})),
    )
    .await;
    assert_eq!(body["items"][0]["result"]["status"], "APPLIED");
    assert_eq!(body["items"][0]["result"]["change"]["newPrice"], json!(179.5));
    assert_eq!(app.client.updates().len(), 2);
}

#[tokio::test]
async fn test_batch_suggestions_require_a_selection() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;

    let (status, _) = request(
        &app.app,
        "POST",
        "/v1/products/suggestions",
        Some(json!({"productIds": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    seed_scenario_product(&app, "SKU-1", false).await;
    let (status, body) = request(
        &app.app,
        "POST",
        "/v1/products/suggestions",
        Some(json!({"productId": "SKU-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["result"]["reason"], "NO_COMPETITOR_DATA");
    assert!(app.client.updates().is_empty());
}

#[tokio::test]
async fn test_poll_job_records_alerts() {
    let client = MockMarketplaceClient::new().with_buybox(BuyboxInfo {
        reference: "BC-SKU-1".to_string(),
        status: BuyboxStatus::Lose,
        buybox_price: Some(d("140")),
        competitor_min: Some(d("140")),
    });
    let app = setup_test_app(client).await;
    seed_scenario_product(&app, "SKU-1", true).await;

    let (status, body) = request(&app.app, "POST", "/v1/jobs/poll", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["summary"]["productsPolled"], 1);
    assert_eq!(body["summary"]["snapshotsWritten"], 1);
    assert_eq!(body["summary"]["errored"], 0);

    let (status, alerts) = request(&app.app, "GET", "/v1/alerts?unreadOnly=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = alerts
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"LOST_BUYBOX"));
    assert!(types.contains(&"PRICE_WAR"));

    let first_id = alerts[0]["id"].as_i64().unwrap();
    let (status, _) = request(
        &app.app,
        "POST",
        &format!("/v1/alerts/{}/read", first_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, unread) = request(&app.app, "GET", "/v1/alerts?unreadOnly=true", None).await;
    assert_eq!(unread.as_array().unwrap().len(), types.len() - 1);
    let (_, all) = request(&app.app, "GET", "/v1/alerts", None).await;
    assert_eq!(all.as_array().unwrap().len(), types.len());

    let (status, _) = request(&app.app, "POST", "/v1/alerts/99999/read", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_autopilot_job_trigger_and_contention() {
    let app = setup_test_app(MockMarketplaceClient::new()).await;
    seed_scenario_product(&app, "SKU-1", true).await;
    seed_snapshot(&app.repo, "SKU-1", "200", TimeMs::new(1_000)).await;

    let (status, body) = request(&app.app, "POST", "/v1/jobs/autopilot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["summary"]["processed"], 1);
    assert_eq!(body["summary"]["updated"], 1);

    assert!(app
        .repo
        .try_acquire_job_lock("auto-pilot", "someone-else", TimeMs::now(), 600)
        .await
        .unwrap());
    let (status, body) = request(&app.app, "POST", "/v1/jobs/autopilot", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "ALREADY_RUNNING");
    assert_eq!(app.client.updates().len(), 1);
}
