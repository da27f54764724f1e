use super::AppState;
use crate::domain::{Decimal, PriceChange, Product, ProductId, TimeMs};
use crate::engine::{FeeBasis, Floor, PriceComputationResult};
use crate::error::AppError;
use crate::orchestration::ProductSuggestion;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

const DEFAULT_CHANGES_LIMIT: i64 = 50;
const MAX_CHANGES_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpsert {
    pub barcode: Option<String>,
    pub title: Option<String>,
    pub current_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub auto_pilot: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingQuery {
    pub price: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub product_id: ProductId,
    pub price: Decimal,
    pub fee_basis: FeeBasis,
    pub computation: PriceComputationResult,
    pub break_even: Floor,
    pub floor: Floor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    pub bypass_cooldown: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    pub limit: Option<i64>,
}

pub(super) async fn load_product(state: &AppState, id: &ProductId) -> Result<Product, AppError> {
    state
        .repo
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))
}

pub async fn get_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(load_product(&state, &ProductId::new(id)).await?))
}

pub async fn put_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<ProductUpsert>,
) -> Result<Json<Product>, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("product id must not be empty".into()));
    }
    for (field, value) in [("currentPrice", body.current_price), ("minPrice", body.min_price)] {
        if value.is_some_and(|v| v.is_negative()) {
            return Err(AppError::BadRequest(format!("{} must not be negative", field)));
        }
    }

    let product = Product {
        id: ProductId::new(id),
        barcode: body.barcode.filter(|b| !b.trim().is_empty()),
        title: body.title,
        current_price: body.current_price,
        min_price: body.min_price,
        auto_pilot: body.auto_pilot,
    };
    state.repo.upsert_product(&product, TimeMs::now()).await?;
    tracing::info!(product_id = %product.id, auto_pilot = product.auto_pilot, "Product upserted");
    Ok(Json(product))
}

/// Profit breakdown at `?price=`, defaulting to the current price.
pub async fn get_pricing(
    Path(id): Path<String>,
    Query(params): Query<PricingQuery>,
    State(state): State<AppState>,
) -> Result<Json<PricingResponse>, AppError> {
    let product = load_product(&state, &ProductId::new(id)).await?;
    let price = match params.price.as_deref() {
        Some(raw) => Decimal::from_str_canonical(raw.trim())
            .map_err(|_| AppError::BadRequest(format!("invalid price: {}", raw)))?,
        None => product.current_price.ok_or_else(|| {
            AppError::BadRequest("product has no current price; pass ?price=".into())
        })?,
    };
    if price.is_negative() {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }

    let settings = state.pricing.effective_settings(&product.id).await?;
    let engine = state.pricing.engine();
    Ok(Json(PricingResponse {
        computation: engine.fees.compute(price, &settings),
        break_even: engine.floors.break_even(&settings),
        floor: engine.floors.enforced_floor(&settings, product.min_price),
        fee_basis: engine.basis(),
        product_id: product.id,
        price,
    }))
}

pub async fn get_suggestion(
    Path(id): Path<String>,
    Query(params): Query<SuggestionQuery>,
    State(state): State<AppState>,
) -> Result<Json<ProductSuggestion>, AppError> {
    let suggestion = state
        .manual
        .suggest_one(&ProductId::new(id), params.bypass_cooldown.unwrap_or(false))
        .await?;
    Ok(Json(suggestion))
}

pub async fn get_price_changes(
    Path(id): Path<String>,
    Query(params): Query<ChangesQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PriceChange>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_CHANGES_LIMIT)
        .clamp(1, MAX_CHANGES_LIMIT);
    let changes = state
        .repo
        .list_price_changes(&ProductId::new(id), limit)
        .await?;
    Ok(Json(changes))
}
