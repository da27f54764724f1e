use super::products::load_product;
use super::AppState;
use crate::domain::{EffectiveSettings, GlobalSettings, ProductId, ProductSettings, TimeMs};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSettingsResponse {
    pub product_id: ProductId,
    pub overrides: ProductSettings,
    pub effective: EffectiveSettings,
}

pub async fn get_global_settings(
    State(state): State<AppState>,
) -> Result<Json<GlobalSettings>, AppError> {
    Ok(Json(state.repo.get_global_settings().await?))
}

pub async fn put_global_settings(
    State(state): State<AppState>,
    Json(settings): Json<GlobalSettings>,
) -> Result<Json<GlobalSettings>, AppError> {
    settings.validate()?;
    state
        .repo
        .put_global_settings(&settings, TimeMs::now())
        .await?;
    tracing::info!("Global settings updated");
    Ok(Json(settings))
}

pub async fn get_product_settings(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProductSettingsResponse>, AppError> {
    let product_id = ProductId::new(id);
    load_product(&state, &product_id).await?;
    let global = state.repo.get_global_settings().await?;
    let overrides = state
        .repo
        .get_or_create_product_settings(&product_id, TimeMs::now())
        .await?;
    let effective = EffectiveSettings::merge(&global, &overrides)?;
    Ok(Json(ProductSettingsResponse {
        product_id,
        overrides,
        effective,
    }))
}

/// Overrides are validated against the current global record before they
/// are stored. Unknown products are rejected before anything is written.
pub async fn put_product_settings(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(overrides): Json<ProductSettings>,
) -> Result<Json<ProductSettingsResponse>, AppError> {
    let product_id = ProductId::new(id);
    load_product(&state, &product_id).await?;
    let global = state.repo.get_global_settings().await?;
    let effective = EffectiveSettings::merge(&global, &overrides)?;
    state
        .repo
        .put_product_settings(&product_id, &overrides, TimeMs::now())
        .await?;
    tracing::info!(product_id = %product_id, "Product settings updated");
    Ok(Json(ProductSettingsResponse {
        product_id,
        overrides,
        effective,
    }))
}
